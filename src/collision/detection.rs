use crate::math::transform::Transform;
use crate::math::vec2::Vec2;
use crate::objects::rigid_body::RigidBody;
use crate::shapes::{Circle, Polygon, Shape, ShapeKind};
use super::manifold::{Collision, ContactId};

/// Bias towards keeping body A's face as the reference face when both polygons
/// penetrate by about the same amount, so the manifold does not flip between steps.
const REFERENCE_FACE_TOLERANCE: f64 = 0.0005;

/// Below this distance two centers are treated as coincident.
const COINCIDENT_EPSILON: f64 = 1e-10;

/// Runs the narrow phase for a pair of bodies.
///
/// `out` is reset first; its body indices are left untouched. On contact the normal
/// points from `body_a` towards `body_b` and the combined material coefficients are
/// filled in. Returns `true` when at least one contact was produced. Bodies without a
/// shape never collide.
pub fn compute_collision(body_a: &RigidBody, body_b: &RigidBody, out: &mut Collision) -> bool {
    out.reset();
    let (shape_a, shape_b) = match (body_a.shape(), body_b.shape()) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    collide_shapes(shape_a, body_a.transform(), shape_b, body_b.transform(), out)
}

/// Shape-level entry point of [`compute_collision`].
pub fn collide_shapes(
    shape_a: &Shape,
    transform_a: &Transform,
    shape_b: &Shape,
    transform_b: &Transform,
    out: &mut Collision,
) -> bool {
    out.reset();
    match (shape_a.kind(), shape_b.kind()) {
        (ShapeKind::Circle(a), ShapeKind::Circle(b)) => {
            collide_circles(a, transform_a, b, transform_b, out)
        }
        (ShapeKind::Circle(a), ShapeKind::Polygon(b)) => {
            collide_circle_polygon(a, transform_a, b, transform_b, false, out)
        }
        (ShapeKind::Polygon(a), ShapeKind::Circle(b)) => {
            collide_circle_polygon(b, transform_b, a, transform_a, true, out)
        }
        (ShapeKind::Polygon(a), ShapeKind::Polygon(b)) => {
            collide_polygons(a, transform_a, b, transform_b, out)
        }
    }

    if out.is_empty() {
        return false;
    }
    out.friction = shape_a.material().combined_friction(shape_b.material());
    out.restitution = shape_a.material().combined_restitution(shape_b.material());
    true
}

/// Circle vs circle. One contact on the surface of circle A, along the line of centers.
fn collide_circles(a: &Circle, ta: &Transform, b: &Circle, tb: &Transform, out: &mut Collision) {
    let dist_vec = tb.position - ta.position;
    let dist_sq = dist_vec.magnitude_squared();
    let radii_sum = a.radius + b.radius;

    if dist_sq >= radii_sum * radii_sum {
        return;
    }

    let distance = dist_sq.sqrt();
    let normal = if distance > COINCIDENT_EPSILON {
        dist_vec * (1.0 / distance)
    } else {
        // Circles are exactly on top of each other, choose an arbitrary normal
        Vec2::UP
    };

    out.normal = normal;
    out.push_contact(ta.position + normal * a.radius, radii_sum - distance, ContactId(0));
}

/// Circle vs polygon, with the circle as body A unless `flipped`.
///
/// Touching (zero depth) counts as contact. The contact point is the point of the circle
/// deepest inside the polygon.
fn collide_circle_polygon(
    circle: &Circle,
    tc: &Transform,
    polygon: &Polygon,
    tp: &Transform,
    flipped: bool,
    out: &mut Collision,
) {
    let radius = circle.radius;
    let center = tp.apply_inverse(tc.position);

    // Face of least penetration (greatest separation) against the circle center.
    let mut separation = f64::NEG_INFINITY;
    let mut face = 0;
    for (i, (v, n)) in polygon.vertices().iter().zip(polygon.normals()).enumerate() {
        let s = n.dot(center - *v);
        if s > separation {
            separation = s;
            face = i;
        }
    }

    if separation > radius {
        return;
    }

    let face_normal = polygon.normal(face);
    let (direction, depth, id) = if separation < 0.0 {
        // Center inside the polygon.
        (-face_normal, radius - separation, ContactId(face as u32))
    } else {
        let v1_index = face;
        let v2_index = (face + 1) % polygon.len();
        let v1 = polygon.vertex(v1_index);
        let v2 = polygon.vertex(v2_index);

        let vertex_region = if (center - v1).dot(v2 - v1) <= 0.0 {
            Some((v1_index, v1))
        } else if (center - v2).dot(v1 - v2) <= 0.0 {
            Some((v2_index, v2))
        } else {
            None
        };

        match vertex_region {
            Some((index, vertex)) => {
                let to_vertex = vertex - center;
                let dist_sq = to_vertex.magnitude_squared();
                if dist_sq > radius * radius {
                    return;
                }
                let distance = dist_sq.sqrt();
                let direction = if distance > COINCIDENT_EPSILON {
                    to_vertex * (1.0 / distance)
                } else {
                    -face_normal
                };
                (direction, radius - distance, ContactId(ContactId::VERTEX_FLAG | index as u32))
            }
            None => (-face_normal, radius - separation, ContactId(face as u32)),
        }
    };

    let direction = tp.rotate(direction);
    out.normal = if flipped { -direction } else { direction };
    out.push_contact(tc.position + direction * radius, depth, id);
}

/// Greatest separation of `b` from any face of `a`, with the index of that face.
fn find_max_separation(a: &Polygon, ta: &Transform, b: &Polygon, tb: &Transform) -> (usize, f64) {
    let mut best_edge = 0;
    let mut max_separation = f64::NEG_INFINITY;

    for (i, (v, n)) in a.vertices().iter().zip(a.normals()).enumerate() {
        let normal = ta.rotate(*n);
        let vertex = ta.apply(*v);
        let (_, support) = b.support(tb.unrotate(-normal));
        let separation = normal.dot(tb.apply(support) - vertex);
        if separation > max_separation {
            max_separation = separation;
            best_edge = i;
        }
    }
    (best_edge, max_separation)
}

/// Incident face: the edge of `incident` most anti-parallel to the reference normal.
fn find_incident_edge(incident: &Polygon, ti: &Transform, reference_normal: Vec2) -> usize {
    let mut best_edge = 0;
    let mut min_dot = f64::INFINITY;
    for (i, n) in incident.normals().iter().enumerate() {
        let d = ti.rotate(*n).dot(reference_normal);
        if d < min_dot {
            min_dot = d;
            best_edge = i;
        }
    }
    best_edge
}

/// Feature key of a polygon-polygon contact point before the reference edge and flip are
/// known: either an incident vertex, or the point where the incident edge crossed a side plane.
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    point: Vec2,
    feature: u32,
    clip: u32,
}

const CLIP_NONE: u32 = 0;

fn pack_contact_id(reference_edge: usize, vertex: &ClipVertex, flipped: bool) -> ContactId {
    ContactId(
        (reference_edge as u32 & 0xff)
            | (vertex.feature & 0xff) << 8
            | (vertex.clip & 0x3) << 16
            | (flipped as u32) << 24,
    )
}

/// Keeps the part of the segment on the negative side of the plane `normal · p = offset`.
/// Returns how many points survived.
fn clip_segment(
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f64,
    clip: u32,
    incident_edge: usize,
    output: &mut [ClipVertex; 2],
) -> usize {
    let mut count = 0;
    let distance0 = normal.dot(input[0].point) - offset;
    let distance1 = normal.dot(input[1].point) - offset;

    if distance0 <= 0.0 {
        output[count] = input[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        output[count] = input[1];
        count += 1;
    }

    if distance0 * distance1 < 0.0 && count < 2 {
        let t = distance0 / (distance0 - distance1);
        output[count] = ClipVertex {
            point: input[0].point + (input[1].point - input[0].point) * t,
            feature: incident_edge as u32,
            clip,
        };
        count += 1;
    }
    count
}

/// Polygon vs polygon: SAT over both polygons' face normals, then reference/incident
/// face clipping for up to two contacts.
fn collide_polygons(a: &Polygon, ta: &Transform, b: &Polygon, tb: &Transform, out: &mut Collision) {
    let (edge_a, separation_a) = find_max_separation(a, ta, b, tb);
    if separation_a > 0.0 {
        return;
    }
    let (edge_b, separation_b) = find_max_separation(b, tb, a, ta);
    if separation_b > 0.0 {
        return;
    }

    let flipped = separation_b > separation_a + REFERENCE_FACE_TOLERANCE;
    let (reference, tr, reference_edge, incident, ti) = if flipped {
        (b, tb, edge_b, a, ta)
    } else {
        (a, ta, edge_a, b, tb)
    };

    let ref_v1 = tr.apply(reference.vertex(reference_edge));
    let ref_v2 = tr.apply(reference.vertex(reference_edge + 1));
    let ref_normal = tr.rotate(reference.normal(reference_edge));
    let tangent = (ref_v2 - ref_v1).normalize();

    let incident_edge = find_incident_edge(incident, ti, ref_normal);
    let incident_next = (incident_edge + 1) % incident.len();
    let incident_points = [
        ClipVertex {
            point: ti.apply(incident.vertex(incident_edge)),
            feature: incident_edge as u32,
            clip: CLIP_NONE,
        },
        ClipVertex {
            point: ti.apply(incident.vertex(incident_next)),
            feature: incident_next as u32,
            clip: CLIP_NONE,
        },
    ];

    // Clip against the side planes of the reference edge.
    let mut clipped_once = incident_points;
    let kept = clip_segment(
        &incident_points,
        -tangent,
        -tangent.dot(ref_v1),
        1,
        incident_edge,
        &mut clipped_once,
    );
    if kept < 2 {
        return;
    }
    let mut clipped_twice = clipped_once;
    let kept = clip_segment(
        &clipped_once,
        tangent,
        tangent.dot(ref_v2),
        2,
        incident_edge,
        &mut clipped_twice,
    );
    if kept < 2 {
        return;
    }

    out.normal = if flipped { -ref_normal } else { ref_normal };
    for vertex in clipped_twice.iter() {
        let separation = ref_normal.dot(vertex.point - ref_v1);
        if separation <= 0.0 {
            let id = pack_contact_id(reference_edge, vertex, flipped);
            out.push_contact(vertex.point, -separation, id);
        }
    }
    if out.is_empty() {
        out.normal = Vec2::ZERO;
    }
}
