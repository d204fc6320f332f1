use crate::math::transform::Transform;
use crate::math::vec2::Vec2;
use crate::shapes::{Circle, Polygon, Shape, ShapeKind};

/// A half-line starting at `origin`, limited to `max_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    /// Unit direction.
    pub direction: Vec2,
    pub max_distance: f64,
}

impl Ray {
    /// Creates a ray; `direction` is normalized.
    pub fn new(origin: Vec2, direction: Vec2, max_distance: f64) -> Self {
        Ray {
            origin,
            direction: direction.normalize(),
            max_distance: max_distance.max(0.0),
        }
    }

    pub fn point_at(&self, distance: f64) -> Vec2 {
        self.origin + self.direction * distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub point: Vec2,
    /// Surface normal at the hit point. Points against the ray when `inside` is set.
    pub normal: Vec2,
    pub distance: f64,
    /// The ray started inside the shape; `point` is the origin and `distance` is zero.
    pub inside: bool,
}

impl RaycastHit {
    fn from_inside(ray: &Ray) -> Self {
        RaycastHit {
            point: ray.origin,
            normal: -ray.direction,
            distance: 0.0,
            inside: true,
        }
    }
}

/// Casts `ray` against `shape` placed at `transform`.
pub fn raycast_shape(shape: &Shape, transform: &Transform, ray: &Ray) -> Option<RaycastHit> {
    match shape.kind() {
        ShapeKind::Circle(circle) => raycast_circle(circle, transform.position, ray),
        ShapeKind::Polygon(polygon) => raycast_polygon(polygon, transform, ray),
    }
}

fn raycast_circle(circle: &Circle, center: Vec2, ray: &Ray) -> Option<RaycastHit> {
    let m = ray.origin - center;
    let c = m.magnitude_squared() - circle.radius * circle.radius;
    if c <= 0.0 {
        return Some(RaycastHit::from_inside(ray));
    }

    // Origin is outside and the ray points away from the circle.
    let b = m.dot(ray.direction);
    if b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let distance = -b - discriminant.sqrt();
    if distance > ray.max_distance {
        return None;
    }

    let point = ray.point_at(distance);
    Some(RaycastHit {
        point,
        normal: (point - center).normalize(),
        distance,
        inside: false,
    })
}

fn raycast_polygon(polygon: &Polygon, transform: &Transform, ray: &Ray) -> Option<RaycastHit> {
    let origin = transform.apply_inverse(ray.origin);
    let direction = transform.unrotate(ray.direction);

    let inside = polygon
        .vertices()
        .iter()
        .zip(polygon.normals())
        .all(|(v, n)| n.dot(origin - *v) <= 0.0);
    if inside {
        return Some(RaycastHit::from_inside(ray));
    }

    // Clip the parametric segment [lower, upper] against every edge half-plane.
    let mut lower = 0.0;
    let mut upper = ray.max_distance;
    let mut hit_edge = None;

    for (i, (v, n)) in polygon.vertices().iter().zip(polygon.normals()).enumerate() {
        let numerator = n.dot(*v - origin);
        let denominator = n.dot(direction);

        if denominator == 0.0 {
            if numerator < 0.0 {
                return None;
            }
        } else if denominator < 0.0 && numerator < lower * denominator {
            // Entering this half-plane.
            lower = numerator / denominator;
            hit_edge = Some(i);
        } else if denominator > 0.0 && numerator < upper * denominator {
            // Leaving this half-plane.
            upper = numerator / denominator;
        }

        if upper < lower {
            return None;
        }
    }

    hit_edge.map(|i| RaycastHit {
        point: ray.point_at(lower),
        normal: transform.rotate(polygon.normal(i)),
        distance: lower,
        inside: false,
    })
}
