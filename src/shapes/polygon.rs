use crate::math::vec2::Vec2;

/// A convex polygon in local space.
///
/// Vertices are stored counter-clockwise and relative to the polygon's centroid, so the
/// position of a body holding this polygon is its center of mass. The offset that was
/// removed from the input vertices is kept in [`Polygon::centroid`].
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    centroid: Vec2,
}

impl Polygon {
    /// Creates a new polygon from a vector of vertices.
    ///
    /// Clockwise input is reversed. Panics if fewer than 3 vertices are provided.
    pub fn new(mut vertices: Vec<Vec2>) -> Self {
        if vertices.len() < 3 {
            panic!("Polygon must have at least 3 vertices.");
        }

        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }

        let centroid = centroid_of(&vertices);
        for v in vertices.iter_mut() {
            *v -= centroid;
        }

        let normals = edge_normals(&vertices);
        let polygon = Polygon { vertices, normals, centroid };
        debug_assert!(polygon.is_convex(), "Polygon vertices must form a convex hull");
        polygon
    }

    /// Axis-aligned box of the given size centered on its centroid.
    pub fn rectangle(width: f64, height: f64) -> Self {
        let hw = 0.5 * width;
        let hh = 0.5 * height;
        Polygon::new(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Outward unit normals; `normals()[i]` belongs to the edge from vertex `i` to `i + 1`.
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex at `index`, wrapping around the hull.
    #[inline]
    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index % self.vertices.len()]
    }

    #[inline]
    pub fn normal(&self, index: usize) -> Vec2 {
        self.normals[index % self.normals.len()]
    }

    /// Centroid of the vertices as they were passed to [`Polygon::new`].
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    /// Calculates the area of the polygon using the Shoelace formula.
    pub fn area(&self) -> f64 {
        signed_area(&self.vertices).abs()
    }

    /// Moment of inertia about the centroid for a uniform density.
    pub fn inertia(&self, density: f64) -> f64 {
        if density <= 0.0 {
            return 0.0;
        }

        let n = self.vertices.len();
        let mut inertia_sum = 0.0;
        for i in 0..n {
            let v1 = self.vertices[i];
            let v2 = self.vertices[(i + 1) % n];
            let cross_prod = v1.cross(v2);
            let spread = v1.magnitude_squared() + v1.dot(v2) + v2.magnitude_squared();
            inertia_sum += cross_prod * spread;
        }
        (density * inertia_sum / 12.0).max(0.0)
    }

    /// Index and position of the vertex furthest along `direction`.
    pub fn support(&self, direction: Vec2) -> (usize, Vec2) {
        let mut best_index = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = v.dot(direction);
            if d > best_dot {
                best_dot = d;
                best_index = i;
            }
        }
        (best_index, self.vertices[best_index])
    }

    /// Returns true if every turn along the hull is counter-clockwise (collinear points allowed).
    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        (0..n).all(|i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            (b - a).cross(c - b) >= -1e-12
        })
    }
}

fn signed_area(vertices: &[Vec2]) -> f64 {
    let n = vertices.len();
    let mut area = 0.0;
    for i in 0..n {
        area += vertices[i].cross(vertices[(i + 1) % n]);
    }
    area / 2.0
}

/// Area-weighted centroid via a triangle fan; falls back to the vertex average for
/// degenerate (collinear) input.
fn centroid_of(vertices: &[Vec2]) -> Vec2 {
    let n = vertices.len();
    let origin = vertices[0];
    let mut centroid = Vec2::ZERO;
    let mut signed_area_sum = 0.0;

    for i in 1..(n - 1) {
        let v2 = vertices[i];
        let v3 = vertices[i + 1];
        let triangle_signed_area = (v2 - origin).cross(v3 - origin) / 2.0;
        signed_area_sum += triangle_signed_area;
        centroid += (origin + v2 + v3) / 3.0 * triangle_signed_area;
    }

    if signed_area_sum.abs() < 1e-10 {
        let sum = vertices.iter().fold(Vec2::ZERO, |acc, v| acc + *v);
        sum / n as f64
    } else {
        centroid / signed_area_sum
    }
}

fn edge_normals(vertices: &[Vec2]) -> Vec<Vec2> {
    let n = vertices.len();
    (0..n)
        .map(|i| (vertices[(i + 1) % n] - vertices[i]).right_normal().normalize())
        .collect()
}
