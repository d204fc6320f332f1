pub mod circle;
pub mod polygon;

pub use circle::Circle;
pub use polygon::Polygon;

use crate::collision::aabb::AABB;
use crate::common::Material;
use crate::math::transform::Transform;
use crate::math::vec2::Vec2;

/// Geometry of a shape. The set of kinds is closed; every query dispatches on it.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Circle(Circle),
    Polygon(Polygon),
}

/// Immutable geometric descriptor attached to bodies.
///
/// Bodies hold shapes behind an `Arc`, so one shape may be shared by many bodies.
/// Per-body state such as the cached AABB lives on the body, never here.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    material: Material,
    area: f64,
}

impl Shape {
    pub fn new(kind: ShapeKind, material: Material) -> Self {
        let area = match &kind {
            ShapeKind::Circle(c) => c.area(),
            ShapeKind::Polygon(p) => p.area(),
        };
        Shape { kind, material, area }
    }

    pub fn circle(radius: f64, material: Material) -> Self {
        Shape::new(ShapeKind::Circle(Circle::new(radius)), material)
    }

    pub fn polygon(vertices: Vec<Vec2>, material: Material) -> Self {
        Shape::new(ShapeKind::Polygon(Polygon::new(vertices)), material)
    }

    pub fn rectangle(width: f64, height: f64, material: Material) -> Self {
        Shape::new(ShapeKind::Polygon(Polygon::rectangle(width, height)), material)
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Mass for the material's density.
    pub fn mass(&self) -> f64 {
        self.material.density * self.area
    }

    /// Rotational inertia about the centroid.
    pub fn inertia(&self) -> f64 {
        match &self.kind {
            ShapeKind::Circle(c) => c.inertia(self.mass()),
            ShapeKind::Polygon(p) => p.inertia(self.material.density),
        }
    }

    /// Bounding box of the shape placed at `transform`.
    pub fn aabb(&self, transform: &Transform) -> AABB {
        match &self.kind {
            ShapeKind::Circle(c) => {
                let extent = Vec2::new(c.radius, c.radius);
                AABB::new(transform.position - extent, transform.position + extent)
            }
            ShapeKind::Polygon(p) => {
                let first = transform.apply(p.vertex(0));
                let mut aabb = AABB { min: first, max: first };
                for v in p.vertices().iter().skip(1) {
                    let w = transform.apply(*v);
                    aabb.min.x = aabb.min.x.min(w.x);
                    aabb.min.y = aabb.min.y.min(w.y);
                    aabb.max.x = aabb.max.x.max(w.x);
                    aabb.max.y = aabb.max.y.max(w.y);
                }
                aabb
            }
        }
    }
}
