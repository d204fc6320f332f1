use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Circle {
    pub fn new(radius: f64) -> Self {
        assert!(radius >= 0.0, "Circle radius cannot be negative");
        Self { radius }
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    /// Moment of inertia of a solid disc of the given mass about its center.
    pub fn inertia(&self, mass: f64) -> f64 {
        0.5 * mass * self.radius * self.radius
    }
}
