//! Defines physical material properties.

/// Represents the physical properties of a shape affecting mass and collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Mass per unit area. Range [0, infinity).
    pub density: f64,
    /// Coefficient of friction. Range [0, infinity).
    /// Higher values mean more resistance to sliding.
    pub friction: f64,
    /// Coefficient of restitution (bounciness). Range [0, 1].
    /// 0 = perfectly inelastic (no bounce), 1 = perfectly elastic.
    pub restitution: f64,
}

impl Material {
    /// Creates a new material with the given density, friction and restitution.
    pub fn new(density: f64, friction: f64, restitution: f64) -> Self {
        Material {
            density: density.max(0.0),
            friction: friction.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
        }
    }

    /// Friction used for a contact between two materials: the geometric mean,
    /// so a frictionless surface stays frictionless against anything.
    pub fn combined_friction(&self, other: &Material) -> f64 {
        (self.friction * other.friction).sqrt()
    }

    /// Restitution used for a contact between two materials: the bouncier of the two.
    pub fn combined_restitution(&self, other: &Material) -> f64 {
        self.restitution.max(other.restitution)
    }
}

impl Default for Material {
    /// Unit density, moderate friction, low restitution.
    fn default() -> Self {
        Material {
            density: 1.0,
            friction: 0.5,
            restitution: 0.2,
        }
    }
}
