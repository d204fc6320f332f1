use super::vec2::Vec2;
use std::f64::consts::{PI, TAU};

/// Wraps an angle in radians into `[-PI, PI)`.
pub fn normalize_angle(angle: f64) -> f64 {
    angle - TAU * ((angle + PI) / TAU).floor()
}

/// Cached sine and cosine of a body angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub sin: f64,
    pub cos: f64,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation { sin: 0.0, cos: 1.0 };

    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { sin, cos }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position and orientation of a body. The angle is kept normalized and its
/// sine/cosine are computed once whenever it changes, so narrow-phase code can
/// rotate points without calling into trig functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    angle: f64,
    rotation: Rotation,
}

impl Transform {
    /// Creates a new transform.
    pub fn new(position: Vec2, angle: f64) -> Self {
        let angle = normalize_angle(angle);
        Self {
            position,
            angle,
            rotation: Rotation::from_angle(angle),
        }
    }

    /// Creates an identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self {
            position: Vec2::ZERO,
            angle: 0.0,
            rotation: Rotation::IDENTITY,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Sets the angle (radians), normalizing it and refreshing the cached rotation.
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = normalize_angle(angle);
        self.rotation = Rotation::from_angle(self.angle);
    }

    /// Rotates a direction from local space into world space.
    #[inline]
    pub fn rotate(&self, v: Vec2) -> Vec2 {
        v.rotate_by(self.rotation.sin, self.rotation.cos)
    }

    /// Rotates a direction from world space back into local space.
    #[inline]
    pub fn unrotate(&self, v: Vec2) -> Vec2 {
        v.rotate_by(-self.rotation.sin, self.rotation.cos)
    }

    /// Applies the transform (rotation then translation) to a point.
    pub fn apply(&self, point: Vec2) -> Vec2 {
        self.rotate(point) + self.position
    }

    /// Applies the inverse transform (inverse translation then inverse rotation) to a point.
    pub fn apply_inverse(&self, point: Vec2) -> Vec2 {
        self.unrotate(point - self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
