// Defines an Axis-Aligned Bounding Box

use crate::math::vec2::Vec2;

/// An Axis-Aligned Bounding Box defined by its minimum and maximum corner points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB {
    pub min: Vec2,
    pub max: Vec2,
}

impl AABB {
    /// Creates a new AABB.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        // Ensure min coordinates are <= max coordinates
        AABB {
            min: Vec2::new(min.x.min(max.x), min.y.min(max.y)),
            max: Vec2::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Checks if this AABB overlaps with another AABB. Touching edges count as overlap,
    /// so resting contacts with zero depth still reach the narrow phase.
    pub fn overlaps(&self, other: &AABB) -> bool {
        let x_overlap = self.max.x >= other.min.x && self.min.x <= other.max.x;
        let y_overlap = self.max.y >= other.min.y && self.min.y <= other.max.y;
        x_overlap && y_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_new_orders_corners() {
        let aabb = AABB::new(Vec2::new(3.0, -1.0), Vec2::new(1.0, 2.0));
        assert_eq!(aabb.min, Vec2::new(1.0, -1.0));
        assert_eq!(aabb.max, Vec2::new(3.0, 2.0));
        assert_eq!(aabb.width(), 2.0);
        assert_eq!(aabb.height(), 3.0);
    }

    #[test]
    fn test_aabb_overlaps_inclusive() {
        let a = AABB::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let touching = AABB::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        let apart = AABB::new(Vec2::new(1.5, 0.0), Vec2::new(2.0, 1.0));
        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&apart));
    }
}
