pub mod transform;
pub mod vec2;

pub use transform::{normalize_angle, Rotation, Transform};
pub use vec2::Vec2;
