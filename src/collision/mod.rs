pub mod aabb;
pub mod detection;
pub mod manifold;
pub mod raycast;
pub mod spatial_hash;

// Re-export key types
pub use aabb::AABB;
pub use detection::{collide_shapes, compute_collision};
pub use manifold::{Collision, Contact, ContactId, ImpulseCache, MAX_CONTACTS};
pub use raycast::{raycast_shape, Ray, RaycastHit};
pub use spatial_hash::SpatialHash;
