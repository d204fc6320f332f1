//! A 2D rigid-body physics engine.
//!
//! Bodies carry circle or convex polygon shapes. Each [`PhysicsWorld::simulate`] call runs a
//! spatial hash broad phase, narrow phase contact generation and a sequential impulse solver
//! with warm starting and Baumgarte position correction.

pub mod collision;
pub mod common;
pub mod constraints;
pub mod integration;
pub mod math;
pub mod objects;
pub mod shapes;
pub mod world;

// Re-export key types for easier use
pub use collision::{Collision, ContactId, Ray, RaycastHit, AABB};
pub use common::Material;
pub use constraints::ContactSolver;
pub use math::{transform::Transform, vec2::Vec2};
pub use objects::{BodyFlags, BodyId, BodyType, RigidBody, UnknownBodyType, UserData};
pub use shapes::{Circle, Polygon, Shape, ShapeKind};
pub use world::{CollisionHandler, PhysicsWorld, WorldConfig};
