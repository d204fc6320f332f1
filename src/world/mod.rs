pub mod config;
pub mod contact_cache;
pub mod physics_world;

pub use config::WorldConfig;
pub use contact_cache::ContactCache;
pub use physics_world::{CollisionHandler, PhysicsWorld, PostSolveFn, PreSolveFn};
