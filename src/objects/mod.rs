pub mod rigid_body;

pub use rigid_body::{BodyFlags, BodyId, BodyType, RigidBody, UnknownBodyType, UserData};
