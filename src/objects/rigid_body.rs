use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::collision::raycast::{raycast_shape, Ray, RaycastHit};
use crate::collision::AABB;
use crate::math::transform::{Rotation, Transform};
use crate::math::vec2::Vec2;
use crate::shapes::{Shape, ShapeKind};

/// How a body takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
    /// Never moves. Zero mass, zero velocity.
    Static,
    /// Moves with the velocity it is given but ignores forces, gravity and contacts.
    Kinematic,
    /// Fully simulated.
    #[default]
    Dynamic,
}

/// Returned when a raw body type value is outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownBodyType(pub u8);

impl fmt::Display for UnknownBodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown body type {}", self.0)
    }
}

impl std::error::Error for UnknownBodyType {}

impl TryFrom<u8> for BodyType {
    type Error = UnknownBodyType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BodyType::Static),
            1 => Ok(BodyType::Kinematic),
            2 => Ok(BodyType::Dynamic),
            other => Err(UnknownBodyType(other)),
        }
    }
}

impl From<BodyType> for u8 {
    fn from(body_type: BodyType) -> u8 {
        match body_type {
            BodyType::Static => 0,
            BodyType::Kinematic => 1,
            BodyType::Dynamic => 2,
        }
    }
}

/// Bit set of per-body overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyFlags(u8);

impl BodyFlags {
    pub const NONE: BodyFlags = BodyFlags(0);
    /// A dynamic body with this flag has zero inverse mass.
    pub const INFINITE_MASS: BodyFlags = BodyFlags(1 << 0);
    /// A dynamic body with this flag never rotates from contacts or torque.
    pub const INFINITE_INERTIA: BodyFlags = BodyFlags(1 << 1);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: BodyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: BodyFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: BodyFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for BodyFlags {
    type Output = BodyFlags;

    fn bitor(self, rhs: BodyFlags) -> BodyFlags {
        BodyFlags(self.0 | rhs.0)
    }
}

/// Stable handle to a body inside a `PhysicsWorld`. Never reused by the world that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) u64);

impl BodyId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque value owned and interpreted by the application, e.g. an entity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserData(pub u64);

#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) body_type: BodyType,
    pub(crate) flags: BodyFlags,

    // Geometry
    pub(crate) shape: Option<Arc<Shape>>,
    pub(crate) aabb: AABB, // Cached, refreshed whenever the shape or transform changes

    // Primary state
    pub(crate) transform: Transform, // Position of the center of mass and orientation
    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f64, // Radians per second
    pub(crate) gravity_scale: f64,

    // Accumulators for forces/torques applied during a time step
    pub(crate) force: Vec2,
    pub(crate) torque: f64,

    // Mass data, derived from the shape, type and flags
    pub(crate) mass: f64,
    pub(crate) inv_mass: f64,
    pub(crate) inertia: f64,
    pub(crate) inv_inertia: f64,

    user_data: Option<UserData>,
}

impl RigidBody {
    /// Creates a body without a shape at `position`.
    pub fn new(body_type: BodyType, position: Vec2) -> Self {
        let transform = Transform::new(position, 0.0);
        Self {
            body_type,
            flags: BodyFlags::NONE,
            shape: None,
            aabb: AABB::new(position, position),
            transform,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            gravity_scale: 1.0,
            force: Vec2::ZERO,
            torque: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            user_data: None,
        }
    }

    /// Creates a body and attaches `shape` to it.
    pub fn with_shape(body_type: BodyType, position: Vec2, shape: Arc<Shape>) -> Self {
        let mut body = Self::new(body_type, position);
        body.set_shape(Some(shape));
        body
    }

    /// Creates a body from a raw type value. Returns `None` for values outside [`BodyType`].
    pub fn from_raw_type(raw: u8, position: Vec2) -> Option<Self> {
        BodyType::try_from(raw).ok().map(|body_type| Self::new(body_type, position))
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    /// Changes the body type and recomputes mass data.
    pub fn set_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        self.compute_mass();
    }

    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: BodyFlags) {
        self.flags = flags;
        self.compute_mass();
    }

    /// The attached shape. The body shares the shape and never mutates it.
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_deref()
    }

    /// Attaches `shape`, or detaches the current one with `None`, then recomputes mass
    /// data and the AABB.
    pub fn set_shape(&mut self, shape: Option<Arc<Shape>>) {
        self.shape = shape;
        self.refresh_aabb();
        self.compute_mass();
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        let delta = position - self.transform.position;
        self.transform.position = position;
        self.aabb.min += delta;
        self.aabb.max += delta;
    }

    /// Angle in radians, normalized to `[-PI, PI)`.
    pub fn angle(&self) -> f64 {
        self.transform.angle()
    }

    pub fn rotation(&self) -> Rotation {
        self.transform.rotation()
    }

    pub fn set_angle(&mut self, angle: f64) {
        if self.transform.angle() == angle {
            return;
        }
        self.transform.set_angle(angle);
        self.refresh_aabb();
    }

    pub fn velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// No-op on static bodies.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        if !self.is_static() {
            self.linear_velocity = velocity;
        }
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// No-op on static bodies.
    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        if !self.is_static() {
            self.angular_velocity = angular_velocity;
        }
    }

    pub fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, scale: f64) {
        self.gravity_scale = scale;
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn torque(&self) -> f64 {
        self.torque
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f64 {
        self.inv_mass
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn inverse_inertia(&self) -> f64 {
        self.inv_inertia
    }

    /// World-space bounding box. Degenerate at the body position when no shape is attached.
    pub fn aabb(&self) -> AABB {
        self.aabb
    }

    pub fn user_data(&self) -> Option<UserData> {
        self.user_data
    }

    pub fn set_user_data(&mut self, user_data: Option<UserData>) {
        self.user_data = user_data;
    }

    /// Transforms a point from body space to world space.
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.transform.apply(local)
    }

    /// Transforms a point from world space to body space.
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        self.transform.apply_inverse(world)
    }

    /// Returns true if `point` (world space) lies inside the body's shape.
    pub fn contains_point(&self, point: Vec2) -> bool {
        let shape = match &self.shape {
            Some(shape) => shape,
            None => return false,
        };
        match shape.kind() {
            ShapeKind::Circle(circle) => {
                point.distance_squared(self.transform.position) <= circle.radius * circle.radius
            }
            ShapeKind::Polygon(_) => {
                let ray = Ray::new(point, Vec2::RIGHT, f64::MAX);
                raycast_shape(shape, &self.transform, &ray).map_or(false, |hit| hit.inside)
            }
        }
    }

    pub fn raycast(&self, ray: &Ray) -> Option<RaycastHit> {
        let shape = self.shape.as_deref()?;
        raycast_shape(shape, &self.transform, ray)
    }

    /// Applies a force at the center of mass.
    pub fn apply_force(&mut self, force: Vec2) {
        if self.inv_mass <= 0.0 {
            return;
        }
        self.force += force;
    }

    /// Applies a force at a specific point (in world coordinates).
    /// This generates both linear force and torque.
    pub fn apply_force_at_point(&mut self, force: Vec2, point: Vec2) {
        if self.inv_mass <= 0.0 {
            return;
        }
        self.force += force;
        self.torque += (point - self.transform.position).cross(force);
    }

    /// Adds the gravity force `g * gravity_scale * mass`.
    pub fn apply_gravity(&mut self, gravity: Vec2) {
        if self.mass <= 0.0 {
            return;
        }
        self.force += gravity * (self.gravity_scale * self.mass);
    }

    /// Changes velocity immediately by an impulse through the center of mass.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.inv_mass <= 0.0 {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Applies an impulse at a world-space point.
    pub fn apply_impulse_at_point(&mut self, impulse: Vec2, point: Vec2) {
        if self.inv_mass <= 0.0 {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        let arm = point - self.transform.position;
        self.angular_velocity += self.inv_inertia * arm.cross(impulse);
    }

    /// Should be called once per simulation step after integration.
    pub fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    pub(crate) fn refresh_aabb(&mut self) {
        self.aabb = match &self.shape {
            Some(shape) => shape.aabb(&self.transform),
            None => AABB::new(self.transform.position, self.transform.position),
        };
    }

    fn compute_mass(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;

        match self.body_type {
            BodyType::Static => {
                self.linear_velocity = Vec2::ZERO;
                self.angular_velocity = 0.0;
            }
            BodyType::Dynamic => {
                let shape = match &self.shape {
                    Some(shape) => shape,
                    None => return,
                };
                if !self.flags.contains(BodyFlags::INFINITE_MASS) {
                    self.mass = shape.mass();
                    if self.mass > 0.0 {
                        self.inv_mass = 1.0 / self.mass;
                    }
                }
                if !self.flags.contains(BodyFlags::INFINITE_INERTIA) {
                    self.inertia = shape.inertia();
                    if self.inertia > 0.0 {
                        self.inv_inertia = 1.0 / self.inertia;
                    }
                }
            }
            BodyType::Kinematic => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Material;
    use std::f64::consts::PI;
    const EPSILON: f64 = 1e-10;

    fn unit_circle() -> Arc<Shape> {
        Arc::new(Shape::circle(1.0, Material::new(1.0, 0.5, 0.0)))
    }

    fn unit_box() -> Arc<Shape> {
        Arc::new(Shape::rectangle(1.0, 1.0, Material::new(1.0, 0.5, 0.0)))
    }

    #[test]
    fn test_rigidbody_new_circle() {
        let rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::new(1.0, 2.0), unit_circle());

        assert!((rb.mass() - PI).abs() < EPSILON);
        assert!((rb.inverse_mass() - 1.0 / PI).abs() < EPSILON);
        assert!((rb.inertia() - 0.5 * PI).abs() < EPSILON);
        assert!((rb.inverse_inertia() - 2.0 / PI).abs() < EPSILON);
        assert_eq!(rb.position(), Vec2::new(1.0, 2.0));
        assert_eq!(rb.angle(), 0.0);
        assert_eq!(rb.velocity(), Vec2::ZERO);
        assert_eq!(rb.force(), Vec2::ZERO);
        assert_eq!(rb.aabb(), AABB::new(Vec2::new(0.0, 1.0), Vec2::new(2.0, 3.0)));
    }

    #[test]
    fn test_rigidbody_static_has_no_mass() {
        let mut rb = RigidBody::with_shape(BodyType::Static, Vec2::ZERO, unit_box());
        assert_eq!(rb.inverse_mass(), 0.0);
        assert_eq!(rb.inverse_inertia(), 0.0);

        rb.set_velocity(Vec2::new(1.0, 0.0));
        rb.set_angular_velocity(2.0);
        rb.apply_force(Vec2::new(5.0, 5.0));
        rb.apply_impulse_at_point(Vec2::new(5.0, 5.0), Vec2::new(0.5, 0.5));
        rb.apply_gravity(Vec2::new(0.0, -9.8));
        assert_eq!(rb.velocity(), Vec2::ZERO);
        assert_eq!(rb.angular_velocity(), 0.0);
        assert_eq!(rb.force(), Vec2::ZERO);
    }

    #[test]
    fn test_rigidbody_kinematic_keeps_velocity_but_no_mass() {
        let mut rb = RigidBody::with_shape(BodyType::Kinematic, Vec2::ZERO, unit_box());
        rb.set_velocity(Vec2::new(1.0, 0.0));
        rb.apply_impulse(Vec2::new(10.0, 0.0));
        assert_eq!(rb.velocity(), Vec2::new(1.0, 0.0));
        assert_eq!(rb.inverse_mass(), 0.0);
    }

    #[test]
    fn test_set_type_to_static_zeroes_velocity() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        rb.set_velocity(Vec2::new(3.0, 0.0));
        rb.set_angular_velocity(1.0);
        rb.set_type(BodyType::Static);
        assert_eq!(rb.velocity(), Vec2::ZERO);
        assert_eq!(rb.angular_velocity(), 0.0);
        assert_eq!(rb.mass(), 0.0);

        rb.set_type(BodyType::Dynamic);
        assert!((rb.mass() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_flags_override_mass_data() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        rb.set_flags(BodyFlags::INFINITE_INERTIA);
        assert!((rb.inverse_mass() - 1.0).abs() < EPSILON);
        assert_eq!(rb.inverse_inertia(), 0.0);

        rb.set_flags(BodyFlags::INFINITE_MASS | BodyFlags::INFINITE_INERTIA);
        assert_eq!(rb.inverse_mass(), 0.0);
        assert!(rb.flags().contains(BodyFlags::INFINITE_MASS));

        let mut flags = rb.flags();
        flags.remove(BodyFlags::INFINITE_MASS);
        assert_eq!(flags, BodyFlags::INFINITE_INERTIA);
    }

    #[test]
    fn test_detach_shape_clears_mass() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::new(2.0, 0.0), unit_box());
        rb.set_shape(None);
        assert!(rb.shape().is_none());
        assert_eq!(rb.mass(), 0.0);
        assert_eq!(rb.aabb(), AABB::new(Vec2::new(2.0, 0.0), Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn test_from_raw_type() {
        let raw_type = |raw| RigidBody::from_raw_type(raw, Vec2::ZERO).map(|b| b.body_type());
        assert_eq!(raw_type(0), Some(BodyType::Static));
        assert_eq!(raw_type(2), Some(BodyType::Dynamic));
        assert!(RigidBody::from_raw_type(3, Vec2::ZERO).is_none());
        assert_eq!(BodyType::try_from(7), Err(UnknownBodyType(7)));
        assert_eq!(UnknownBodyType(7).to_string(), "unknown body type 7");
        assert_eq!(u8::from(BodyType::Kinematic), 1);
    }

    #[test]
    fn test_angle_round_trip() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        for &theta in &[0.3, -2.0, 4.0, 10.0, -7.5] {
            rb.set_angle(theta);
            let expected = crate::math::transform::normalize_angle(theta);
            assert!((rb.angle() - expected).abs() < EPSILON);
            assert!((rb.rotation().sin - theta.sin()).abs() < EPSILON);
            assert!((rb.rotation().cos - theta.cos()).abs() < EPSILON);
        }
    }

    #[test]
    fn test_set_position_moves_aabb() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        rb.set_position(Vec2::new(3.0, -1.0));
        let aabb = rb.aabb();
        assert!((aabb.min - Vec2::new(2.5, -1.5)).magnitude() < EPSILON);
        assert!((aabb.max - Vec2::new(3.5, -0.5)).magnitude() < EPSILON);
    }

    #[test]
    fn test_set_angle_refreshes_aabb() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        rb.set_angle(PI / 4.0);
        let half_diagonal = 0.5 * 2.0f64.sqrt();
        assert!((rb.aabb().max.x - half_diagonal).abs() < EPSILON);
    }

    #[test]
    fn test_apply_force_at_point_generates_torque() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::new(1.0, 1.0), unit_box());
        rb.apply_force_at_point(Vec2::new(0.0, 2.0), Vec2::new(2.0, 1.0));
        assert_eq!(rb.force(), Vec2::new(0.0, 2.0));
        assert!((rb.torque() - 2.0).abs() < EPSILON);

        rb.clear_forces();
        assert_eq!(rb.force(), Vec2::ZERO);
        assert_eq!(rb.torque(), 0.0);
    }

    #[test]
    fn test_apply_gravity_uses_scale_and_mass() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        rb.set_gravity_scale(0.5);
        rb.apply_gravity(Vec2::new(0.0, -10.0));
        assert!((rb.force().y - -5.0).abs() < EPSILON);
    }

    #[test]
    fn test_apply_impulse_at_point() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        rb.apply_impulse_at_point(Vec2::new(0.0, 1.0), Vec2::new(0.5, 0.0));
        assert!((rb.velocity().y - 1.0).abs() < EPSILON);
        // inv_inertia = 6, arm x impulse = 0.5
        assert!((rb.angular_velocity() - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_contains_point() {
        let circle = RigidBody::with_shape(BodyType::Dynamic, Vec2::new(1.0, 0.0), unit_circle());
        assert!(circle.contains_point(Vec2::new(1.5, 0.5)));
        assert!(!circle.contains_point(Vec2::new(2.5, 0.0)));

        let mut square = RigidBody::with_shape(BodyType::Dynamic, Vec2::ZERO, unit_box());
        assert!(square.contains_point(Vec2::new(0.4, -0.4)));
        assert!(!square.contains_point(Vec2::new(0.6, 0.0)));
        square.set_angle(PI / 4.0);
        assert!(square.contains_point(Vec2::new(0.6, 0.0)));

        let bare = RigidBody::new(BodyType::Dynamic, Vec2::ZERO);
        assert!(!bare.contains_point(Vec2::ZERO));
    }

    #[test]
    fn test_world_and_local_points() {
        let mut rb = RigidBody::with_shape(BodyType::Dynamic, Vec2::new(2.0, 0.0), unit_box());
        rb.set_angle(PI / 2.0);
        let world = rb.world_point(Vec2::new(1.0, 0.0));
        assert!((world - Vec2::new(2.0, 1.0)).magnitude() < EPSILON);
        assert!((rb.local_point(world) - Vec2::new(1.0, 0.0)).magnitude() < EPSILON);
    }

    #[test]
    fn test_user_data_is_opaque() {
        let mut rb = RigidBody::new(BodyType::Dynamic, Vec2::ZERO);
        assert_eq!(rb.user_data(), None);
        rb.set_user_data(Some(UserData(42)));
        assert_eq!(rb.user_data(), Some(UserData(42)));
    }
}
