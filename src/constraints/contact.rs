use tracing::trace;

use crate::collision::manifold::Collision;
use crate::math::vec2::Vec2;
use crate::objects::rigid_body::{BodyType, RigidBody};

/// Sequential-impulse solver for contact manifolds.
///
/// Per step the world calls [`ContactSolver::warm_start`] once for every collision, then
/// [`ContactSolver::resolve`] for every collision, repeated for the configured number of
/// iterations. Accumulated impulses live in each contact's `ImpulseCache`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSolver {
    /// Fraction of the remaining penetration corrected per step.
    pub baumgarte_factor: f64,
    /// Penetration that is tolerated without correction.
    pub baumgarte_slop: f64,
    /// Approach speed below which contacts do not bounce. Zero bounces every
    /// approaching contact.
    pub restitution_threshold: f64,
}

impl Default for ContactSolver {
    fn default() -> Self {
        ContactSolver {
            baumgarte_factor: 0.24,
            baumgarte_slop: 0.01,
            restitution_threshold: 0.0,
        }
    }
}

/// Velocity of the point at lever arm `arm` on `body`.
#[inline]
fn point_velocity(body: &RigidBody, arm: Vec2) -> Vec2 {
    body.linear_velocity + arm.cross_scalar(body.angular_velocity)
}

/// Applies `impulse` to body B and its opposite to body A. Bodies without inverse
/// mass or inertia are unaffected on that axis.
#[inline]
fn apply_impulse_pair(a: &mut RigidBody, r1: Vec2, b: &mut RigidBody, r2: Vec2, impulse: Vec2) {
    a.linear_velocity -= impulse * a.inv_mass;
    a.angular_velocity -= a.inv_inertia * r1.cross(impulse);
    b.linear_velocity += impulse * b.inv_mass;
    b.angular_velocity += b.inv_inertia * r2.cross(impulse);
}

/// Inverse of the effective mass `inv_m1 + inv_m2 + inv_I1 (r1 x d)^2 + inv_I2 (r2 x d)^2`,
/// or zero when nothing can move along `direction`.
#[inline]
fn effective_mass(a: &RigidBody, r1: Vec2, b: &RigidBody, r2: Vec2, direction: Vec2) -> f64 {
    let rn1 = r1.cross(direction);
    let rn2 = r2.cross(direction);
    let k = a.inv_mass + b.inv_mass + a.inv_inertia * rn1 * rn1 + b.inv_inertia * rn2 * rn2;
    if k > 0.0 { 1.0 / k } else { 0.0 }
}

fn zero_static_velocity(body: &mut RigidBody) {
    if body.body_type == BodyType::Static {
        body.linear_velocity = Vec2::ZERO;
        body.angular_velocity = 0.0;
    }
}

impl ContactSolver {
    /// Prepares every contact of `collision` for this step and applies the impulses it
    /// accumulated on the previous step.
    ///
    /// Computes the effective normal and tangent masses and captures the restitution
    /// target from the approach velocity before any impulse of this step is applied.
    pub fn warm_start(&self, a: &mut RigidBody, b: &mut RigidBody, collision: &mut Collision) {
        if a.inv_mass + b.inv_mass <= 0.0 {
            trace!(
                body_a = collision.body_a,
                body_b = collision.body_b,
                "no inverse mass in contact pair"
            );
            zero_static_velocity(a);
            zero_static_velocity(b);
            return;
        }

        let normal = collision.normal;
        let tangent = normal.right_normal();
        let restitution = collision.restitution;

        for contact in collision.contacts_mut() {
            let r1 = contact.point - a.transform.position;
            let r2 = contact.point - b.transform.position;

            contact.cache.normal_mass = effective_mass(a, r1, b, r2, normal);
            contact.cache.tangent_mass = effective_mass(a, r1, b, r2, tangent);

            let normal_velocity = (point_velocity(b, r2) - point_velocity(a, r1)).dot(normal);
            contact.cache.velocity_bias = if normal_velocity < -self.restitution_threshold {
                -restitution * normal_velocity
            } else {
                0.0
            };

            let impulse =
                normal * contact.cache.normal_scalar + tangent * contact.cache.tangent_scalar;
            apply_impulse_pair(a, r1, b, r2, impulse);
        }
    }

    /// One solver iteration over the contacts of `collision`.
    pub fn resolve(
        &self,
        a: &mut RigidBody,
        b: &mut RigidBody,
        collision: &mut Collision,
        inverse_dt: f64,
    ) {
        if a.inv_mass + b.inv_mass <= 0.0 || inverse_dt <= 0.0 {
            return;
        }

        let normal = collision.normal;
        let tangent = normal.right_normal();
        let friction = collision.friction;

        for contact in collision.contacts_mut() {
            let r1 = contact.point - a.transform.position;
            let r2 = contact.point - b.transform.position;

            // Normal constraint: contacts only push.
            let normal_velocity = (point_velocity(b, r2) - point_velocity(a, r1)).dot(normal);
            let penetration = (contact.depth - self.baumgarte_slop).max(0.0);
            let bias = self.baumgarte_factor * inverse_dt * penetration;
            let target = -normal_velocity + contact.cache.velocity_bias + bias;
            let lambda = contact.cache.normal_mass * target;

            let old_normal = contact.cache.normal_scalar;
            contact.cache.normal_scalar = (old_normal + lambda).max(0.0);
            let delta_normal = contact.cache.normal_scalar - old_normal;
            apply_impulse_pair(a, r1, b, r2, normal * delta_normal);

            // Friction constraint, clamped to the Coulomb cone.
            let tangent_velocity = (point_velocity(b, r2) - point_velocity(a, r1)).dot(tangent);
            let lambda = -tangent_velocity * contact.cache.tangent_mass;

            let max_tangent = friction * contact.cache.normal_scalar;
            let old_tangent = contact.cache.tangent_scalar;
            contact.cache.tangent_scalar = (old_tangent + lambda).clamp(-max_tangent, max_tangent);
            let delta_tangent = contact.cache.tangent_scalar - old_tangent;
            apply_impulse_pair(a, r1, b, r2, tangent * delta_tangent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::detection::compute_collision;
    use crate::common::Material;
    use crate::objects::rigid_body::BodyType;
    use crate::shapes::Shape;
    use std::sync::Arc;

    const EPSILON: f64 = 1e-9;
    const INVERSE_DT: f64 = 60.0;

    fn ball(x: f64, restitution: f64, friction: f64) -> RigidBody {
        // Unit mass: area PI
        let material = Material::new(1.0 / std::f64::consts::PI, friction, restitution);
        let shape = Arc::new(Shape::circle(1.0, material));
        RigidBody::with_shape(BodyType::Dynamic, Vec2::new(x, 0.0), shape)
    }

    fn collide(a: &RigidBody, b: &RigidBody) -> Collision {
        let mut collision = Collision::new(0, 1);
        assert!(compute_collision(a, b, &mut collision));
        collision
    }

    #[test]
    fn test_elastic_head_on_collision_reverses_velocity() {
        let solver = ContactSolver::default();
        // Overlap below the slop, so only restitution acts
        let mut a = ball(-0.996, 1.0, 0.0);
        let mut b = ball(0.996, 1.0, 0.0);
        a.set_velocity(Vec2::new(5.0, 0.0));
        b.set_velocity(Vec2::new(-5.0, 0.0));
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        for _ in 0..12 {
            solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        }

        assert!((a.velocity().x - -5.0).abs() < EPSILON);
        assert!((b.velocity().x - 5.0).abs() < EPSILON);
        let relative = (b.velocity() - a.velocity()).dot(collision.normal);
        assert!((relative - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_slow_elastic_collision_still_bounces() {
        let solver = ContactSolver::default();
        let mut a = ball(-0.996, 1.0, 0.0);
        let mut b = ball(0.996, 1.0, 0.0);
        a.set_velocity(Vec2::new(0.4, 0.0));
        b.set_velocity(Vec2::new(-0.4, 0.0));
        let mut collision = collide(&a, &b);
        let approach = (b.velocity() - a.velocity()).dot(collision.normal);
        assert!((approach - -0.8).abs() < EPSILON);

        solver.warm_start(&mut a, &mut b, &mut collision);
        for _ in 0..12 {
            solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        }

        let separation = (b.velocity() - a.velocity()).dot(collision.normal);
        assert!((separation - 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_restitution_threshold_suppresses_slow_bounce() {
        let solver = ContactSolver {
            restitution_threshold: 1.0,
            ..ContactSolver::default()
        };
        let mut a = ball(-0.996, 1.0, 0.0);
        let mut b = ball(0.996, 1.0, 0.0);
        a.set_velocity(Vec2::new(0.4, 0.0));
        b.set_velocity(Vec2::new(-0.4, 0.0));
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        for _ in 0..12 {
            solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        }

        let separation = (b.velocity() - a.velocity()).dot(collision.normal);
        assert!(separation.abs() < EPSILON);
    }

    #[test]
    fn test_inelastic_collision_stops_approach() {
        let solver = ContactSolver::default();
        let mut a = ball(-0.996, 0.0, 0.0);
        let mut b = ball(0.996, 0.0, 0.0);
        a.set_velocity(Vec2::new(3.0, 0.0));
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);

        assert!((a.velocity().x - 1.5).abs() < EPSILON);
        assert!((b.velocity().x - 1.5).abs() < EPSILON);
        assert!(collision.contacts()[0].cache.normal_scalar > 0.0);
    }

    #[test]
    fn test_resolve_is_idempotent_at_rest() {
        let solver = ContactSolver::default();
        let mut a = ball(-0.998, 0.5, 0.5);
        let mut b = ball(0.998, 0.5, 0.5);
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        collision.contacts_mut()[0].cache.normal_scalar = 0.25;
        solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        let first = collision.contacts()[0].cache;
        solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        let second = collision.contacts()[0].cache;

        assert!((first.normal_scalar - 0.25).abs() < EPSILON);
        assert!((second.normal_scalar - first.normal_scalar).abs() < EPSILON);
        assert!((second.tangent_scalar - first.tangent_scalar).abs() < EPSILON);
        assert_eq!(a.velocity(), Vec2::ZERO);
        assert_eq!(b.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_separating_bodies_are_not_pulled_together() {
        let solver = ContactSolver::default();
        let mut a = ball(-0.9, 0.0, 0.0);
        let mut b = ball(0.9, 0.0, 0.0);
        a.set_velocity(Vec2::new(-10.0, 0.0));
        b.set_velocity(Vec2::new(10.0, 0.0));
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);

        assert_eq!(collision.contacts()[0].cache.normal_scalar, 0.0);
        assert_eq!(a.velocity(), Vec2::new(-10.0, 0.0));
    }

    #[test]
    fn test_static_body_never_moves() {
        let solver = ContactSolver::default();
        let ground = Arc::new(Shape::rectangle(10.0, 1.0, Material::new(1.0, 0.8, 0.5)));
        let mut a = RigidBody::with_shape(BodyType::Static, Vec2::ZERO, ground);
        let mut b = ball(0.0, 0.5, 0.8);
        b.set_position(Vec2::new(0.0, 1.4));
        b.set_velocity(Vec2::new(4.0, -6.0));
        b.set_angular_velocity(2.0);
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        for _ in 0..12 {
            solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        }

        assert_eq!(a.velocity(), Vec2::ZERO);
        assert_eq!(a.angular_velocity(), 0.0);
        assert!(b.velocity().y > 0.0);
    }

    #[test]
    fn test_friction_stays_inside_cone() {
        let solver = ContactSolver::default();
        let ground = Arc::new(Shape::rectangle(10.0, 1.0, Material::new(1.0, 0.3, 0.0)));
        let crate_shape = Arc::new(Shape::rectangle(1.0, 1.0, Material::new(1.0, 0.3, 0.0)));
        let mut a = RigidBody::with_shape(BodyType::Static, Vec2::ZERO, ground);
        let mut b = RigidBody::with_shape(BodyType::Dynamic, Vec2::new(0.0, 0.98), crate_shape);
        b.set_velocity(Vec2::new(20.0, -2.0));
        let mut collision = collide(&a, &b);
        assert_eq!(collision.count(), 2);

        solver.warm_start(&mut a, &mut b, &mut collision);
        for _ in 0..12 {
            solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);
        }

        for contact in collision.contacts() {
            assert!(contact.cache.normal_scalar >= 0.0);
            let max_tangent = collision.friction * contact.cache.normal_scalar;
            assert!(contact.cache.tangent_scalar.abs() <= max_tangent + EPSILON);
        }
        // Friction slowed the slide but could not stop it
        assert!(b.velocity().x < 20.0);
        assert!(b.velocity().x > 0.0);
    }

    #[test]
    fn test_warm_start_applies_cached_impulse() {
        let solver = ContactSolver::default();
        let mut a = ball(-0.998, 0.0, 0.0);
        let mut b = ball(0.998, 0.0, 0.0);
        let mut collision = collide(&a, &b);
        collision.contacts_mut()[0].cache.normal_scalar = 2.0;

        solver.warm_start(&mut a, &mut b, &mut collision);

        assert!((a.velocity().x - -2.0).abs() < EPSILON);
        assert!((b.velocity().x - 2.0).abs() < EPSILON);
        assert!((collision.contacts()[0].cache.normal_mass - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_two_static_bodies_are_skipped() {
        let solver = ContactSolver::default();
        let shape = Arc::new(Shape::rectangle(1.0, 1.0, Material::default()));
        let mut a = RigidBody::with_shape(BodyType::Static, Vec2::ZERO, shape.clone());
        let mut b = RigidBody::with_shape(BodyType::Kinematic, Vec2::new(0.5, 0.0), shape);
        b.set_velocity(Vec2::new(1.0, 0.0));
        // Force a stray velocity onto the static body
        a.linear_velocity = Vec2::new(3.0, 0.0);
        let mut collision = collide(&a, &b);

        solver.warm_start(&mut a, &mut b, &mut collision);
        solver.resolve(&mut a, &mut b, &mut collision, INVERSE_DT);

        assert_eq!(a.velocity(), Vec2::ZERO);
        assert_eq!(b.velocity(), Vec2::new(1.0, 0.0));
        assert_eq!(collision.contacts()[0].cache.normal_scalar, 0.0);
    }
}
