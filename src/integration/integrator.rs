use crate::objects::rigid_body::{BodyType, RigidBody};

/// Velocity half of Semi-Implicit Euler: folds the accumulated force and torque into
/// the velocities. Skipped for bodies without inverse mass and for `dt <= 0`.
pub fn integrate_velocity(body: &mut RigidBody, dt: f64) {
    if body.inv_mass <= 0.0 || dt <= 0.0 {
        return;
    }

    // v = v + (F * inv_m) * dt
    body.linear_velocity += body.force * (body.inv_mass * dt);
    // omega = omega + (T * inv_I) * dt
    body.angular_velocity += (body.torque * body.inv_inertia) * dt;
}

/// Position half of Semi-Implicit Euler, using the already updated velocities.
/// Static bodies and `dt <= 0` are skipped. The AABB is refreshed afterwards.
pub fn integrate_position(body: &mut RigidBody, dt: f64) {
    if body.body_type == BodyType::Static || dt <= 0.0 {
        return;
    }

    body.transform.position += body.linear_velocity * dt;

    // Avoid recomputing the cached sine/cosine when nothing rotates.
    if body.angular_velocity != 0.0 {
        let angle = body.transform.angle() + body.angular_velocity * dt;
        body.transform.set_angle(angle);
    }

    body.refresh_aabb();
}
