//! Rigid body state: pose, velocities, mass properties, and the
//! impulse/integration routines that mutate them.

use crate::shape::Shape;
use rb_math::{Fph, Mat3, UnitQuat, Vec3};

/// Stable integer id handed out at authoring time. Constraints and
/// manifolds hold these rather than borrows, so bodies can live in a
/// single container owned by the world (see the concurrency model).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct BodyId(pub u32);

/// Maximum angular speed magnitude a body's angular velocity is
/// clamped to after any impulse or integration step.
pub const MAX_ANGULAR_SPEED: Fph = 30.0;

/// Kinematic and dynamic state of one rigid body, plus a handle to its
/// (owned) shape.
#[derive(Debug)]
pub struct Body {
    pub id: BodyId,
    pub position: Vec3,
    pub orientation: UnitQuat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// 0 means static / infinite mass.
    pub inverse_mass: Fph,
    pub elasticity: Fph,
    pub friction: Fph,
    pub shape: Shape,
}

impl Body {
    pub fn new(
        id: BodyId,
        shape: Shape,
        position: Vec3,
        orientation: UnitQuat,
        inverse_mass: Fph,
        elasticity: Fph,
        friction: Fph,
    ) -> Self {
        Self {
            id,
            position,
            orientation,
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            inverse_mass,
            elasticity: elasticity.clamp(0.0, 1.0),
            friction: friction.clamp(0.0, 1.0),
            shape,
        }
    }

    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// The world-space center of mass: `pos + orient * com_local`.
    pub fn center_of_mass_world(&self) -> Vec3 {
        self.position + self.orientation * self.shape.center_of_mass()
    }

    pub fn world_from_body(&self, local_point: Vec3) -> Vec3 {
        self.center_of_mass_world() + self.orientation * local_point
    }

    pub fn body_from_world(&self, world_point: Vec3) -> Vec3 {
        self.orientation.inverse() * (world_point - self.center_of_mass_world())
    }

    /// `I_world = R * I_local * R^T`.
    pub fn inverse_inertia_tensor_world(&self) -> Mat3 {
        if self.is_static() {
            return Mat3::zeros();
        }
        let r = self.orientation.to_rotation_matrix().into_inner();
        let i_local_inv = self
            .shape
            .inertia_tensor()
            .try_inverse()
            .unwrap_or_else(Mat3::zeros)
            * self.inverse_mass;
        r * i_local_inv * r.transpose()
    }

    fn inverse_inertia_tensor_world_unscaled(&self) -> Mat3 {
        // Used internally where the inverse mass scaling must be applied
        // separately (gyroscopic term needs I_world, not invMass*I_world^-1).
        let r = self.orientation.to_rotation_matrix().into_inner();
        r * self.shape.inertia_tensor() * r.transpose()
    }

    /// Applies a linear impulse at the center of mass. No-op for a
    /// static body.
    pub fn apply_linear_impulse(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.linear_velocity += impulse * self.inverse_mass;
    }

    /// Applies an angular impulse (a torque-impulse, not a force).
    /// No-op for a static body.
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.angular_velocity += self.inverse_inertia_tensor_world() * impulse;
        self.clamp_angular_speed();
    }

    /// Applies a linear impulse `j` at world point `p`, decomposing it
    /// into a linear part and an angular part `(p - com) x j`.
    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, world_point: Vec3) {
        if self.is_static() {
            return;
        }
        self.apply_linear_impulse(impulse);
        let r = world_point - self.center_of_mass_world();
        self.apply_angular_impulse(r.cross(&impulse));
    }

    fn clamp_angular_speed(&mut self) {
        let speed = self.angular_velocity.norm();
        if speed > MAX_ANGULAR_SPEED {
            self.angular_velocity *= MAX_ANGULAR_SPEED / speed;
        }
    }

    /// Integrates position, orientation and angular velocity forward
    /// by `dt` (or backward, for `dt < 0`, as used to unwind a trial
    /// conservative-advancement step).
    pub fn update(&mut self, dt: Fph) {
        self.position += self.linear_velocity * dt;

        if self.is_static() {
            return;
        }

        let com_world_before = self.center_of_mass_world();
        let offset = self.position - com_world_before;

        let i_world = self.inverse_inertia_tensor_world_unscaled();
        if let Some(i_world_inv) = i_world.try_inverse() {
            let alpha = i_world_inv * (-self.angular_velocity.cross(&(i_world * self.angular_velocity)));
            self.angular_velocity += alpha * dt;
            self.clamp_angular_speed();
        }

        let angle = self.angular_velocity.norm() * dt;
        let delta = if angle.abs() > 1e-12 {
            let axis = self.angular_velocity / self.angular_velocity.norm();
            UnitQuat::from_axis_angle(&nalgebra::Unit::new_unchecked(axis), angle)
        } else {
            UnitQuat::identity()
        };

        self.orientation = (delta * self.orientation).normalize();

        // Preserve the pos/com offset across the rotation so a
        // non-centered body doesn't drift: rotate the old offset by the
        // same delta and re-add it to the new center of mass.
        let com_world_after = self.center_of_mass_world();
        self.position = com_world_after + delta * offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere::Sphere;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn dummy_dynamic_body() -> Body {
        Body::new(
            BodyId(0),
            Shape::Sphere(Sphere::new(0.5)),
            Vec3::new(1.0, 2.0, 3.0),
            UnitQuat::identity(),
            1.0,
            0.5,
            0.5,
        )
    }

    #[test]
    fn static_body_ignores_impulses() {
        let mut body = dummy_dynamic_body();
        body.inverse_mass = 0.0;
        body.apply_linear_impulse(Vec3::new(10.0, 0.0, 0.0));
        body.apply_angular_impulse(Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(body.linear_velocity, Vec3::zeros());
        assert_eq!(body.angular_velocity, Vec3::zeros());
    }

    #[test]
    fn free_flight_conserves_linear_momentum() {
        let mut body = dummy_dynamic_body();
        body.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        let momentum_before = body.linear_velocity / body.inverse_mass;
        for _ in 0..100 {
            body.update(1.0 / 60.0);
        }
        let momentum_after = body.linear_velocity / body.inverse_mass;
        assert_abs_diff_eq!(momentum_before, momentum_after, epsilon = 1e-9);
    }

    #[test]
    fn orientation_stays_unit_after_many_steps() {
        let mut body = dummy_dynamic_body();
        body.angular_velocity = Vec3::new(0.3, 0.7, -0.2);
        for _ in 0..500 {
            body.update(1.0 / 60.0);
        }
        assert_abs_diff_eq!(body.orientation.norm(), 1.0, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn world_body_round_trip(
            px in -10.0..10.0f64, py in -10.0..10.0f64, pz in -10.0..10.0f64,
            lx in -1.0..1.0f64, ly in -1.0..1.0f64, lz in -1.0..1.0f64,
        ) {
            let mut body = dummy_dynamic_body();
            body.position = Vec3::new(px, py, pz);
            let local = Vec3::new(lx, ly, lz);
            let world = body.world_from_body(local);
            let back = body.body_from_world(world);
            prop_assert!((back - local).norm() < 1e-9);
        }
    }
}
