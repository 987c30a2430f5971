//! Locks bodyB's orientation to a fixed target relative to bodyA (a
//! weld constraint on rotation only). Built directly from the
//! quaternion derivative rather than reduced to a 3-axis angular
//! Jacobian, which is why it has four rows, not three: one per
//! quaternion component, avoiding the axis-angle Jacobian's
//! singularity near a 180 degree error (§4.8).
//!
//! No prior `.cpp` exists for this constraint in the retrieved source
//! (only its header), so the row construction below is authored from
//! the quaternion-kinematics identity `dq/dt = 0.5 * R(q) * wquat`
//! using the same `quat_left_matrix`/`quat_right_matrix` helpers the
//! constant-velocity joint uses.

use crate::constraint::{solve_rows, warm_start, Constraint};
use crate::store::BodyStore;
use rb_geometry::body::BodyId;
use rb_math::{quat_left_matrix, quat_right_matrix, Fph, Mat4, MatMN, Quat, UnitQuat, VecN, Vec4};

const BAUMGARTE: Fph = 0.05;
const LAMBDA_CLAMP: Fph = 1e4;

fn conjugate_matrix() -> Mat4 {
    Mat4::from_diagonal(&Vec4::new(1.0, -1.0, -1.0, -1.0))
}

fn quat_vec4(q: &UnitQuat) -> Vec4 {
    let q = q.into_inner();
    Vec4::new(q.w, q.i, q.j, q.k)
}

#[derive(Debug)]
pub struct Orientation {
    body_a: BodyId,
    body_b: BodyId,
    /// Target orientation of B relative to A: satisfied when
    /// `qA^-1 * qB == target`.
    target: UnitQuat,
    jacobian: MatMN,
    cached_lambda: VecN,
}

impl Orientation {
    pub fn new(body_a: BodyId, body_b: BodyId, target: UnitQuat) -> Self {
        Self {
            body_a,
            body_b,
            target,
            jacobian: MatMN::zeros(4, 12),
            cached_lambda: VecN::zeros(4),
        }
    }
}

impl Constraint for Orientation {
    fn body_a(&self) -> BodyId {
        self.body_a
    }

    fn body_b(&self) -> BodyId {
        self.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, _dt: Fph) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let u = a.orientation.inverse();
        let v = self.target.inverse();
        let qb_v = b.orientation * v;

        let m_b_full = quat_left_matrix(&u.into_inner()) * quat_right_matrix(&v.into_inner()) * quat_right_matrix(&b.orientation.into_inner()) * 0.5;
        let m_a_full = quat_right_matrix(&qb_v.into_inner()) * conjugate_matrix() * quat_right_matrix(&a.orientation.into_inner()) * 0.5;

        let mut j = MatMN::zeros(4, 12);
        j.view_mut((0, 3), (4, 3)).copy_from(&m_a_full.view((0, 1), (4, 3)));
        j.view_mut((0, 9), (4, 3)).copy_from(&m_b_full.view((0, 1), (4, 3)));
        self.jacobian = j;

        warm_start(&self.jacobian, &self.cached_lambda, a, b);
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let q_err: Quat = a.orientation.inverse() * b.orientation * self.target.inverse();
        let err_vec = quat_vec4(&UnitQuat::new_normalize(q_err)) - Vec4::new(1.0, 0.0, 0.0, 0.0);
        let bias = err_vec * BAUMGARTE;

        solve_rows(&self.jacobian, &mut self.cached_lambda, a, b, &bias, |_, lambda| {
            lambda.clamp(-LAMBDA_CLAMP, LAMBDA_CLAMP)
        });
    }

    fn reset_warm_start(&mut self) {
        self.cached_lambda.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::body::Body;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::Vec3;

    fn body(id: u32, inverse_mass: Fph, orientation: UnitQuat) -> Body {
        Body::new(BodyId(id), Shape::Sphere(Sphere::new(0.3)), Vec3::zeros(), orientation, inverse_mass, 0.5, 0.3)
    }

    #[test]
    fn identity_target_drives_relative_orientation_to_identity() {
        let mut store = BodyStore::new();
        store.insert(body(0, 0.0, UnitQuat::identity()));
        store.insert(body(1, 1.0, UnitQuat::from_axis_angle(&nalgebra::Vector3::y_axis(), 0.6)));

        let mut constraint = Orientation::new(BodyId(0), BodyId(1), UnitQuat::identity());
        for _ in 0..40 {
            constraint.pre_solve(&mut store, 1.0 / 60.0);
            for _ in 0..4 {
                constraint.solve(&mut store);
            }
            let b = store.get_mut(BodyId(1)).unwrap();
            let delta = b.angular_velocity * (1.0 / 60.0);
            let angle = delta.norm();
            if angle > 1e-12 {
                let axis = delta / angle;
                b.orientation = (UnitQuat::from_axis_angle(&nalgebra::Unit::new_unchecked(axis), angle) * b.orientation).normalize();
            }
        }

        let relative = store.get(BodyId(1)).unwrap().orientation;
        assert!(relative.angle() < 0.6, "orientation constraint should have reduced the misalignment");
    }
}
