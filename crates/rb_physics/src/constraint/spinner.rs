//! The spinner constraint: a rigid rod from a fixed pivot (bodyA,
//! typically static) to a spinning top (bodyB), free to precess within
//! a cone and driven by a motor holding its spin rate constant (§4.8).
//! This is the classic gyroscope-precession toy.
//!
//! Unlike every other constraint here, the spinner never warm-starts:
//! `pre_solve` rebuilds the Jacobian but applies no cached impulse, and
//! nothing is preserved across steps. Baumgarte bias only applies to
//! the first three rows (distance + two cone rows); the motor row
//! instead subtracts its target angular speed directly from the
//! measured row velocity, so the solver drives `J*v` toward the motor
//! speed rather than toward zero.

use crate::constraint::{solve_rows, Constraint};
use crate::store::BodyStore;
use rb_geometry::body::{Body, BodyId};
use rb_math::{Fph, MatMN, VecN, Vec3};

const BAUMGARTE: Fph = 0.05;
const LAMBDA_CLAMP: Fph = 1e4;

fn any_orthogonal(axis: Vec3) -> Vec3 {
    let candidate = if axis.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    (candidate - axis * axis.dot(&candidate)).normalize()
}

#[derive(Debug)]
pub struct Spinner {
    body_a: BodyId,
    body_b: BodyId,
    anchor_a: Vec3,
    local_axis_b: Vec3,
    rest_length: Fph,
    cone_angle_degrees: Fph,
    motor_speed: Fph,
    jacobian: MatMN,
    cached_lambda: VecN,
}

impl Spinner {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        anchor_a: Vec3,
        local_axis_b: Vec3,
        rest_length: Fph,
        cone_angle_degrees: Fph,
        motor_speed: Fph,
    ) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            local_axis_b,
            rest_length,
            cone_angle_degrees,
            motor_speed,
            jacobian: MatMN::zeros(4, 12),
            cached_lambda: VecN::zeros(4),
        }
    }

    fn geometry(&self, a: &Body, b: &Body) -> (Vec3, Vec3, Vec3, Vec3, Vec3) {
        let pivot = a.world_from_body(self.anchor_a);
        let tip = b.center_of_mass_world();
        let delta = tip - pivot;
        let distance = delta.norm();
        let axis = if distance > 1e-9 { delta / distance } else { b.orientation * self.local_axis_b };
        let (u, v) = (any_orthogonal(axis), axis.cross(&any_orthogonal(axis)));
        (pivot, tip, axis, u, v)
    }
}

impl Constraint for Spinner {
    fn body_a(&self) -> BodyId {
        self.body_a
    }

    fn body_b(&self) -> BodyId {
        self.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, _dt: Fph) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (pivot, tip, axis, u, v) = self.geometry(a, b);
        let r_b = tip - b.center_of_mass_world();
        let _ = pivot;

        let mut j = MatMN::zeros(4, 12);
        // Row 0: radial distance along the current rod direction.
        j.fixed_view_mut::<1, 3>(0, 6).copy_from(&axis.transpose());
        j.fixed_view_mut::<1, 3>(0, 9).copy_from(&r_b.cross(&axis).transpose());
        // Rows 1-2: swing-cone rows, penalizing angular velocity
        // components that would carry the rod further off-axis.
        j.fixed_view_mut::<1, 3>(1, 9).copy_from(&u.transpose());
        j.fixed_view_mut::<1, 3>(2, 9).copy_from(&v.transpose());
        // Row 3: motor, driving spin about the rod's own axis.
        let spin_axis = b.orientation * self.local_axis_b;
        j.fixed_view_mut::<1, 3>(3, 9).copy_from(&spin_axis.transpose());

        self.jacobian = j;
        self.cached_lambda = VecN::zeros(4);
        // No warm-start impulse is applied here, unlike every other
        // constraint: the spinner always starts this step's solve from
        // rest.
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (pivot, tip, _axis, u, v) = self.geometry(a, b);
        let separation = (tip - pivot).norm() - self.rest_length;

        let cone_limit = self.cone_angle_degrees.to_radians();
        let up = Vec3::new(0.0, 1.0, 0.0);
        let swing = (tip - pivot).normalize().dot(&up).acos();
        let swing_violation = (swing - cone_limit).max(0.0);

        let bias = VecN::from_vec(vec![
            BAUMGARTE * separation,
            BAUMGARTE * swing_violation * u.dot(&up).signum(),
            BAUMGARTE * swing_violation * v.dot(&up).signum(),
            -self.motor_speed,
        ]);

        solve_rows(&self.jacobian, &mut self.cached_lambda, a, b, &bias, |i, lambda| {
            if i == 3 {
                lambda
            } else {
                lambda.clamp(-LAMBDA_CLAMP, LAMBDA_CLAMP)
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::UnitQuat;

    fn body(id: u32, pos: Vec3, inverse_mass: Fph) -> Body {
        Body::new(BodyId(id), Shape::Sphere(Sphere::new(0.2)), pos, UnitQuat::identity(), inverse_mass, 0.5, 0.3)
    }

    #[test]
    fn motor_drives_spin_toward_target_speed() {
        let mut store = BodyStore::new();
        store.insert(body(0, Vec3::zeros(), 0.0));
        store.insert(body(1, Vec3::new(0.0, -1.0, 0.0), 1.0));

        let mut spinner = Spinner::new(BodyId(0), BodyId(1), Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0), 1.0, 30.0, 5.0);
        for _ in 0..60 {
            spinner.pre_solve(&mut store, 1.0 / 60.0);
            for _ in 0..4 {
                spinner.solve(&mut store);
            }
        }
        let spin = store.get(BodyId(1)).unwrap().angular_velocity.y;
        assert!((spin - 5.0).abs() < 1.0, "motor should have driven spin close to 5 rad/s, got {spin}");
    }
}
