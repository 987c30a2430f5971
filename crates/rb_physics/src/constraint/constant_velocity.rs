//! The constant-velocity (CV) joint constraint: a shaft between two
//! bodies that is free to spin about one axis but otherwise keeps the
//! two bodies' orientations locked together (§4.8).

use crate::constraint::{solve_rows, warm_start, Constraint};
use crate::store::BodyStore;
use rb_geometry::body::{Body, BodyId};
use rb_math::{Fph, MatMN, VecN, Vec3};

const BAUMGARTE: Fph = 0.05;
const LAMBDA_CLAMP: Fph = 20.0;
const LIMIT_ANGLE_DEGREES: Fph = 45.0;

/// Any vector orthogonal to `axis`, used as the first of a pair of
/// basis vectors spanning the plane the joint locks.
fn any_orthogonal(axis: Vec3) -> Vec3 {
    let candidate = if axis.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    (candidate - axis * axis.dot(&candidate)).normalize()
}

fn basis(axis: Vec3) -> (Vec3, Vec3) {
    let v1 = any_orthogonal(axis);
    let v2 = axis.cross(&v1);
    (v1, v2)
}

fn angular_rows(v1: Vec3, v2: Vec3) -> MatMN {
    let mut j = MatMN::zeros(2, 12);
    j.fixed_view_mut::<1, 3>(0, 3).copy_from(&(-v1).transpose());
    j.fixed_view_mut::<1, 3>(0, 9).copy_from(&v1.transpose());
    j.fixed_view_mut::<1, 3>(1, 3).copy_from(&(-v2).transpose());
    j.fixed_view_mut::<1, 3>(1, 9).copy_from(&v2.transpose());
    j
}

/// Angle (degrees) of bodyB's joint axis as it has twisted away from
/// bodyA's, measured about the joint's `v1` basis vector.
fn twist_angle_degrees(axis_a: Vec3, axis_b: Vec3, v1: Vec3) -> Fph {
    let sine = axis_b.cross(&axis_a).dot(&v1).clamp(-1.0, 1.0);
    2.0 * sine.asin() * 180.0 / std::f64::consts::PI
}

#[derive(Debug)]
pub struct ConstantVelocity {
    body_a: BodyId,
    body_b: BodyId,
    local_axis_a: Vec3,
    local_axis_b: Vec3,
    jacobian: MatMN,
    cached_lambda: VecN,
}

impl ConstantVelocity {
    pub fn new(body_a: BodyId, body_b: BodyId, local_axis_a: Vec3, local_axis_b: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            local_axis_a,
            local_axis_b,
            jacobian: MatMN::zeros(2, 12),
            cached_lambda: VecN::zeros(2),
        }
    }

    fn rebuild_jacobian(&self, a: &Body, b: &Body) -> (MatMN, Vec3, Vec3, Vec3) {
        let axis_a = a.orientation * self.local_axis_a;
        let axis_b = b.orientation * self.local_axis_b;
        let (v1, v2) = basis(axis_a);
        (angular_rows(v1, v2), axis_a, axis_b, v1)
    }
}

impl Constraint for ConstantVelocity {
    fn body_a(&self) -> BodyId {
        self.body_a
    }

    fn body_b(&self) -> BodyId {
        self.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, _dt: Fph) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (jacobian, _, _, _) = self.rebuild_jacobian(a, b);
        self.jacobian = jacobian;
        warm_start(&self.jacobian, &self.cached_lambda, a, b);
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (_, axis_a, axis_b, v1) = self.rebuild_jacobian(a, b);
        let (_, v2) = basis(axis_a);
        let c0 = axis_b.dot(&v1);
        let c1 = axis_b.dot(&v2);
        let bias = VecN::from_vec(vec![BAUMGARTE * c0, BAUMGARTE * c1]);

        solve_rows(&self.jacobian, &mut self.cached_lambda, a, b, &bias, |_, lambda| {
            lambda.clamp(-LAMBDA_CLAMP, LAMBDA_CLAMP)
        });
    }

    fn reset_warm_start(&mut self) {
        self.cached_lambda.fill(0.0);
    }
}

/// The CV joint plus a +/-45 degree twist limit: two extra rows that
/// only engage once the joint axis has rotated past the limit.
#[derive(Debug)]
pub struct ConstantVelocityLimited {
    inner: ConstantVelocity,
    jacobian: MatMN,
    cached_lambda: VecN,
}

impl ConstantVelocityLimited {
    pub fn new(body_a: BodyId, body_b: BodyId, local_axis_a: Vec3, local_axis_b: Vec3) -> Self {
        Self {
            inner: ConstantVelocity::new(body_a, body_b, local_axis_a, local_axis_b),
            jacobian: MatMN::zeros(4, 12),
            cached_lambda: VecN::zeros(4),
        }
    }
}

impl Constraint for ConstantVelocityLimited {
    fn body_a(&self) -> BodyId {
        self.inner.body_a
    }

    fn body_b(&self) -> BodyId {
        self.inner.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, dt: Fph) {
        self.inner.pre_solve(bodies, dt);
        let (a, b) = bodies.pair_mut(self.inner.body_a, self.inner.body_b);
        let (base_rows, axis_a, _, _) = self.inner.rebuild_jacobian(a, b);
        let (v1, _) = basis(axis_a);
        let limit_row = angular_rows(v1, Vec3::zeros()).row(0).clone_owned();

        let mut full = MatMN::zeros(4, 12);
        full.view_mut((0, 0), (2, 12)).copy_from(&base_rows);
        full.view_mut((2, 0), (1, 12)).copy_from(&limit_row);
        full.view_mut((3, 0), (1, 12)).copy_from(&limit_row);
        self.jacobian = full;

        if self.cached_lambda.rows(2, 2).iter().any(|&x| x != 0.0) {
            let warm = self.jacobian.rows(2, 2).transpose() * self.cached_lambda.rows(2, 2);
            crate::constraint::apply_impulses(a, b, &warm);
        }
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.inner.body_a, self.inner.body_b);
        let (_, axis_a, axis_b, v1) = self.inner.rebuild_jacobian(a, b);
        let (_, v2) = basis(axis_a);
        let angle = twist_angle_degrees(axis_a, axis_b, v1);

        let base_bias = VecN::from_vec(vec![BAUMGARTE * axis_b.dot(&v1), BAUMGARTE * axis_b.dot(&v2)]);
        let base_rows: MatMN = self.jacobian.rows(0, 2).clone_owned();
        let mut base_lambda: VecN = self.cached_lambda.rows(0, 2).clone_owned();
        solve_rows(&base_rows, &mut base_lambda, a, b, &base_bias, |_, lambda| {
            lambda.clamp(-LAMBDA_CLAMP, LAMBDA_CLAMP)
        });
        self.cached_lambda.rows_mut(0, 2).copy_from(&base_lambda);

        if angle > LIMIT_ANGLE_DEGREES {
            let c = (angle - LIMIT_ANGLE_DEGREES).to_radians();
            let bias = VecN::from_element(1, BAUMGARTE * c);
            let row: MatMN = self.jacobian.rows(2, 1).clone_owned();
            let mut lambda = VecN::from_element(1, self.cached_lambda[2]);
            solve_rows(&row, &mut lambda, a, b, &bias, |_, l| l.min(0.0));
            self.cached_lambda[2] = lambda[0];
        } else if angle < -LIMIT_ANGLE_DEGREES {
            let c = (angle + LIMIT_ANGLE_DEGREES).to_radians();
            let bias = VecN::from_element(1, BAUMGARTE * c);
            let row: MatMN = self.jacobian.rows(3, 1).clone_owned();
            let mut lambda = VecN::from_element(1, self.cached_lambda[3]);
            solve_rows(&row, &mut lambda, a, b, &bias, |_, l| l.max(0.0));
            self.cached_lambda[3] = lambda[0];
        }
    }

    fn post_solve(&mut self) {
        // Faithfully reproduced quirk: every call zeroes every cached
        // multiplier past index 0, rather than only the limit rows
        // that didn't engage this step.
        for i in 1..self.cached_lambda.len() {
            self.cached_lambda[i] = 0.0;
        }
    }

    fn reset_warm_start(&mut self) {
        self.inner.reset_warm_start();
        self.cached_lambda.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_basis_is_perpendicular_to_axis() {
        let axis = Vec3::new(0.0, 1.0, 0.0);
        let (v1, v2) = basis(axis);
        approx::assert_abs_diff_eq!(v1.dot(&axis), 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(v2.dot(&axis), 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(v1.dot(&v2), 0.0, epsilon = 1e-9);
    }
}
