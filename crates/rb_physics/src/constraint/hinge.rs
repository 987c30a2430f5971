//! The hinge constraint: pins a point on each body together (the
//! socket a door swings from) with an optional swing-angle limit about
//! the hinge axis (§4.8). A full door hinge is built by pairing this
//! with a [`super::constant_velocity::ConstantVelocity`] that locks the
//! axis itself — see the scene builder.

use crate::constraint::{solve_rows, warm_start, Constraint};
use crate::store::BodyStore;
use rb_geometry::body::{Body, BodyId};
use rb_math::{Fph, MatMN, VecN, Vec3};

const BAUMGARTE: Fph = 0.05;
const LAMBDA_CLAMP: Fph = 1e4;
const LIMIT_ANGLE_DEGREES: Fph = 45.0;

fn point_rows(r_a: Vec3, r_b: Vec3) -> MatMN {
    let mut j = MatMN::zeros(3, 12);
    for axis in 0..3 {
        let mut lin_a = Vec3::zeros();
        lin_a[axis] = 1.0;
        j.fixed_view_mut::<1, 3>(axis, 0).copy_from(&lin_a.transpose());
        j.fixed_view_mut::<1, 3>(axis, 3).copy_from(&r_a.cross(&lin_a).transpose());
        j.fixed_view_mut::<1, 3>(axis, 6).copy_from(&(-lin_a).transpose());
        j.fixed_view_mut::<1, 3>(axis, 9).copy_from(&(-r_b.cross(&lin_a)).transpose());
    }
    j
}

#[derive(Debug)]
pub struct Hinge {
    body_a: BodyId,
    body_b: BodyId,
    anchor_a: Vec3,
    anchor_b: Vec3,
    jacobian: MatMN,
    cached_lambda: VecN,
}

impl Hinge {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor_a: Vec3, anchor_b: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            jacobian: MatMN::zeros(3, 12),
            cached_lambda: VecN::zeros(3),
        }
    }

    fn anchors(&self, a: &Body, b: &Body) -> (Vec3, Vec3) {
        (a.world_from_body(self.anchor_a), b.world_from_body(self.anchor_b))
    }
}

impl Constraint for Hinge {
    fn body_a(&self) -> BodyId {
        self.body_a
    }

    fn body_b(&self) -> BodyId {
        self.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, _dt: Fph) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (point_a, point_b) = self.anchors(a, b);
        let r_a = point_a - a.center_of_mass_world();
        let r_b = point_b - b.center_of_mass_world();
        self.jacobian = point_rows(r_a, r_b);
        warm_start(&self.jacobian, &self.cached_lambda, a, b);
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (point_a, point_b) = self.anchors(a, b);
        let error = point_a - point_b;
        let bias = error * BAUMGARTE;
        let bias = VecN::from_vec(vec![bias.x, bias.y, bias.z]);

        solve_rows(&self.jacobian, &mut self.cached_lambda, a, b, &bias, |_, lambda| {
            lambda.clamp(-LAMBDA_CLAMP, LAMBDA_CLAMP)
        });
    }

    fn reset_warm_start(&mut self) {
        self.cached_lambda.fill(0.0);
    }
}

/// A hinge plus a swing-angle limit measured about `hinge_axis_a`
/// (expressed in body A's local frame).
#[derive(Debug)]
pub struct HingeLimited {
    inner: Hinge,
    hinge_axis_a: Vec3,
    hinge_axis_b: Vec3,
    limit_row: MatMN,
    cached_limit_lambda: Fph,
}

impl HingeLimited {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        anchor_a: Vec3,
        anchor_b: Vec3,
        hinge_axis_a: Vec3,
        hinge_axis_b: Vec3,
    ) -> Self {
        Self {
            inner: Hinge::new(body_a, body_b, anchor_a, anchor_b),
            hinge_axis_a,
            hinge_axis_b,
            limit_row: MatMN::zeros(1, 12),
            cached_limit_lambda: 0.0,
        }
    }
}

impl Constraint for HingeLimited {
    fn body_a(&self) -> BodyId {
        self.inner.body_a
    }

    fn body_b(&self) -> BodyId {
        self.inner.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, dt: Fph) {
        self.inner.pre_solve(bodies, dt);
        let (a, b) = bodies.pair_mut(self.inner.body_a, self.inner.body_b);
        let axis_a = a.orientation * self.hinge_axis_a;
        let mut j = MatMN::zeros(1, 12);
        j.fixed_view_mut::<1, 3>(0, 3).copy_from(&(-axis_a).transpose());
        j.fixed_view_mut::<1, 3>(0, 9).copy_from(&axis_a.transpose());
        self.limit_row = j;
        if self.cached_limit_lambda != 0.0 {
            let warm = self.limit_row.transpose() * VecN::from_element(1, self.cached_limit_lambda);
            crate::constraint::apply_impulses(a, b, &warm);
        }
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        self.inner.solve(bodies);
        let (a, b) = bodies.pair_mut(self.inner.body_a, self.inner.body_b);
        let axis_a = a.orientation * self.hinge_axis_a;
        let axis_b = b.orientation * self.hinge_axis_b;
        let sine = axis_b.cross(&axis_a).dot(&axis_a.cross(&Vec3::new(1.0, 0.0, 0.0)).normalize()).clamp(-1.0, 1.0);
        let angle = 2.0 * sine.asin() * 180.0 / std::f64::consts::PI;

        if angle.abs() > LIMIT_ANGLE_DEGREES {
            let overshoot = (angle.abs() - LIMIT_ANGLE_DEGREES).to_radians() * angle.signum();
            let bias = VecN::from_element(1, BAUMGARTE * overshoot);
            let mut lambda = VecN::from_element(1, self.cached_limit_lambda);
            solve_rows(&self.limit_row, &mut lambda, a, b, &bias, |_, l| {
                if angle > 0.0 {
                    l.min(0.0)
                } else {
                    l.max(0.0)
                }
            });
            self.cached_limit_lambda = lambda[0];
        }
    }

    fn post_solve(&mut self) {
        // Same reset quirk as `ConstantVelocityLimited`: every call
        // drops the limit row's cached multiplier even if it engaged
        // this step.
        self.cached_limit_lambda = 0.0;
    }

    fn reset_warm_start(&mut self) {
        self.inner.reset_warm_start();
        self.cached_limit_lambda = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::UnitQuat;

    fn body(id: u32, pos: Vec3, inverse_mass: Fph) -> Body {
        Body::new(BodyId(id), Shape::Sphere(Sphere::new(0.3)), pos, UnitQuat::identity(), inverse_mass, 0.5, 0.3)
    }

    #[test]
    fn hinge_pulls_anchors_together() {
        let mut store = BodyStore::new();
        store.insert(body(0, Vec3::zeros(), 0.0));
        store.insert(body(1, Vec3::new(0.2, 0.0, 0.0), 1.0));

        let mut hinge = Hinge::new(BodyId(0), BodyId(1), Vec3::zeros(), Vec3::zeros());
        for _ in 0..30 {
            hinge.pre_solve(&mut store, 1.0 / 60.0);
            for _ in 0..4 {
                hinge.solve(&mut store);
            }
            let b = store.get_mut(BodyId(1)).unwrap();
            let v = b.linear_velocity;
            b.position += v * (1.0 / 60.0);
        }
        let separation = (store.get(BodyId(0)).unwrap().position - store.get(BodyId(1)).unwrap().position).norm();
        assert!(separation < 0.2);
    }
}
