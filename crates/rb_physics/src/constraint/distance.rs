//! A two-body distance (rod) constraint holding two local anchor
//! points a fixed distance apart (§4.8).

use crate::constraint::{solve_rows, warm_start, Constraint};
use crate::store::BodyStore;
use rb_geometry::body::BodyId;
use rb_math::{Fph, MatMN, VecN, Vec3};

const BAUMGARTE: Fph = 0.05;
const DEAD_ZONE_SQUARED: Fph = 0.01;
const LAMBDA_CLAMP: Fph = 1e5;

#[derive(Debug)]
pub struct Distance {
    body_a: BodyId,
    body_b: BodyId,
    anchor_a: Vec3,
    anchor_b: Vec3,
    rest_length: Fph,
    jacobian: MatMN,
    cached_lambda: VecN,
}

impl Distance {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor_a: Vec3, anchor_b: Vec3, rest_length: Fph) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            rest_length,
            jacobian: MatMN::zeros(1, 12),
            cached_lambda: VecN::zeros(1),
        }
    }
}

impl Constraint for Distance {
    fn body_a(&self) -> BodyId {
        self.body_a
    }

    fn body_b(&self) -> BodyId {
        self.body_b
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, dt: Fph) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let point_a = a.world_from_body(self.anchor_a);
        let point_b = b.world_from_body(self.anchor_b);
        let delta = point_a - point_b;
        let distance = delta.norm();
        let normal = if distance > 1e-9 { delta / distance } else { Vec3::new(1.0, 0.0, 0.0) };

        let r_a = point_a - a.center_of_mass_world();
        let r_b = point_b - b.center_of_mass_world();

        self.jacobian = MatMN::zeros(1, 12);
        self.jacobian.fixed_view_mut::<1, 3>(0, 0).copy_from(&normal.transpose());
        self.jacobian
            .fixed_view_mut::<1, 3>(0, 3)
            .copy_from(&r_a.cross(&normal).transpose());
        self.jacobian.fixed_view_mut::<1, 3>(0, 6).copy_from(&(-normal).transpose());
        self.jacobian
            .fixed_view_mut::<1, 3>(0, 9)
            .copy_from(&(-r_b.cross(&normal)).transpose());

        warm_start(&self.jacobian, &self.cached_lambda, a, b);
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let point_a = a.world_from_body(self.anchor_a);
        let point_b = b.world_from_body(self.anchor_b);
        let c = (point_a - point_b).norm() - self.rest_length;

        let squared_error = (point_a - point_b).norm_squared() - self.rest_length * self.rest_length;
        let bias_value = if squared_error.abs() > DEAD_ZONE_SQUARED {
            BAUMGARTE * c
        } else {
            0.0
        };
        let bias = VecN::from_element(1, bias_value);

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
    use rb_math::UnitQuat;

    fn body(id: u32, pos: Vec3, inverse_mass: Fph) -> Body {
        Body::new(BodyId(id), Shape::Sphere(Sphere::new(0.3)), pos, UnitQuat::identity(), inverse_mass, 0.5, 0.3)
    }

    #[test]
    fn stretched_rod_pulls_bodies_together() {
        let mut store = BodyStore::new();
        store.insert(body(0, Vec3::new(0.0, 0.0, 0.0), 0.0));
        store.insert(body(1, Vec3::new(3.0, 0.0, 0.0), 1.0));

        let mut constraint = Distance::new(BodyId(0), BodyId(1), Vec3::zeros(), Vec3::zeros(), 1.0);
        for _ in 0..20 {
            constraint.pre_solve(&mut store, 1.0 / 60.0);
            for _ in 0..5 {
                constraint.solve(&mut store);
            }
            let b = store.get_mut(BodyId(1)).unwrap();
            let v = b.linear_velocity;
            b.position += v * (1.0 / 60.0);
        }

        let distance = (store.get(BodyId(0)).unwrap().position - store.get(BodyId(1)).unwrap().position).norm();
        assert!(distance < 3.0, "rod should have pulled the free body closer, got {distance}");
    }
}
