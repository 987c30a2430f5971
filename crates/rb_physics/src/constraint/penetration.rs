//! The contact constraint: one normal row (non-penetration) and two
//! tangential friction rows, solved together because the friction
//! bound depends on the normal row's current multiplier (§4.9, §4.10).
//! Structurally the odd one out among the constraints: there is no
//! `post_solve`, and clamping/accumulation happens inline in `solve`
//! rather than through the shared [`super::solve_rows`] helper, since
//! each row's clamp depends on another row's just-solved value.

use crate::constraint::{apply_impulses, inverse_mass_matrix, velocities, Constraint};
use crate::store::BodyStore;
use rb_geometry::body::{Body, BodyId};
use rb_math::{Fph, Vec3};

const BAUMGARTE: Fph = 0.25;
const DEAD_ZONE: Fph = 0.02;
/// Minimum friction capacity assumed even before the normal row has
/// accumulated any impulse this step, so friction doesn't start from
/// zero purely because of solve order within the sweep.
const MIN_FRICTION_BASELINE: Fph = 10.0;

fn tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let candidate = if normal.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let t1 = (candidate - normal * normal.dot(&candidate)).normalize();
    let t2 = normal.cross(&t1);
    (t1, t2)
}

#[derive(Debug)]
pub struct Penetration {
    body_a: BodyId,
    body_b: BodyId,
    local_point_a: Vec3,
    local_point_b: Vec3,
    normal: Vec3,
    friction: Fph,
    pub cached_lambda: [Fph; 3],
}

impl Penetration {
    pub fn new(body_a: BodyId, body_b: BodyId, local_point_a: Vec3, local_point_b: Vec3, normal: Vec3, friction: Fph) -> Self {
        Self {
            body_a,
            body_b,
            local_point_a,
            local_point_b,
            normal,
            friction,
            cached_lambda: [0.0; 3],
        }
    }

    fn anchors(&self, a: &Body, b: &Body) -> (Vec3, Vec3) {
        (a.world_from_body(self.local_point_a), b.world_from_body(self.local_point_b))
    }

    fn row(&self, axis: Vec3, r_a: Vec3, r_b: Vec3) -> rb_math::VecN {
        let mut j = rb_math::VecN::zeros(12);
        j.fixed_rows_mut::<3>(0).copy_from(&axis);
        j.fixed_rows_mut::<3>(3).copy_from(&r_a.cross(&axis));
        j.fixed_rows_mut::<3>(6).copy_from(&(-axis));
        j.fixed_rows_mut::<3>(9).copy_from(&(-r_b.cross(&axis)));
        j
    }
}

impl Constraint for Penetration {
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
        let normal_row = self.row(self.normal, r_a, r_b);
        if self.cached_lambda.iter().any(|&x| x != 0.0) {
            let (t1, t2) = tangent_basis(self.normal);
            let t1_row = self.row(t1, r_a, r_b);
            let t2_row = self.row(t2, r_a, r_b);
            let impulse = normal_row * self.cached_lambda[0] + t1_row * self.cached_lambda[1] + t2_row * self.cached_lambda[2];
            apply_impulses(a, b, &impulse);
        }
    }

    fn solve(&mut self, bodies: &mut BodyStore) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        let (point_a, point_b) = self.anchors(a, b);
        let r_a = point_a - a.center_of_mass_world();
        let r_b = point_b - b.center_of_mass_world();
        let separation = (point_a - point_b).dot(&self.normal);

        let inv_mass = inverse_mass_matrix(a, b);
        let inv_mass_sum = a.inverse_mass + b.inverse_mass;

        // Normal row: non-penetration, Baumgarte bias only once the
        // overlap exceeds the dead zone.
        let normal_row = self.row(self.normal, r_a, r_b);
        let effective_mass_n = (&normal_row.transpose() * &inv_mass * &normal_row)[(0, 0)];
        if effective_mass_n > 1e-12 {
            let bias_term = if separation < -DEAD_ZONE { BAUMGARTE * (-separation - DEAD_ZONE) } else { 0.0 };
            let v = velocities(a, b);
            let jv = normal_row.dot(&v);
            let delta_lambda = (-jv + bias_term) / effective_mass_n;
            let old = self.cached_lambda[0];
            let new_lambda = (old + delta_lambda).max(0.0);
            let applied = new_lambda - old;
            self.cached_lambda[0] = new_lambda;
            apply_impulses(a, b, &(normal_row.clone() * applied));
        }

        // Friction rows: clamped to Coulomb's cone around the normal
        // impulse just computed, with a floor so friction has some
        // capacity even while the normal row is still ramping up.
        let (t1, t2) = tangent_basis(self.normal);
        let friction_bound = (self.friction * self.cached_lambda[0].abs()).max(if inv_mass_sum > 1e-9 {
            self.friction * MIN_FRICTION_BASELINE / inv_mass_sum
        } else {
            0.0
        });

        for (row_index, axis) in [(1usize, t1), (2usize, t2)] {
            let row = self.row(axis, r_a, r_b);
            let effective_mass = (&row.transpose() * &inv_mass * &row)[(0, 0)];
            if effective_mass <= 1e-12 {
                continue;
            }
            let v = velocities(a, b);
            let jv = row.dot(&v);
            let delta_lambda = -jv / effective_mass;
            let old = self.cached_lambda[row_index];
            let new_lambda = (old + delta_lambda).clamp(-friction_bound, friction_bound);
            let applied = new_lambda - old;
            self.cached_lambda[row_index] = new_lambda;
            apply_impulses(a, b, &(row * applied));
        }
    }

    fn reset_warm_start(&mut self) {
        self.cached_lambda = [0.0; 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::UnitQuat;

    fn body(id: u32, pos: Vec3, inverse_mass: Fph) -> Body {
        Body::new(BodyId(id), Shape::Sphere(Sphere::new(0.5)), pos, UnitQuat::identity(), inverse_mass, 0.5, 0.5)
    }

    #[test]
    fn penetration_row_stops_bodies_from_sinking_further() {
        let mut store = BodyStore::new();
        store.insert(body(0, Vec3::new(0.0, 0.0, 0.0), 0.0));
        let mut falling = body(1, Vec3::new(0.0, 0.9, 0.0), 1.0);
        falling.linear_velocity = Vec3::new(0.0, -5.0, 0.0);
        store.insert(falling);

        let mut constraint = Penetration::new(
            BodyId(0),
            BodyId(1),
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            0.25,
        );
        constraint.pre_solve(&mut store, 1.0 / 60.0);
        for _ in 0..8 {
            constraint.solve(&mut store);
        }

        let vy = store.get(BodyId(1)).unwrap().linear_velocity.y;
        assert!(vy > -5.0, "normal impulse should have reduced the closing speed, got {vy}");
        assert!(constraint.cached_lambda[0] >= 0.0);
    }
}
