//! A kinematic driver with no constraint rows at all: it just
//! overwrites one body's vertical velocity with a fixed oscillation
//! every step, for scenes that need a moving platform (§4.8, §10
//! scene builder). `body_a()` and `body_b()` both return the same id,
//! since it only ever touches one body.

use crate::constraint::Constraint;
use crate::store::BodyStore;
use rb_geometry::body::BodyId;
use rb_math::Fph;

const OSCILLATION_FREQUENCY: Fph = 0.25;
const OSCILLATION_AMPLITUDE: Fph = 4.0;

#[derive(Debug)]
pub struct SimpleMover {
    body: BodyId,
    time: Fph,
}

impl SimpleMover {
    pub fn new(body: BodyId) -> Self {
        Self { body, time: 0.0 }
    }
}

impl Constraint for SimpleMover {
    fn body_a(&self) -> BodyId {
        self.body
    }

    fn body_b(&self) -> BodyId {
        self.body
    }

    fn pre_solve(&mut self, bodies: &mut BodyStore, dt: Fph) {
        self.time += dt;
        if let Some(body) = bodies.get_mut(self.body) {
            body.linear_velocity.y = (self.time * OSCILLATION_FREQUENCY).cos() * OSCILLATION_AMPLITUDE;
        }
    }

    fn solve(&mut self, _bodies: &mut BodyStore) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::body::Body;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::{UnitQuat, Vec3};

    #[test]
    fn mover_oscillates_the_body_vertical_velocity() {
        let mut store = BodyStore::new();
        store.insert(Body::new(BodyId(0), Shape::Sphere(Sphere::new(0.5)), Vec3::zeros(), UnitQuat::identity(), 1.0, 0.5, 0.5));

        let mut mover = SimpleMover::new(BodyId(0));
        mover.pre_solve(&mut store, 0.0);
        let first = store.get(BodyId(0)).unwrap().linear_velocity.y;
        assert!((first - OSCILLATION_AMPLITUDE).abs() < 1e-9);

        for _ in 0..100 {
            mover.pre_solve(&mut store, 1.0 / 60.0);
        }
        let later = store.get(BodyId(0)).unwrap().linear_velocity.y;
        assert!(later.abs() <= OSCILLATION_AMPLITUDE + 1e-9);
    }
}
