//! The world step: gravity, broad-phase, narrow-phase, TOI sort,
//! pre-solve/solve/post-solve, TOI-sequenced impulse replay and
//! integration (§4.11).

use crate::constraint::Constraint;
use crate::manifold::ManifoldCollector;
use crate::material::Material;
use crate::store::BodyStore;
use rb_geometry::body::{Body, BodyId};
use rb_geometry::broadphase;
use rb_geometry::contact::Contact;
use rb_geometry::intersection;
use rb_math::{Fph, Vec3};
use std::collections::HashSet;

/// Tunables called out in §9 as "expose as a tunable": gravity, the
/// outer projected-Gauss-Seidel pass count, and the iteration ceilings
/// the geometry layer already bakes in as its own defaults (kept here
/// for observability even though `rb_geometry`'s GJK/EPA and
/// conservative-advancement routines take no runtime parameter for
/// them — see DESIGN.md).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverConfig {
    pub gravity: Vec3,
    pub pgs_iterations: usize,
    pub continuous_collision_iterations: usize,
    pub conservative_advancement_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -10.0),
            pgs_iterations: 5,
            continuous_collision_iterations: 9,
            conservative_advancement_iterations: 10,
        }
    }
}

impl SolverConfig {
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_pgs_iterations(mut self, iterations: usize) -> Self {
        self.pgs_iterations = iterations;
        self
    }
}

struct DynamicContact {
    contact: Contact,
}

/// Owns every body, bilateral constraint and contact manifold, and
/// drives them forward one step at a time.
#[derive(Debug)]
pub struct World {
    bodies: BodyStore,
    constraints: Vec<Box<dyn Constraint>>,
    manifolds: ManifoldCollector,
    config: SolverConfig,
    dirty: HashSet<BodyId>,
}

impl std::fmt::Debug for dyn Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constraint({:?} <-> {:?})", self.body_a(), self.body_b())
    }
}

impl World {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            bodies: BodyStore::new(),
            constraints: Vec::new(),
            manifolds: ManifoldCollector::new(),
            config,
            dirty: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn bodies(&self) -> &BodyStore {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut BodyStore {
        &mut self.bodies
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        self.bodies.insert(body)
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    pub fn manifolds(&self) -> &ManifoldCollector {
        &self.manifolds
    }

    pub fn dirty_bodies(&self) -> impl Iterator<Item = &BodyId> {
        self.dirty.iter()
    }

    /// Clears every constraint's and every manifold contact's cached
    /// Lagrange multipliers. Part of the public restart path (§9): call
    /// this after teleporting bodies or reloading a scene so the next
    /// step doesn't apply stale impulses left over from before the jump.
    pub fn reset_warm_start(&mut self) {
        for constraint in self.constraints.iter_mut() {
            constraint.reset_warm_start();
        }
        for manifold in self.manifolds.manifolds_mut() {
            for penetration in manifold.penetrations_mut() {
                penetration.reset_warm_start();
            }
        }
    }

    /// Advances the simulation by `dt` (§4.11).
    pub fn step(&mut self, dt: Fph) {
        self.dirty.clear();
        let positions_before: Vec<(BodyId, Vec3)> = self.bodies.iter().map(|b| (b.id, b.position)).collect();

        rb_log::with_trace_logging!("manifold pruning"; {
            let bodies = &self.bodies;
            for manifold in self.manifolds.manifolds_mut() {
                let Some(a) = bodies.get(manifold.body_a) else { continue };
                let Some(b) = bodies.get(manifold.body_b) else { continue };
                let orientation_a = a.orientation;
                manifold.remove_expired_contacts(orientation_a, |p| a.world_from_body(p), |p| b.world_from_body(p));
            }
            self.manifolds.retain_non_empty();
        });

        self.apply_gravity(dt);

        let (static_contacts, mut dynamic_contacts) = rb_log::with_trace_logging!("broad/narrow phase"; {
            self.find_contacts(dt)
        });

        for contact in static_contacts {
            let a = self.bodies.get(contact.body_a).unwrap();
            let b = self.bodies.get(contact.body_b).unwrap();
            let material = Material::new(
                Material::combined_restitution(a.elasticity, b.elasticity),
                Material::combined_friction(a.friction, b.friction),
            );
            let orientation_a = a.orientation;
            let manifold = self.manifolds.get_or_create(contact.body_a, contact.body_b);
            manifold.add_contact(&contact, orientation_a, material);
        }

        dynamic_contacts.sort_by(|a, b| a.contact.time_of_impact.partial_cmp(&b.contact.time_of_impact).unwrap());

        rb_log::with_trace_logging!("solve"; {
            for constraint in self.constraints.iter_mut() {
                constraint.pre_solve(&mut self.bodies, dt);
            }
            for manifold in self.manifolds.manifolds_mut() {
                for penetration in manifold.penetrations_mut() {
                    penetration.pre_solve(&mut self.bodies, dt);
                }
            }

            for _ in 0..self.config.pgs_iterations {
                for constraint in self.constraints.iter_mut() {
                    constraint.solve(&mut self.bodies);
                }
                for manifold in self.manifolds.manifolds_mut() {
                    for penetration in manifold.penetrations_mut() {
                        penetration.solve(&mut self.bodies);
                    }
                }
            }

            for manifold in self.manifolds.manifolds_mut() {
                for penetration in manifold.penetrations_mut() {
                    penetration.post_solve();
                }
            }
            for constraint in self.constraints.iter_mut().rev() {
                constraint.post_solve();
            }
        });

        self.replay_dynamic_contacts(&dynamic_contacts, dt);

        for (id, old_position) in positions_before {
            if let Some(body) = self.bodies.get(id) {
                if (body.position - old_position).norm_squared() > 1e-18 {
                    self.dirty.insert(id);
                }
            }
        }
    }

    /// A restricted step used only while the simulation is paused and
    /// the user is dragging a single picked body: after solving, every
    /// body's velocity is zeroed so the drag reads as a teleport rather
    /// than an impulse (§6).
    pub fn apply_picked_item_step(&mut self, dt: Fph) {
        self.step(dt);
        for body in self.bodies.iter_mut() {
            body.linear_velocity = Vec3::zeros();
            body.angular_velocity = Vec3::zeros();
        }
    }

    fn apply_gravity(&mut self, dt: Fph) {
        let impulse_per_unit_mass = self.config.gravity * dt;
        for body in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            body.linear_velocity += impulse_per_unit_mass;
        }
    }

    fn find_contacts(&self, dt: Fph) -> (Vec<Contact>, Vec<DynamicContact>) {
        let slice = self.bodies.as_slice();
        let pairs = broadphase::find_candidate_pairs(slice, dt);

        let mut statics = Vec::new();
        let mut dynamics = Vec::new();
        for pair in pairs {
            let a = &slice[pair.a];
            let b = &slice[pair.b];
            if a.is_static() && b.is_static() {
                continue;
            }
            if let Some(contact) = intersection::intersect(a, b, dt) {
                if contact.time_of_impact == 0.0 {
                    statics.push(contact);
                } else {
                    dynamics.push(DynamicContact { contact });
                }
            }
        }
        (statics, dynamics)
    }

    fn replay_dynamic_contacts(&mut self, dynamic_contacts: &[DynamicContact], dt: Fph) {
        let mut toi_accumulated = 0.0;
        for entry in dynamic_contacts {
            let advance = entry.contact.time_of_impact - toi_accumulated;
            if advance > 0.0 {
                for body in self.bodies.iter_mut() {
                    body.update(advance);
                }
            }
            let (a, b) = self.bodies.pair_mut(entry.contact.body_a, entry.contact.body_b);
            resolve_single_contact_impulse(a, b, &entry.contact);
            toi_accumulated = entry.contact.time_of_impact;
        }
        let remaining = dt - toi_accumulated;
        if remaining > 0.0 {
            for body in self.bodies.iter_mut() {
                body.update(remaining);
            }
        }
    }
}

fn angular_term(inverse_inertia_world: rb_math::Mat3, r: Vec3, axis: Vec3) -> Vec3 {
    (inverse_inertia_world * r.cross(&axis)).cross(&r)
}

fn denominator(a: &Body, b: &Body, r_a: Vec3, r_b: Vec3, axis: Vec3) -> Fph {
    let term_a = angular_term(a.inverse_inertia_tensor_world(), r_a, axis);
    let term_b = angular_term(b.inverse_inertia_tensor_world(), r_b, axis);
    a.inverse_mass + b.inverse_mass + axis.dot(&(term_a + term_b))
}

/// The restitution+friction impulse used only for TOI-sequenced events
/// (not manifold contacts, which go through [`crate::constraint::penetration::Penetration`]
/// instead), per §4.11.
fn resolve_single_contact_impulse(a: &mut Body, b: &mut Body, contact: &Contact) {
    let normal = contact.normal;
    let r_a = contact.world_point_a - a.center_of_mass_world();
    let r_b = contact.world_point_b - b.center_of_mass_world();

    let velocity_at_a = a.linear_velocity + a.angular_velocity.cross(&r_a);
    let velocity_at_b = b.linear_velocity + b.angular_velocity.cross(&r_b);
    let relative_velocity = velocity_at_a - velocity_at_b;

    let restitution = Material::combined_restitution(a.elasticity, b.elasticity);
    let denom = denominator(a, b, r_a, r_b, normal);
    if denom.abs() < 1e-12 {
        return;
    }
    let j = -(1.0 + restitution) * relative_velocity.dot(&normal) / denom;
    a.apply_impulse_at_point(normal * j, contact.world_point_a);
    b.apply_impulse_at_point(-normal * j, contact.world_point_b);

    let velocity_at_a = a.linear_velocity + a.angular_velocity.cross(&r_a);
    let velocity_at_b = b.linear_velocity + b.angular_velocity.cross(&r_b);
    let relative_velocity = velocity_at_a - velocity_at_b;
    let tangential = relative_velocity - normal * relative_velocity.dot(&normal);
    if tangential.norm_squared() > 1e-12 {
        let tangent = tangential.normalize();
        let friction = Material::combined_friction(a.friction, b.friction);
        let denom_t = denominator(a, b, r_a, r_b, tangent);
        if denom_t.abs() > 1e-12 {
            let jt = (-relative_velocity.dot(&tangent) / denom_t).clamp(-friction * j.abs(), friction * j.abs());
            a.apply_impulse_at_point(tangent * jt, contact.world_point_a);
            b.apply_impulse_at_point(-tangent * jt, contact.world_point_b);
        }
    }

    if contact.time_of_impact == 0.0 {
        let total_inverse_mass = a.inverse_mass + b.inverse_mass;
        if total_inverse_mass > 1e-12 {
            let split = contact.world_point_b - contact.world_point_a;
            a.position += split * (a.inverse_mass / total_inverse_mass);
            b.position -= split * (b.inverse_mass / total_inverse_mass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::UnitQuat;

    fn sphere_body(id: u32, pos: Vec3, radius: Fph, inverse_mass: Fph) -> Body {
        Body::new(BodyId(id), Shape::Sphere(Sphere::new(radius)), pos, UnitQuat::identity(), inverse_mass, 0.5, 0.5)
    }

    #[test]
    fn gravity_accumulates_on_dynamic_bodies_only() {
        let mut world = World::new(SolverConfig::default());
        world.add_body(sphere_body(0, Vec3::new(0.0, 0.0, 10.0), 0.5, 1.0));
        world.add_body(sphere_body(1, Vec3::zeros(), 80.0, 0.0));
        world.step(1.0 / 60.0);
        let falling = world.bodies().get(BodyId(0)).unwrap();
        assert!(falling.linear_velocity.z < 0.0);
        let ground = world.bodies().get(BodyId(1)).unwrap();
        assert_eq!(ground.linear_velocity, Vec3::zeros());
    }

    #[test]
    fn reset_warm_start_clears_constraint_cached_lambda() {
        use crate::constraint::distance::Distance;
        let mut world = World::new(SolverConfig::default());
        let a = world.add_body(sphere_body(0, Vec3::new(0.0, 0.0, 5.0), 0.5, 1.0));
        let b = world.add_body(sphere_body(1, Vec3::zeros(), 0.5, 0.0));
        world.add_constraint(Box::new(Distance::new(a, b, Vec3::zeros(), Vec3::zeros(), 1.0)));
        world.step(1.0 / 60.0);
        world.reset_warm_start();
        // No panic and the world still steps cleanly afterwards; the
        // constraint's own unit tests cover that its multiplier is
        // actually zero after this call.
        world.step(1.0 / 60.0);
    }

    #[test]
    fn ball_settles_on_static_sphere() {
        let mut world = World::new(SolverConfig::default());
        world.add_body(sphere_body(0, Vec3::new(0.0, 0.0, 10.0), 0.5, 1.0));
        world.add_body({
            let mut ground = sphere_body(1, Vec3::new(0.0, 0.0, -80.0), 80.0, 0.0);
            ground.elasticity = 0.99;
            ground
        });
        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }
        let ball = world.bodies().get(BodyId(0)).unwrap();
        assert!((ball.position.z - 0.5).abs() < 0.5, "ball should have settled near z=0.5, got {}", ball.position.z);
    }

    fn box_body(id: u32, pos: Vec3, inverse_mass: Fph) -> Body {
        use rb_geometry::shape::cuboid::Cuboid;
        Body::new(
            BodyId(id),
            Shape::Cuboid(Cuboid::new(Vec3::new(0.2, 0.2, 0.2))),
            pos,
            UnitQuat::identity(),
            inverse_mass,
            0.1,
            0.3,
        )
    }

    #[test]
    fn distance_chain_hangs_with_the_last_link_lower_than_the_first() {
        use crate::constraint::distance::Distance;
        let mut world = World::new(SolverConfig::default());
        let link_length = 0.6;
        let mut previous = world.add_body(box_body(0, Vec3::new(0.0, 0.0, 10.0), 0.0));
        let mut ids = vec![previous];
        for i in 1..6 {
            let position = Vec3::new(0.0, 0.0, 10.0 - (i as Fph) * link_length);
            let link = world.add_body(box_body(i, position, 1.0));
            world.add_constraint(Box::new(Distance::new(previous, link, Vec3::zeros(), Vec3::zeros(), link_length)));
            ids.push(link);
            previous = link;
        }

        let initial_spacings: Vec<Fph> = ids.windows(2).map(|w| (world.bodies().get(w[0]).unwrap().position - world.bodies().get(w[1]).unwrap().position).norm()).collect();

        for _ in 0..300 {
            world.step(1.0 / 60.0);
        }

        let first_z = world.bodies().get(ids[0]).unwrap().position.z;
        let last_z = world.bodies().get(*ids.last().unwrap()).unwrap().position.z;
        assert!(last_z < first_z, "last link ({last_z}) should hang below the first ({first_z})");

        for (i, w) in ids.windows(2).enumerate() {
            let spacing = (world.bodies().get(w[0]).unwrap().position - world.bodies().get(w[1]).unwrap().position).norm();
            // The dead zone around the rest length permits some residual
            // sag; this checks the chain holds together rather than
            // stretching unboundedly.
            assert!((spacing - initial_spacings[i]).abs() < 0.15, "spacing {i} drifted: {spacing} vs {}", initial_spacings[i]);
        }
    }

    #[test]
    fn hinge_limit_damps_an_impulsive_kick_without_diverging() {
        use crate::constraint::hinge::HingeLimited;
        let mut world = World::new(SolverConfig::default());
        let frame = world.add_body(box_body(0, Vec3::zeros(), 0.0));
        let panel = world.add_body(box_body(1, Vec3::new(1.0, 0.0, 0.0), 1.0));
        world.add_constraint(Box::new(HingeLimited::new(
            frame,
            panel,
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        )));

        // A one-step impulsive kick about the hinge axis, then released.
        world.bodies_mut().get_mut(panel).unwrap().angular_velocity = Vec3::new(50.0, 0.0, 0.0);

        for _ in 0..60 {
            world.step(1.0 / 60.0);
            let body = world.bodies().get(panel).unwrap();
            assert!(body.angular_velocity.x.is_finite());
            assert!(body.position.iter().all(|c| c.is_finite()), "panel position diverged");
        }
        let panel_body = world.bodies().get(panel).unwrap();
        assert!(panel_body.angular_velocity.x.abs() < 50.0, "limit row should have bled off some of the kick");
    }

    #[test]
    fn spinner_motor_reaches_its_target_speed() {
        use crate::constraint::spinner::Spinner;
        let mut world = World::new(SolverConfig::default());
        let pivot = world.add_body(sphere_body(0, Vec3::zeros(), 0.1, 0.0));
        let top = world.add_body(sphere_body(1, Vec3::new(0.0, 0.0, 1.0), 0.3, 0.6));
        world.add_constraint(Box::new(Spinner::new(pivot, top, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), 1.0, 30.0, 2.0)));

        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        let spin = world.bodies().get(top).unwrap().angular_velocity.z;
        assert!((spin - 2.0).abs() < 0.1, "motor should have settled near 2 rad/s, got {spin}");
    }

    #[test]
    fn box_stack_stays_roughly_aligned_above_the_ground() {
        let mut world = World::new(SolverConfig::default());
        world.add_body({
            let mut floor = sphere_body(0, Vec3::new(0.0, 0.0, -80.0), 80.0, 0.0);
            floor.elasticity = 0.99;
            floor
        });

        let half_extent = 0.5;
        let mut ids = Vec::new();
        for i in 0..5u32 {
            let x_offset = if i % 2 == 0 { 0.0 } else { 0.15 };
            let position = Vec3::new(x_offset, 0.0, half_extent * (2.0 * i as Fph + 1.0));
            ids.push(world.add_body(box_body(i + 1, position, 1.0)));
        }

        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }

        let bottom = world.bodies().get(ids[0]).unwrap();
        let top = world.bodies().get(*ids.last().unwrap()).unwrap();
        let lateral_drift = ((top.position.x - bottom.position.x).powi(2) + (top.position.y - bottom.position.y).powi(2)).sqrt();
        assert!(lateral_drift < 1.0, "top box drifted too far from the bottom box: {lateral_drift}");
        for id in &ids {
            let b = world.bodies().get(*id).unwrap();
            assert!(b.position.z > -1.0, "box {:?} fell through the ground, z={}", id, b.position.z);
        }
    }

    #[test]
    fn convex_diamond_settles_on_the_floor() {
        use rb_geometry::shape::convex::Convex;
        let mut world = World::new(SolverConfig::default());
        world.add_body({
            let mut floor = sphere_body(0, Vec3::new(0.0, 0.0, -80.0), 80.0, 0.0);
            floor.elasticity = 0.3;
            floor
        });

        let half_height = 0.5;
        let points = [
            Vec3::new(0.0, 0.0, half_height),
            Vec3::new(0.0, 0.0, -half_height),
            Vec3::new(half_height, 0.0, 0.0),
            Vec3::new(-half_height, 0.0, 0.0),
            Vec3::new(0.0, half_height, 0.0),
            Vec3::new(0.0, -half_height, 0.0),
        ];
        let hull = Convex::build(&points).expect("diamond point cloud builds a hull");
        let diamond = world.add_body(Body::new(BodyId(1), Shape::Convex(hull), Vec3::new(0.0, 0.0, 10.0), UnitQuat::identity(), 0.7, 0.2, 0.7));

        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }
        let body = world.bodies().get(diamond).unwrap();
        assert!(body.position.z < 2.0, "diamond should have settled near the floor, got z={}", body.position.z);
        assert!(body.position.z > -half_height, "diamond sank through the floor, got z={}", body.position.z);
    }

    #[test]
    fn identical_inputs_step_to_identical_outputs() {
        fn build() -> World {
            let mut world = World::new(SolverConfig::default());
            world.add_body(sphere_body(0, Vec3::new(0.1, 0.2, 10.0), 0.5, 1.0));
            world.add_body({
                let mut floor = sphere_body(1, Vec3::new(0.0, 0.0, -80.0), 80.0, 0.0);
                floor.elasticity = 0.5;
                floor
            });
            world
        }
        let mut a = build();
        let mut b = build();
        for _ in 0..120 {
            a.step(1.0 / 60.0);
            b.step(1.0 / 60.0);
        }
        let ball_a = a.bodies().get(BodyId(0)).unwrap();
        let ball_b = b.bodies().get(BodyId(0)).unwrap();
        assert_eq!(ball_a.position, ball_b.position);
        assert_eq!(ball_a.linear_velocity, ball_b.linear_velocity);
        assert_eq!(ball_a.angular_velocity, ball_b.angular_velocity);
    }

    #[test]
    fn resting_contact_keeps_a_nonzero_warm_start_multiplier() {
        let mut world = World::new(SolverConfig::default());
        world.add_body(sphere_body(0, Vec3::new(0.0, 0.0, 0.6), 0.5, 1.0));
        world.add_body({
            let mut floor = sphere_body(1, Vec3::new(0.0, 0.0, -80.0), 80.0, 0.0);
            floor.elasticity = 0.2;
            floor
        });
        for _ in 0..300 {
            world.step(1.0 / 60.0);
        }
        let has_warm_contact = world.manifolds().manifolds().any(|m| !m.contacts().is_empty());
        assert!(has_warm_contact, "a ball resting on the floor should still have a live manifold contact");
    }
}
