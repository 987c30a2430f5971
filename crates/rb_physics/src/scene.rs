//! Scene builder DSL (§6, §10): a set of free functions that append
//! bodies (and sometimes constraints) to a [`World`] and return the
//! next free body id. The concrete numeric parameters here — box
//! sizes, masses, anchor placements — are scene content, not core
//! physics, and are chosen in the same unit-ish register throughout:
//! inverse masses around 0.5-1, restitution 0.1-0.99, friction 0.5-0.9.

use crate::constraint::constant_velocity::{ConstantVelocity, ConstantVelocityLimited};
use crate::constraint::hinge::{Hinge, HingeLimited};
use crate::constraint::mover::SimpleMover;
use crate::constraint::orientation::Orientation;
use crate::constraint::spinner::Spinner;
use crate::world::World;
use rb_geometry::body::{Body, BodyId};
use rb_geometry::shape::convex::Convex;
use rb_geometry::shape::cuboid::Cuboid;
use rb_geometry::shape::sphere::Sphere;
use rb_geometry::shape::Shape;
use rb_math::{Fph, UnitQuat, Vec3};

fn sphere(world: &mut World, position: Vec3, radius: Fph, inverse_mass: Fph, restitution: Fph, friction: Fph) -> BodyId {
    world.add_body(Body::new(
        next_id(world),
        Shape::Sphere(Sphere::new(radius)),
        position,
        UnitQuat::identity(),
        inverse_mass,
        restitution,
        friction,
    ))
}

fn next_id(world: &World) -> BodyId {
    BodyId(world.bodies().iter().map(|b| b.id.0).max().map_or(0, |m| m + 1))
}

/// Drops `count` spheres in a vertical line above `origin`, evenly
/// spaced so they don't start overlapping.
pub fn add_spheres(world: &mut World, origin: Vec3, count: u32, radius: Fph) -> BodyId {
    let mut last = BodyId(0);
    for i in 0..count {
        let position = origin + Vec3::new(0.0, 0.0, (i as Fph) * radius * 2.5);
        last = sphere(world, position, radius, 0.8, 0.4, 0.6);
    }
    last
}

/// Drops `count` convex diamonds (bipyramids) above `origin`.
pub fn add_diamonds(world: &mut World, origin: Vec3, count: u32, half_height: Fph) -> BodyId {
    let points = [
        Vec3::new(0.0, 0.0, half_height),
        Vec3::new(0.0, 0.0, -half_height),
        Vec3::new(half_height, 0.0, 0.0),
        Vec3::new(-half_height, 0.0, 0.0),
        Vec3::new(0.0, half_height, 0.0),
        Vec3::new(0.0, -half_height, 0.0),
    ];
    let hull = Convex::build(&points).expect("six non-coplanar points always build a hull");
    let mut last = BodyId(0);
    for i in 0..count {
        let position = origin + Vec3::new(0.0, 0.0, (i as Fph) * half_height * 3.0);
        last = world.add_body(Body::new(
            next_id(world),
            Shape::Convex(hull.clone()),
            position,
            UnitQuat::identity(),
            0.7,
            0.2,
            0.7,
        ));
    }
    last
}

/// A large static sphere standing in for ground, matching the radius
/// the end-to-end ball-drop scenario expects.
pub fn add_floor(world: &mut World, radius: Fph) -> BodyId {
    sphere(world, Vec3::new(0.0, 0.0, -radius), radius, 0.0, 0.99, 0.8)
}

/// A box stack: `count` cuboids resting on top of each other.
pub fn add_stack(world: &mut World, origin: Vec3, count: u32, half_extent: Fph) -> BodyId {
    let mut last = BodyId(0);
    for i in 0..count {
        let position = origin + Vec3::new(0.0, 0.0, half_extent * (2.0 * i as Fph + 1.0));
        last = world.add_body(Body::new(
            next_id(world),
            Shape::Cuboid(Cuboid::new(Vec3::new(half_extent, half_extent, half_extent))),
            position,
            UnitQuat::identity(),
            1.0,
            0.1,
            0.6,
        ));
    }
    last
}

/// A single kinematic sphere driven by [`SimpleMover`]; body A and B
/// of the constraint are conventionally the same id, per §4.8.
pub fn add_mover(world: &mut World, position: Vec3, radius: Fph) -> BodyId {
    let id = sphere(world, position, radius, 1.0, 0.3, 0.5);
    world.add_constraint(Box::new(SimpleMover::new(id)));
    id
}

/// A hanging chain of `count` spheres, the first anchored to a fixed
/// point via a distance constraint, each subsequent link distance-
/// constrained to the previous one.
pub fn add_chain(world: &mut World, anchor: Vec3, count: u32, link_length: Fph, link_radius: Fph) -> BodyId {
    let pivot = sphere(world, anchor, link_radius, 0.0, 0.1, 0.5);
    let mut previous = pivot;
    let mut last = pivot;
    for i in 0..count {
        let position = anchor - Vec3::new(0.0, 0.0, (i as Fph + 1.0) * link_length);
        let link = sphere(world, position, link_radius, 0.9, 0.1, 0.5);
        world.add_constraint(Box::new(crate::constraint::distance::Distance::new(
            previous,
            link,
            Vec3::zeros(),
            Vec3::zeros(),
            link_length,
        )));
        previous = link;
        last = link;
    }
    last
}

/// A door-style hinge: pins two anchor points together and locks the
/// axis perpendicular to the hinge with a constant-velocity joint, per
/// the composition note in `hinge.rs`. `limit` enables the swing/twist
/// limit on both halves.
pub fn add_hinge(
    world: &mut World,
    static_anchor: Vec3,
    panel_origin: Vec3,
    half_extent: Vec3,
    hinge_axis: Vec3,
    limit: bool,
) -> BodyId {
    let frame = sphere(world, static_anchor, 0.1, 0.0, 0.1, 0.5);
    let panel = world.add_body(Body::new(
        next_id(world),
        Shape::Cuboid(Cuboid::new(half_extent)),
        panel_origin,
        UnitQuat::identity(),
        0.8,
        0.1,
        0.6,
    ));
    let local_anchor_panel = static_anchor - panel_origin;
    if limit {
        world.add_constraint(Box::new(HingeLimited::new(
            frame,
            panel,
            Vec3::zeros(),
            local_anchor_panel,
            hinge_axis,
            hinge_axis,
        )));
        world.add_constraint(Box::new(ConstantVelocityLimited::new(frame, panel, hinge_axis, hinge_axis)));
    } else {
        world.add_constraint(Box::new(Hinge::new(frame, panel, Vec3::zeros(), local_anchor_panel)));
        world.add_constraint(Box::new(ConstantVelocity::new(frame, panel, hinge_axis, hinge_axis)));
    }
    panel
}

/// Two bodies joined by a plain constant-velocity joint (no limit).
pub fn add_velocity(world: &mut World, body_a: BodyId, body_b: BodyId, axis: Vec3) -> BodyId {
    world.add_constraint(Box::new(ConstantVelocity::new(body_a, body_b, axis, axis)));
    body_b
}

/// Locks `body_b`'s orientation to `body_a`'s (identity target).
pub fn add_orientation(world: &mut World, body_a: BodyId, body_b: BodyId) -> BodyId {
    world.add_constraint(Box::new(Orientation::new(body_a, body_b, UnitQuat::identity())));
    body_b
}

/// A gyroscope toy: a static pivot and a spinning top joined by a
/// [`Spinner`] constraint with the motor driving a steady spin rate.
pub fn add_spinner(world: &mut World, pivot_position: Vec3, rod_axis: Vec3, rod_length: Fph, motor_speed: Fph) -> BodyId {
    let pivot = sphere(world, pivot_position, 0.1, 0.0, 0.1, 0.5);
    let top = sphere(world, pivot_position + rod_axis * rod_length, 0.3, 0.6, 0.2, 0.5);
    world.add_constraint(Box::new(Spinner::new(pivot, top, Vec3::zeros(), rod_axis, rod_length, 30.0, motor_speed)));
    top
}

/// A simple ragdoll: a torso sphere with two hinge-jointed limbs
/// hanging off it, each a short capsule-like stack of spheres.
pub fn add_ragdoll(world: &mut World, torso_position: Vec3) -> BodyId {
    let torso = sphere(world, torso_position, 0.5, 0.5, 0.2, 0.6);
    let mut last = torso;
    for side in [-1.0, 1.0] {
        let limb_anchor = torso_position + Vec3::new(side * 0.5, 0.0, -0.2);
        let limb_origin = limb_anchor + Vec3::new(0.0, 0.0, -0.5);
        let limb = sphere(world, limb_origin, 0.25, 0.8, 0.2, 0.6);
        world.add_constraint(Box::new(Hinge::new(torso, limb, Vec3::new(side * 0.5, 0.0, -0.2), Vec3::new(0.0, 0.0, 0.5))));
        last = limb;
    }
    last
}

/// A single convex shape built from an explicit point cloud, dropped
/// above `origin`. Errors, leaving the world unchanged, if `points`
/// doesn't build a hull (fewer than 4 non-coplanar points, per the
/// hull builder's edge case) — this is the authoring-boundary
/// precondition check the spec's error-handling section calls for.
pub fn add_convex(world: &mut World, origin: Vec3, points: &[Vec3], inverse_mass: Fph) -> anyhow::Result<BodyId> {
    let hull = Convex::build(points).ok_or_else(|| anyhow::anyhow!("convex hull needs at least 4 non-coplanar points"))?;
    Ok(world.add_body(Body::new(
        next_id(world),
        Shape::Convex(hull),
        origin,
        UnitQuat::identity(),
        inverse_mass,
        0.3,
        0.6,
    )))
}

/// The kitchen-sink demo scene: floor, a box stack, a chain, a hinge
/// door and a spinner, all in one world. Mirrors the "sandbox" scene
/// every physics demo app tends to ship for manual poking.
pub fn add_sandbox(world: &mut World) {
    add_floor(world, 40.0);
    add_stack(world, Vec3::new(-3.0, 0.0, 0.0), 4, 0.5);
    add_chain(world, Vec3::new(0.0, 0.0, 5.0), 5, 0.6, 0.2);
    add_hinge(
        world,
        Vec3::new(3.0, 0.0, 3.0),
        Vec3::new(3.5, 0.0, 3.0),
        Vec3::new(0.5, 0.1, 0.8),
        Vec3::new(0.0, 0.0, 1.0),
        true,
    );
    add_spinner(world, Vec3::new(-3.0, 3.0, 3.0), Vec3::new(0.0, 1.0, 0.0), 1.0, 8.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::SolverConfig;

    #[test]
    fn add_stack_creates_the_requested_number_of_bodies() {
        let mut world = World::new(SolverConfig::default());
        add_stack(&mut world, Vec3::zeros(), 3, 0.5);
        assert_eq!(world.bodies().len(), 3);
    }

    #[test]
    fn add_chain_links_bodies_with_distance_constraints() {
        let mut world = World::new(SolverConfig::default());
        add_chain(&mut world, Vec3::new(0.0, 0.0, 10.0), 4, 0.5, 0.1);
        // pivot + 4 links
        assert_eq!(world.bodies().len(), 5);
    }

    #[test]
    fn add_convex_errors_on_degenerate_input() {
        let mut world = World::new(SolverConfig::default());
        let result = add_convex(&mut world, Vec3::zeros(), &[Vec3::zeros(), Vec3::x()], 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn add_sandbox_populates_a_nonempty_world() {
        let mut world = World::new(SolverConfig::default());
        add_sandbox(&mut world);
        assert!(world.bodies().len() > 0);
    }
}
