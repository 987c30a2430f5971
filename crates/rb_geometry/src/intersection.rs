//! Produces a [`Contact`] from a `(bodyA, bodyB, dt)` triple (§4.6).

use crate::body::Body;
use crate::contact::Contact;
use crate::epa;
use crate::gjk::{self, GjkOutcome};
use crate::shape::ShapeKind;
use rb_math::{Fph, Isometry, Vec3};
use roots::{find_roots_quadratic, Roots};

/// Small outward bias used ahead of EPA so touching (zero-depth)
/// configurations still produce a usable witness, and undone again
/// once the witness is known.
const EPA_BIAS: Fph = 0.001;

/// Maximum number of conservative-advancement iterations for the
/// general convex continuous path (§4.6). A tunable, per §9.
pub const MAX_CONSERVATIVE_ADVANCEMENT_ITERATIONS: usize = 10;

fn pose_of(body: &Body) -> Isometry {
    Isometry::from_parts(body.position.into(), body.orientation)
}

/// Computes a contact record for `(a, b)` over the step `dt`, or
/// `None` if the pair does not intersect within the step.
pub fn intersect(a: &Body, b: &Body, dt: Fph) -> Option<Contact> {
    match (a.shape.kind(), b.shape.kind()) {
        (ShapeKind::Sphere, ShapeKind::Sphere) => sphere_sphere(a, b, dt),
        _ => convex_general(a, b, dt),
    }
}

fn sphere_radius(body: &Body) -> Fph {
    match &body.shape {
        crate::shape::Shape::Sphere(s) => s.radius,
        _ => unreachable!("sphere_sphere path only called for sphere shapes"),
    }
}

fn sphere_sphere(a: &Body, b: &Body, dt: Fph) -> Option<Contact> {
    let combined_radius = sphere_radius(a) + sphere_radius(b);

    let static_contact = |a_pos: Vec3, b_pos: Vec3, toi: Fph| -> Option<Contact> {
        let delta = a_pos - b_pos;
        let distance = delta.norm();
        if distance > combined_radius {
            return None;
        }
        let normal = if distance > 1e-9 {
            delta / distance
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };
        let world_point_a = a_pos - normal * sphere_radius(a);
        let world_point_b = b_pos + normal * sphere_radius(b);
        Some(Contact {
            body_a: a.id,
            body_b: b.id,
            world_point_a,
            world_point_b,
            local_point_a: a.body_from_world(world_point_a),
            local_point_b: b.body_from_world(world_point_b),
            normal,
            separation: distance - combined_radius,
            time_of_impact: toi,
        })
    };

    if let Some(c) = static_contact(a.position, b.position, 0.0) {
        return Some(c);
    }

    if a.is_static() && b.is_static() {
        return None;
    }

    // Continuous path: ray from A's position along the relative
    // velocity direction across dt, solved against a sphere of the
    // combined radius centered on B.
    let relative_velocity = a.linear_velocity - b.linear_velocity;
    if relative_velocity.norm_squared() < 1e-12 {
        return None;
    }

    let ray_origin = a.position - b.position;
    let ray_dir = relative_velocity;

    // |ray_origin + t*ray_dir|^2 = combined_radius^2
    let qa = ray_dir.norm_squared();
    let qb = 2.0 * ray_origin.dot(&ray_dir);
    let qc = ray_origin.norm_squared() - combined_radius * combined_radius;

    let roots = find_roots_quadratic(qa, qb, qc);
    let (t0, t1) = match roots {
        Roots::No([]) => return None,
        Roots::One([t]) => (t, t),
        Roots::Two([t0, t1]) => (t0, t1),
        _ => return None,
    };
    let (t_min, t_max) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };

    let toi = if t_min >= 0.0 && t_min <= dt {
        t_min
    } else if t_min < 0.0 && t_max >= 0.0 {
        0.0
    } else {
        return None;
    };
    if toi > dt {
        return None;
    }

    let a_pos_at_toi = a.position + a.linear_velocity * toi;
    let b_pos_at_toi = b.position + b.linear_velocity * toi;
    static_contact(a_pos_at_toi, b_pos_at_toi, toi)
}

fn convex_general(a: &Body, b: &Body, dt: Fph) -> Option<Contact> {
    if a.is_static() && b.is_static() {
        return None;
    }

    if let Some(c) = convex_static(a, b, 0.0) {
        return Some(c);
    }

    conservative_advancement(a, b, dt)
}

fn convex_static(a: &Body, b: &Body, toi: Fph) -> Option<Contact> {
    let pose_a = pose_of(a);
    let pose_b = pose_of(b);
    match gjk::run_biased(&a.shape, &pose_a, &b.shape, &pose_b, EPA_BIAS) {
        GjkOutcome::Intersecting { simplex } => {
            let result = epa::run(&a.shape, &pose_a, &b.shape, &pose_b, simplex, EPA_BIAS)?;
            // Undo the authoring bias along the outward normal to
            // recover the true surface witness points.
            let world_point_a = result.point_on_a - result.normal * EPA_BIAS;
            let world_point_b = result.point_on_b + result.normal * EPA_BIAS;
            Some(Contact {
                body_a: a.id,
                body_b: b.id,
                world_point_a,
                world_point_b,
                local_point_a: a.body_from_world(world_point_a),
                local_point_b: b.body_from_world(world_point_b),
                normal: result.normal,
                separation: -(result.depth - 2.0 * EPA_BIAS),
                time_of_impact: toi,
            })
        }
        GjkOutcome::Separated { .. } => None,
    }
}

fn closest_distance(a: &Body, b: &Body) -> Option<(Fph, Vec3)> {
    let pose_a = pose_of(a);
    let pose_b = pose_of(b);
    match gjk::closest_points(&a.shape, &pose_a, &b.shape, &pose_b) {
        GjkOutcome::Separated { closest, .. } => {
            let distance = closest.norm();
            if distance < 1e-12 {
                None
            } else {
                Some((distance, closest / distance))
            }
        }
        GjkOutcome::Intersecting { .. } => None,
    }
}

fn conservative_advancement(a: &Body, b: &Body, dt: Fph) -> Option<Contact> {
    let mut toi_accumulated = 0.0;
    let mut work_a = clone_for_advancement(a);
    let mut work_b = clone_for_advancement(b);

    for _ in 0..MAX_CONSERVATIVE_ADVANCEMENT_ITERATIONS {
        if let Some(mut contact) = convex_static(&work_a, &work_b, toi_accumulated) {
            unwind(&mut work_a, &mut work_b, toi_accumulated);
            contact.time_of_impact = toi_accumulated;
            return Some(contact);
        }

        let Some((distance, dir)) = closest_distance(&work_a, &work_b) else {
            return None;
        };

        let omega_a_local = work_a.orientation.inverse() * work_a.angular_velocity;
        let omega_b_local = work_b.orientation.inverse() * work_b.angular_velocity;
        let angular_bound_a = work_a.shape.fastest_linear_speed(omega_a_local, dir);
        let angular_bound_b = work_b.shape.fastest_linear_speed(omega_b_local, -dir);

        let relative_normal_speed =
            (work_a.linear_velocity - work_b.linear_velocity).dot(&dir) + angular_bound_a + angular_bound_b;

        if relative_normal_speed <= 0.0 {
            return None;
        }

        let time_to_close = distance / relative_normal_speed;
        let remaining = dt - toi_accumulated;
        if time_to_close > remaining {
            return None;
        }

        work_a.update(time_to_close);
        work_b.update(time_to_close);
        toi_accumulated += time_to_close;
    }

    unwind(&mut work_a, &mut work_b, toi_accumulated);
    None
}

fn clone_for_advancement(body: &Body) -> Body {
    Body {
        id: body.id,
        position: body.position,
        orientation: body.orientation,
        linear_velocity: body.linear_velocity,
        angular_velocity: body.angular_velocity,
        inverse_mass: body.inverse_mass,
        elasticity: body.elasticity,
        friction: body.friction,
        shape: body.shape.clone(),
    }
}

fn unwind(work_a: &mut Body, work_b: &mut Body, toi_accumulated: Fph) {
    work_a.update(-toi_accumulated);
    work_b.update(-toi_accumulated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;
    use crate::shape::sphere::Sphere;
    use crate::shape::Shape;
    use rb_math::UnitQuat;

    fn sphere_body(id: u32, pos: Vec3, radius: Fph, inverse_mass: Fph) -> Body {
        Body::new(
            BodyId(id),
            Shape::Sphere(Sphere::new(radius)),
            pos,
            UnitQuat::identity(),
            inverse_mass,
            0.5,
            0.5,
        )
    }

    #[test]
    fn overlapping_spheres_produce_zero_toi_contact() {
        let a = sphere_body(0, Vec3::new(0.0, 0.0, 0.0), 1.0, 1.0);
        let b = sphere_body(1, Vec3::new(1.5, 0.0, 0.0), 1.0, 0.0);
        let contact = intersect(&a, &b, 1.0 / 60.0).expect("should overlap");
        assert_eq!(contact.time_of_impact, 0.0);
        assert!(contact.separation <= 0.0);
    }

    #[test]
    fn fast_sphere_tunnels_are_caught_by_toi() {
        let mut a = sphere_body(0, Vec3::new(0.0, 0.0, 0.0), 0.5, 1.0);
        a.linear_velocity = Vec3::new(100.0, 0.0, 0.0);
        let b = sphere_body(1, Vec3::new(2.0, 0.0, 0.0), 0.5, 0.0);
        let contact = intersect(&a, &b, 1.0 / 60.0).expect("fast sphere should still register a hit");
        assert!(contact.time_of_impact >= 0.0 && contact.time_of_impact <= 1.0 / 60.0);
    }
}
