//! 1-D sweep-and-prune broad phase (§4.7).

use crate::body::{Body, BodyId};
use rb_math::{Bounds, Fph};

/// Small per-axis inflation applied to every swept AABB before
/// sorting, so near-touching pairs aren't missed by floating-point
/// edge effects.
const SWEEP_EPSILON: Fph = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

#[derive(Clone, Copy)]
struct Endpoint {
    value: Fph,
    body_index: usize,
    is_min: bool,
}

/// An unordered candidate pair of body indices (not ids — the caller
/// already has the backing slice and can index directly).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidatePair {
    pub a: usize,
    pub b: usize,
}

/// Computes every body's swept, inflated world AABB, picks the axis of
/// largest global extent (ties broken X, then Y, then Z), and scans
/// the sorted endpoint sequence for overlapping pairs.
pub fn find_candidate_pairs(bodies: &[Body], dt: Fph) -> Vec<CandidatePair> {
    if bodies.len() < 2 {
        return Vec::new();
    }

    let swept_bounds: Vec<Bounds> = bodies
        .iter()
        .map(|b| {
            let world = b.shape.world_bounds(&rb_math::Isometry::from_parts(
                b.position.into(),
                b.orientation,
            ));
            let mut swept = world;
            swept.expand_to_include_point(&(world.min + b.linear_velocity * dt));
            swept.expand_to_include_point(&(world.max + b.linear_velocity * dt));
            swept.expanded(SWEEP_EPSILON)
        })
        .collect();

    let mut global = Bounds::empty();
    for b in &swept_bounds {
        global.expand_to_include(b);
    }
    let extents = global.extents();
    let axis = if extents.x >= extents.y && extents.x >= extents.z {
        Axis::X
    } else if extents.y >= extents.z {
        Axis::Y
    } else {
        Axis::Z
    };

    let component = |bounds: &Bounds, axis: Axis, is_min: bool| -> Fph {
        let p = if is_min { bounds.min } else { bounds.max };
        match axis {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    };

    let mut endpoints: Vec<Endpoint> = Vec::with_capacity(swept_bounds.len() * 2);
    for (i, bounds) in swept_bounds.iter().enumerate() {
        endpoints.push(Endpoint {
            value: component(bounds, axis, true),
            body_index: i,
            is_min: true,
        });
        endpoints.push(Endpoint {
            value: component(bounds, axis, false),
            body_index: i,
            is_min: false,
        });
    }
    endpoints.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap());

    let mut active: Vec<usize> = Vec::new();
    let mut pairs: Vec<CandidatePair> = Vec::new();
    for endpoint in endpoints {
        if endpoint.is_min {
            for &other in &active {
                pairs.push(CandidatePair {
                    a: other.min(endpoint.body_index),
                    b: other.max(endpoint.body_index),
                });
            }
            active.push(endpoint.body_index);
        } else {
            active.retain(|&i| i != endpoint.body_index);
        }
    }

    pairs
}

/// Handy when candidate pairs need to be resolved to [`BodyId`]s
/// rather than plain slice indices.
pub fn resolve_ids(bodies: &[Body], pairs: &[CandidatePair]) -> Vec<(BodyId, BodyId)> {
    pairs.iter().map(|p| (bodies[p.a].id, bodies[p.b].id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;
    use crate::shape::sphere::Sphere;
    use crate::shape::Shape;
    use rb_math::{UnitQuat, Vec3};

    fn sphere_body(id: u32, pos: Vec3) -> Body {
        Body::new(
            BodyId(id),
            Shape::Sphere(Sphere::new(0.5)),
            pos,
            UnitQuat::identity(),
            1.0,
            0.5,
            0.5,
        )
    }

    #[test]
    fn overlapping_bodies_are_paired() {
        let bodies = vec![
            sphere_body(0, Vec3::new(0.0, 0.0, 0.0)),
            sphere_body(1, Vec3::new(0.5, 0.0, 0.0)),
        ];
        let pairs = find_candidate_pairs(&bodies, 1.0 / 60.0);
        assert_eq!(pairs, vec![CandidatePair { a: 0, b: 1 }]);
    }

    #[test]
    fn distant_bodies_are_not_paired() {
        let bodies = vec![
            sphere_body(0, Vec3::new(0.0, 0.0, 0.0)),
            sphere_body(1, Vec3::new(100.0, 0.0, 0.0)),
        ];
        let pairs = find_candidate_pairs(&bodies, 1.0 / 60.0);
        assert!(pairs.is_empty());
    }
}
