//! GJK intersection test and closest-points query (§4.5).

use crate::shape::Shape;
use rb_math::{Fph, Isometry, Vec3};

/// The maximum number of GJK iterations for the continuous/bias
/// queries used by conservative advancement and the static convex
/// path. A heuristic tunable, per the design notes (§9).
pub const MAX_ITERATION_COUNT: usize = 9;

const DUPLICATE_EPSILON_SQ: Fph = 0.0001 * 0.0001;

/// A point of the Minkowski difference `A - B`, carrying its preimage
/// on each shape so witness points can be recovered later.
#[derive(Clone, Copy, Debug)]
pub struct SupportPoint {
    pub point: Vec3,
    pub on_a: Vec3,
    pub on_b: Vec3,
}

fn support(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    dir: Vec3,
    bias: Fph,
) -> SupportPoint {
    let on_a = shape_a.support(dir, pose_a, bias);
    let on_b = shape_b.support(-dir, pose_b, bias);
    SupportPoint {
        point: on_a - on_b,
        on_a,
        on_b,
    }
}

/// Outcome of a GJK run.
#[derive(Clone, Debug)]
pub enum GjkOutcome {
    /// The shapes intersect (or, in closest-points mode, is never
    /// returned — see [`closest_points`]). Carries the terminal
    /// simplex so EPA can continue from it.
    Intersecting { simplex: Vec<SupportPoint> },
    /// No intersection; carries the closest point found so far for
    /// distance/closest-point queries.
    Separated { closest: Vec3, on_a: Vec3, on_b: Vec3 },
}

/// Boolean intersection test: `true` iff the shapes overlap under
/// `pose_a`/`pose_b`.
pub fn intersects(shape_a: &Shape, pose_a: &Isometry, shape_b: &Shape, pose_b: &Isometry) -> bool {
    matches!(
        run(shape_a, pose_a, shape_b, pose_b, 0.0, MAX_ITERATION_COUNT, false),
        GjkOutcome::Intersecting { .. }
    )
}

/// Closest-points query: runs the same loop without the early "origin
/// excluded" exit, and always returns the closest features found.
pub fn closest_points(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
) -> GjkOutcome {
    run(shape_a, pose_a, shape_b, pose_b, 0.0, MAX_ITERATION_COUNT, true)
}

/// Runs GJK with a small outward bias (used by the static convex path
/// ahead of EPA, so touching configurations still produce a witness).
pub fn run_biased(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    bias: Fph,
) -> GjkOutcome {
    run(shape_a, pose_a, shape_b, pose_b, bias, MAX_ITERATION_COUNT, true)
}

fn run(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    bias: Fph,
    max_iterations: usize,
    closest_points_mode: bool,
) -> GjkOutcome {
    let mut simplex = vec![support(shape_a, pose_a, shape_b, pose_b, Vec3::new(1.0, 1.0, 1.0), bias)];
    let mut dir = -simplex[0].point;
    let mut best_distance_sq = Fph::MAX;

    for _ in 0..max_iterations {
        if dir.norm_squared() < 1e-20 {
            return GjkOutcome::Intersecting { simplex };
        }

        let new_point = support(shape_a, pose_a, shape_b, pose_b, dir, bias);

        if simplex
            .iter()
            .any(|s| (s.point - new_point.point).norm_squared() < DUPLICATE_EPSILON_SQ)
        {
            break;
        }

        if !closest_points_mode && dir.dot(&new_point.point) < 0.0 {
            return separated(&simplex);
        }

        simplex.push(new_point);

        match reduce_simplex(&simplex) {
            SimplexStep::Contains => return GjkOutcome::Intersecting { simplex },
            SimplexStep::Reduced { kept, new_dir } => {
                simplex = kept;
                let distance_sq = new_dir.norm_squared();
                if distance_sq >= best_distance_sq {
                    break;
                }
                best_distance_sq = distance_sq;
                dir = new_dir;
            }
        }
    }

    separated(&simplex)
}

fn separated(simplex: &[SupportPoint]) -> GjkOutcome {
    let (weights, _) = barycentric_of_origin(simplex);
    let mut closest = Vec3::zeros();
    let mut on_a = Vec3::zeros();
    let mut on_b = Vec3::zeros();
    for (s, w) in simplex.iter().zip(weights.iter()) {
        closest += s.point * *w;
        on_a += s.on_a * *w;
        on_b += s.on_b * *w;
    }
    GjkOutcome::Separated { closest, on_a, on_b }
}

/// Barycentric weights of the origin's projection onto `simplex`,
/// used both to pick the next search direction and, at termination,
/// to recover witness points as the same combination of preimages.
pub fn barycentric_of_origin(simplex: &[SupportPoint]) -> (Vec<Fph>, Vec3) {
    match simplex.len() {
        1 => (vec![1.0], simplex[0].point),
        2 => {
            let (w, p) = line_barycentric(simplex[0].point, simplex[1].point);
            (w, p)
        }
        3 => {
            let (w, p) = triangle_barycentric(simplex[0].point, simplex[1].point, simplex[2].point);
            (w, p)
        }
        4 => {
            let (w, p) = tetrahedron_barycentric(
                simplex[0].point,
                simplex[1].point,
                simplex[2].point,
                simplex[3].point,
            );
            (w, p)
        }
        _ => unreachable!("GJK simplex never exceeds 4 points"),
    }
}

enum SimplexStep {
    Contains,
    Reduced { kept: Vec<SupportPoint>, new_dir: Vec3 },
}

fn reduce_simplex(simplex: &[SupportPoint]) -> SimplexStep {
    match simplex.len() {
        2 => {
            let (w, proj) = line_barycentric(simplex[0].point, simplex[1].point);
            let kept: Vec<SupportPoint> = simplex
                .iter()
                .zip(w.iter())
                .filter(|(_, &wi)| wi > 0.0)
                .map(|(s, _)| *s)
                .collect();
            SimplexStep::Reduced {
                kept,
                new_dir: -proj,
            }
        }
        3 => {
            let (w, proj) = triangle_barycentric(simplex[0].point, simplex[1].point, simplex[2].point);
            let kept: Vec<SupportPoint> = simplex
                .iter()
                .zip(w.iter())
                .filter(|(_, &wi)| wi > 0.0)
                .map(|(s, _)| *s)
                .collect();
            SimplexStep::Reduced {
                kept,
                new_dir: -proj,
            }
        }
        4 => {
            let (w, proj) = tetrahedron_barycentric(
                simplex[0].point,
                simplex[1].point,
                simplex[2].point,
                simplex[3].point,
            );
            if w.iter().all(|&wi| wi >= 0.0) {
                return SimplexStep::Contains;
            }
            let kept: Vec<SupportPoint> = simplex
                .iter()
                .zip(w.iter())
                .filter(|(_, &wi)| wi > 0.0)
                .map(|(s, _)| *s)
                .collect();
            SimplexStep::Reduced {
                kept,
                new_dir: -proj,
            }
        }
        _ => unreachable!("reduce_simplex called with an unexpected simplex size"),
    }
}

fn line_barycentric(a: Vec3, b: Vec3) -> (Vec<Fph>, Vec3) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-20 {
        return (vec![1.0, 0.0], a);
    }
    let t = (-a.dot(&ab) / len_sq).clamp(0.0, 1.0);
    let proj = a + ab * t;
    (vec![1.0 - t, t], proj)
}

fn triangle_barycentric(a: Vec3, b: Vec3, c: Vec3) -> (Vec<Fph>, Vec3) {
    let normal = (b - a).cross(&(c - a));
    let area_sq = normal.norm_squared();
    if area_sq < 1e-20 {
        let (w, p) = line_barycentric(a, b);
        return (vec![w[0], w[1], 0.0], p);
    }

    // Project onto the dominant axis to maximize numeric area, as the
    // 2-/3-simplex cases in §4.5 call for.
    let abs_n = Vec3::new(normal.x.abs(), normal.y.abs(), normal.z.abs());
    let (i0, i1) = if abs_n.x >= abs_n.y && abs_n.x >= abs_n.z {
        (1usize, 2usize)
    } else if abs_n.y >= abs_n.z {
        (0usize, 2usize)
    } else {
        (0usize, 1usize)
    };

    let a2 = [a[i0], a[i1]];
    let b2 = [b[i0], b[i1]];
    let c2 = [c[i0], c[i1]];
    let p2 = [0.0, 0.0];

    let area_full = edge2(a2, b2, c2);
    if area_full.abs() < 1e-20 {
        let (w, p) = line_barycentric(a, b);
        return (vec![w[0], w[1], 0.0], p);
    }
    let u = edge2(b2, c2, p2) / area_full;
    let v = edge2(c2, a2, p2) / area_full;
    let w = 1.0 - u - v;

    if u >= 0.0 && v >= 0.0 && w >= 0.0 {
        let proj = a * u + b * v + c * w;
        return (vec![u, v, w], proj);
    }

    // Outside the triangle: fall back to the nearest edge.
    let candidates = [
        (line_barycentric(a, b), [0usize, 1, 2]),
        (line_barycentric(b, c), [1usize, 2, 0]),
        (line_barycentric(c, a), [2usize, 0, 1]),
    ];
    let mut best: Option<(Fph, Vec<Fph>)> = None;
    for ((w2, proj), order) in candidates {
        let dist_sq = proj.norm_squared();
        let mut full = vec![0.0; 3];
        full[order[0]] = w2[0];
        full[order[1]] = w2[1];
        if best.as_ref().map(|(d, _)| dist_sq < *d).unwrap_or(true) {
            best = Some((dist_sq, full));
        }
    }
    let (_, weights) = best.unwrap();
    let proj = a * weights[0] + b * weights[1] + c * weights[2];
    (weights, proj)
}

fn edge2(a: [Fph; 2], b: [Fph; 2], p: [Fph; 2]) -> Fph {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Barycentric weights of the origin within tetrahedron (a,b,c,d),
/// via cofactors of the augmented 4x4 matrix: each weight is the
/// signed volume of the sub-tetrahedron formed by the origin and
/// three of the four vertices, divided by the full signed volume.
fn tetrahedron_barycentric(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> (Vec<Fph>, Vec3) {
    let full = (b - a).dot(&(c - a).cross(&(d - a)));
    if full.abs() < 1e-20 {
        let (w, p) = triangle_barycentric(a, b, c);
        return (vec![w[0], w[1], w[2], 0.0], p);
    }

    let origin = Vec3::zeros();
    let vol = |p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3| (p1 - p0).dot(&(p2 - p0).cross(&(p3 - p0)));

    let wa = vol(origin, b, c, d) / full;
    let wb = vol(a, origin, c, d) / full;
    let wc = vol(a, b, origin, d) / full;
    let wd = vol(a, b, c, origin) / full;

    if wa.is_nan() || wb.is_nan() || wc.is_nan() || wd.is_nan() {
        return (vec![1.0, 0.0, 0.0, 0.0], a);
    }

    if [wa, wb, wc, wd].iter().all(|w| *w >= 0.0) {
        return (vec![wa, wb, wc, wd], origin);
    }

    // Not contained: fall back to the closest of the four faces.
    let faces = [
        ([a, b, c], [0usize, 1, 2, 3]),
        ([a, b, d], [0usize, 1, 3, 2]),
        ([a, c, d], [0usize, 2, 3, 1]),
        ([b, c, d], [1usize, 2, 3, 0]),
    ];
    let mut best: Option<(Fph, Vec<Fph>, Vec3)> = None;
    for ([p0, p1, p2], order) in faces {
        let (w3, proj) = triangle_barycentric(p0, p1, p2);
        let dist_sq = proj.norm_squared();
        let mut full_w = vec![0.0; 4];
        full_w[order[0]] = w3[0];
        full_w[order[1]] = w3[1];
        full_w[order[2]] = w3[2];
        if best.as_ref().map(|(d, _, _)| dist_sq < *d).unwrap_or(true) {
            best = Some((dist_sq, full_w, proj));
        }
    }
    let (_, weights, proj) = best.unwrap();
    (weights, proj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere::Sphere;

    #[test]
    fn overlapping_spheres_intersect() {
        let sphere = Shape::Sphere(Sphere::new(1.0));
        let pose_a = Isometry::translation(0.0, 0.0, 0.0);
        let pose_b = Isometry::translation(1.5, 0.0, 0.0);
        assert!(intersects(&sphere, &pose_a, &sphere, &pose_b));
    }

    #[test]
    fn distant_spheres_do_not_intersect() {
        let sphere = Shape::Sphere(Sphere::new(1.0));
        let pose_a = Isometry::translation(0.0, 0.0, 0.0);
        let pose_b = Isometry::translation(10.0, 0.0, 0.0);
        assert!(!intersects(&sphere, &pose_a, &sphere, &pose_b));
    }

    #[test]
    fn gjk_is_symmetric() {
        let sphere = Shape::Sphere(Sphere::new(1.0));
        let pose_a = Isometry::translation(0.0, 0.0, 0.0);
        let pose_b = Isometry::translation(1.9, 0.2, -0.1);
        assert_eq!(
            intersects(&sphere, &pose_a, &sphere, &pose_b),
            intersects(&sphere, &pose_b, &sphere, &pose_a)
        );
    }
}
