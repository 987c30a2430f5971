//! Expanding Polytope Algorithm: penetration depth and witness points
//! from a GJK terminal simplex known to contain the origin (§4.5).

use crate::gjk::SupportPoint;
use crate::shape::Shape;
use rb_math::{Fph, Isometry, Vec3};

const EPA_DUPLICATE_EPSILON_SQ: Fph = 0.001 * 0.001;
const MAX_EPA_ITERATIONS: usize = 32;

/// Result of a successful EPA run: witness points on each shape (with
/// the authoring bias still applied, per §4.6's "inflate by bias to
/// undo the bias" step performed by the caller) and the separating
/// normal pointing from B toward A.
#[derive(Clone, Copy, Debug)]
pub struct EpaResult {
    pub point_on_a: Vec3,
    pub point_on_b: Vec3,
    pub normal: Vec3,
    pub depth: Fph,
}

#[derive(Clone, Copy, Debug)]
struct Face {
    a: usize,
    b: usize,
    c: usize,
    normal: Vec3,
    distance: Fph,
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

fn make_face(points: &[SupportPoint], a: usize, b: usize, c: usize) -> Face {
    let normal = (points[b].point - points[a].point)
        .cross(&(points[c].point - points[a].point))
        .normalize();
    let distance = normal.dot(&points[a].point);
    if distance < 0.0 {
        // Keep normals outward (away from the origin, which lies
        // inside the polytope by construction).
        let normal = -normal;
        let distance = -distance;
        return Face { a, b: c, c: b, normal, distance };
    }
    Face { a, b, c, normal, distance }
}

/// Pads a GJK terminal simplex (which may have 1-4 points) out to a
/// full enclosing tetrahedron by injecting extra supports, per §4.5.
fn ensure_tetrahedron(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    mut simplex: Vec<SupportPoint>,
    bias: Fph,
) -> Option<Vec<SupportPoint>> {
    let candidate_axes = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
    ];

    while simplex.len() < 4 {
        let dir = match simplex.len() {
            1 => Vec3::new(1.0, 0.0, 0.0),
            2 => {
                let ab = simplex[1].point - simplex[0].point;
                ab.cross(&Vec3::new(1.0, 0.0, 0.0))
                    .try_normalize(1e-9)
                    .unwrap_or_else(|| ab.cross(&Vec3::new(0.0, 1.0, 0.0)).normalize())
            }
            3 => (simplex[1].point - simplex[0].point)
                .cross(&(simplex[2].point - simplex[0].point))
                .try_normalize(1e-9)?,
            _ => unreachable!(),
        };

        let mut added = false;
        for &axis in [dir].iter().chain(candidate_axes.iter()) {
            let candidate = support(shape_a, pose_a, shape_b, pose_b, axis, bias);
            let distinct = simplex
                .iter()
                .all(|s| (s.point - candidate.point).norm_squared() > 1e-12);
            if distinct {
                simplex.push(candidate);
                added = true;
                break;
            }
        }
        if !added {
            return None;
        }
    }
    Some(simplex)
}

/// Runs EPA from a GJK terminal simplex known to enclose the origin.
/// Returns `None` if the polytope degenerates (should not happen for
/// a valid GJK intersection, but guarded rather than panicking).
pub fn run(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    simplex: Vec<SupportPoint>,
    bias: Fph,
) -> Option<EpaResult> {
    let mut points = ensure_tetrahedron(shape_a, pose_a, shape_b, pose_b, simplex, bias)?;

    let base_normal = (points[1].point - points[0].point).cross(&(points[2].point - points[0].point));
    let (i1, i2) = if base_normal.dot(&(points[3].point - points[0].point)) > 0.0 {
        (2usize, 1usize)
    } else {
        (1usize, 2usize)
    };
    let mut faces = vec![
        make_face(&points, 0, i1, i2),
        make_face(&points, 0, i2, 3),
        make_face(&points, 0, 3, i1),
        make_face(&points, i1, 3, i2),
    ];

    for _ in 0..MAX_EPA_ITERATIONS {
        let closest = faces
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance.partial_cmp(&b.distance).unwrap())
            .map(|(i, f)| (i, *f))?;
        let (_, face) = closest;

        let new_point = support(shape_a, pose_a, shape_b, pose_b, face.normal, bias);
        let advanced = new_point.point.dot(&face.normal) - face.distance;

        let already_present = points
            .iter()
            .any(|p| (p.point - new_point.point).norm_squared() < EPA_DUPLICATE_EPSILON_SQ);

        if advanced < 1e-6 || already_present {
            return Some(witness(&points, &face));
        }

        let new_index = points.len();
        points.push(new_point);

        let (visible, kept): (Vec<Face>, Vec<Face>) = faces
            .iter()
            .copied()
            .partition(|f| f.normal.dot(&(new_point.point - points[f.a].point)) > 1e-9);
        if visible.is_empty() {
            return Some(witness(&points, &face));
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for f in &visible {
            edges.push((f.a, f.b));
            edges.push((f.b, f.c));
            edges.push((f.c, f.a));
        }
        let horizon: Vec<(usize, usize)> = edges
            .iter()
            .copied()
            .filter(|&(a, b)| !edges.contains(&(b, a)))
            .collect();

        let mut new_faces = kept;
        for (a, b) in horizon {
            new_faces.push(make_face(&points, a, b, new_index));
        }
        faces = new_faces;
    }

    faces
        .iter()
        .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap())
        .map(|f| witness(&points, f))
}

fn witness(points: &[SupportPoint], face: &Face) -> EpaResult {
    let a = points[face.a];
    let b = points[face.b];
    let c = points[face.c];
    let target = face.normal * face.distance;

    let (u, v, w) = barycentric_of_point(a.point, b.point, c.point, target);

    EpaResult {
        point_on_a: a.on_a * u + b.on_a * v + c.on_a * w,
        point_on_b: a.on_b * u + b.on_b * v + c.on_b * w,
        normal: face.normal,
        depth: face.distance,
    }
}

fn barycentric_of_point(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> (Fph, Fph, Fph) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-20 {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    if u.is_nan() || v.is_nan() || w.is_nan() {
        (1.0, 0.0, 0.0)
    } else {
        (u, v, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gjk;
    use crate::shape::sphere::Sphere;

    #[test]
    fn epa_witness_matches_overlap_depth() {
        let sphere = Shape::Sphere(Sphere::new(1.0));
        let pose_a = Isometry::translation(0.0, 0.0, 0.0);
        let pose_b = Isometry::translation(1.5, 0.0, 0.0);

        let outcome = gjk::run_biased(&sphere, &pose_a, &sphere, &pose_b, 0.0);
        let gjk::GjkOutcome::Intersecting { simplex } = outcome else {
            panic!("expected intersection");
        };
        let result = run(&sphere, &pose_a, &sphere, &pose_b, simplex, 0.0).expect("epa should converge");
        assert!((result.point_on_a - result.point_on_b).norm() < 0.6);
        assert!(result.depth > 0.0);
    }
}
