//! Incremental convex-hull construction from a point cloud, and the
//! tetrahedral-decomposition mass-property computation used once the
//! hull is built.

use rb_math::{Bounds, Fph, Mat3, Vec3};

const MERGE_EPSILON: Fph = 0.01;

#[derive(Clone, Copy, Debug)]
struct Triangle {
    a: usize,
    b: usize,
    c: usize,
}

/// The result of a successful hull build: a pruned vertex list, a CCW
/// triangle list with outward-facing normals, and the derived mass
/// properties.
#[derive(Clone, Debug)]
pub struct HullData {
    pub points: Vec<Vec3>,
    pub triangles: Vec<[usize; 3]>,
    pub center_of_mass: Vec3,
    pub inertia_tensor: Mat3,
    pub local_bounds: Bounds,
}

/// Builds a convex hull from `points`. Returns `None` if fewer than 4
/// distinct points are supplied (§4.4 edge case: no hull is built; the
/// caller must not use the shape).
pub fn build(points: &[Vec3]) -> Option<HullData> {
    let mut distinct: Vec<Vec3> = Vec::new();
    'outer: for &p in points {
        for &q in &distinct {
            if (p - q).norm() < 1e-9 {
                continue 'outer;
            }
        }
        distinct.push(p);
    }
    if distinct.len() < 4 {
        return None;
    }

    let (mut verts, mut tris) = seed_tetrahedron(&distinct)?;
    let mut external: Vec<usize> = (0..distinct.len())
        .filter(|&i| is_external(&verts, &tris, distinct[i], MERGE_EPSILON))
        .collect();

    while let Some(idx) = external.pop() {
        let p = distinct[idx];
        if !is_external(&verts, &tris, p, MERGE_EPSILON) {
            continue;
        }

        let (visible, kept): (Vec<Triangle>, Vec<Triangle>) =
            tris.iter().copied().partition(|t| is_visible(&verts, t, p));
        if visible.is_empty() {
            continue;
        }

        let horizon = horizon_edges(&visible);
        let apex = verts.len();
        verts.push(p);

        let mut new_tris = kept;
        for (a, b) in horizon {
            new_tris.push(Triangle { a, b, c: apex });
        }
        tris = new_tris;

        external.retain(|&i| is_external(&verts, &tris, distinct[i], MERGE_EPSILON));
    }

    let (verts, tris) = compact(verts, tris);
    if tris.is_empty() {
        return None;
    }

    let mut local_bounds = Bounds::empty();
    for &v in &verts {
        local_bounds.expand_to_include_point(&nalgebra::Point3::from(v));
    }

    let (center_of_mass, inertia_tensor) = mass_properties(&verts, &tris);

    Some(HullData {
        points: verts,
        triangles: tris.iter().map(|t| [t.a, t.b, t.c]).collect(),
        center_of_mass,
        inertia_tensor,
        local_bounds,
    })
}

fn outward_normal(verts: &[Vec3], t: &Triangle) -> Vec3 {
    (verts[t.b] - verts[t.a]).cross(&(verts[t.c] - verts[t.a]))
}

fn is_visible(verts: &[Vec3], t: &Triangle, p: Vec3) -> bool {
    outward_normal(verts, t).dot(&(p - verts[t.a])) > MERGE_EPSILON
}

fn is_external(verts: &[Vec3], tris: &[Triangle], p: Vec3, eps: Fph) -> bool {
    tris.iter()
        .any(|t| outward_normal(verts, t).dot(&(p - verts[t.a])) > eps)
}

/// Edges that belong to exactly one of the `visible` (about-to-be-
/// removed) triangles, oriented as stored on that triangle — the open
/// boundary a new apex fans across.
fn horizon_edges(visible: &[Triangle]) -> Vec<(usize, usize)> {
    let mut edges: Vec<(usize, usize)> = Vec::new();
    for t in visible {
        edges.push((t.a, t.b));
        edges.push((t.b, t.c));
        edges.push((t.c, t.a));
    }
    edges
        .iter()
        .copied()
        .filter(|&(a, b)| !edges.contains(&(b, a)))
        .collect()
}

fn seed_tetrahedron(points: &[Vec3]) -> Option<(Vec<Vec3>, Vec<Triangle>)> {
    let seed1_idx = argmax(points, |p| p.x)?;
    let seed1 = points[seed1_idx];

    let dir1 = if seed1.norm() > 1e-12 {
        seed1.normalize()
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };
    let seed2_idx = argmin(points, |p| p.dot(&dir1))?;
    let seed2 = points[seed2_idx];
    if (seed2 - seed1).norm() < 1e-9 {
        return None;
    }

    let line_dir = (seed2 - seed1).normalize();
    let seed3_idx = argmax_excluding(points, &[seed1_idx, seed2_idx], |p| {
        let to_p = p - seed1;
        (to_p - line_dir * to_p.dot(&line_dir)).norm()
    })?;
    let seed3 = points[seed3_idx];

    let mut normal = (seed2 - seed1).cross(&(seed3 - seed1));
    if normal.norm() < 1e-12 {
        return None;
    }
    normal = normal.normalize();

    let seed4_idx = argmax_excluding(points, &[seed1_idx, seed2_idx, seed3_idx], |p| {
        (normal.dot(&(p - seed1))).abs()
    })?;
    let seed4 = points[seed4_idx];

    let verts = vec![seed1, seed2, seed3, seed4];
    let (i0, i1, i2, i3) = (0usize, 1usize, 2usize, 3usize);

    // Orient the base triangle so its outward normal points away from
    // the fourth point (the tetrahedron's interior side).
    let base_normal = (verts[i1] - verts[i0]).cross(&(verts[i2] - verts[i0]));
    let (i1, i2) = if base_normal.dot(&(verts[i3] - verts[i0])) > 0.0 {
        (i2, i1)
    } else {
        (i1, i2)
    };

    let mut tris = vec![
        Triangle { a: i0, b: i1, c: i2 },
        Triangle { a: i0, b: i2, c: i3 },
        Triangle { a: i0, b: i3, c: i1 },
        Triangle { a: i1, b: i3, c: i2 },
    ];

    // Every face must have an outward normal relative to the centroid.
    let centroid = (verts[0] + verts[1] + verts[2] + verts[3]) / 4.0;
    for t in &mut tris {
        if outward_normal(&verts, t).dot(&(centroid - verts[t.a])) > 0.0 {
            std::mem::swap(&mut t.b, &mut t.c);
        }
    }

    Some((verts, tris))
}

fn argmax(points: &[Vec3], key: impl Fn(&Vec3) -> Fph) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| key(a).partial_cmp(&key(b)).unwrap())
        .map(|(i, _)| i)
}

fn argmin(points: &[Vec3], key: impl Fn(&Vec3) -> Fph) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| key(a).partial_cmp(&key(b)).unwrap())
        .map(|(i, _)| i)
}

fn argmax_excluding(points: &[Vec3], excluded: &[usize], key: impl Fn(&Vec3) -> Fph) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| !excluded.contains(i))
        .max_by(|(_, a), (_, b)| key(a).partial_cmp(&key(b)).unwrap())
        .map(|(i, _)| i)
}

/// Drops vertices no longer referenced by any triangle and renumbers
/// the survivors.
fn compact(verts: Vec<Vec3>, tris: Vec<Triangle>) -> (Vec<Vec3>, Vec<Triangle>) {
    let mut used = vec![false; verts.len()];
    for t in &tris {
        used[t.a] = true;
        used[t.b] = true;
        used[t.c] = true;
    }
    let mut remap = vec![0usize; verts.len()];
    let mut new_verts = Vec::new();
    for (i, &keep) in used.iter().enumerate() {
        if keep {
            remap[i] = new_verts.len();
            new_verts.push(verts[i]);
        }
    }
    let new_tris = tris
        .into_iter()
        .map(|t| Triangle {
            a: remap[t.a],
            b: remap[t.b],
            c: remap[t.c],
        })
        .collect();
    (new_verts, new_tris)
}

/// Decomposes the hull into tetrahedra sharing the centroid of the
/// vertex list, per §4.4.
fn mass_properties(verts: &[Vec3], tris: &[Triangle]) -> (Vec3, Mat3) {
    let centroid: Vec3 = verts.iter().sum::<Vec3>() / (verts.len() as Fph);

    let mut total_volume = 0.0;
    let mut weighted_centroid = Vec3::zeros();
    let mut ixx = 0.0;
    let mut iyy = 0.0;
    let mut izz = 0.0;
    let mut ixy = 0.0;
    let mut ixz = 0.0;
    let mut iyz = 0.0;

    for t in tris {
        let (pa, pb, pc) = (verts[t.a], verts[t.b], verts[t.c]);
        let ad = centroid - pa;
        let ab = pb - pa;
        let ac = pc - pa;
        let volume = (ad.dot(&ab.cross(&ac)) / 6.0).abs();
        if volume < 1e-15 {
            continue;
        }

        let tetra_centroid = (pa + pb + pc + centroid) / 4.0;
        total_volume += volume;
        weighted_centroid += tetra_centroid * volume;

        let a = pa - centroid;
        let b = pb - centroid;
        let c = pc - centroid;
        let xs = [a.x, b.x, c.x];
        let ys = [a.y, b.y, c.y];
        let zs = [a.z, b.z, c.z];

        ixx += volume / 20.0 * (quad(&ys) + quad(&zs));
        iyy += volume / 20.0 * (quad(&xs) + quad(&zs));
        izz += volume / 20.0 * (quad(&xs) + quad(&ys));
        ixy -= volume / 20.0 * prod(&xs, &ys);
        ixz -= volume / 20.0 * prod(&xs, &zs);
        iyz -= volume / 20.0 * prod(&ys, &zs);
    }

    if total_volume < 1e-15 {
        return (centroid, Mat3::identity());
    }

    let com = weighted_centroid / total_volume;
    #[rustfmt::skip]
    let inertia = Mat3::new(
        ixx, ixy, ixz,
        ixy, iyy, iyz,
        ixz, iyz, izz,
    ) / total_volume;
    (com, inertia)
}

fn quad(c: &[Fph; 3]) -> Fph {
    c[0] * c[0] + c[1] * c[1] + c[2] * c[2] + c[0] * c[1] + c[1] * c[2] + c[2] * c[0]
}

fn prod(a: &[Fph; 3], b: &[Fph; 3]) -> Fph {
    2.0 * (a[0] * b[0] + a[1] * b[1] + a[2] * b[2])
        + a[0] * b[1]
        + a[1] * b[0]
        + a[1] * b[2]
        + a[2] * b[1]
        + a[2] * b[0]
        + a[0] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cube_points() -> Vec<Vec3> {
        let mut pts = Vec::new();
        for &x in &[-1.0, 1.0] {
            for &y in &[-1.0, 1.0] {
                for &z in &[-1.0, 1.0] {
                    pts.push(Vec3::new(x, y, z));
                }
            }
        }
        pts
    }

    #[test]
    fn too_few_points_yields_no_hull() {
        let pts = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        assert!(build(&pts).is_none());
    }

    #[test]
    fn cube_hull_has_eight_vertices_and_is_convex() {
        let hull = build(&cube_points()).expect("cube should build a hull");
        assert_eq!(hull.points.len(), 8);
        assert!(!hull.triangles.is_empty());
        for [a, b, c] in &hull.triangles {
            let normal = outward_normal(
                &hull.points,
                &Triangle {
                    a: *a,
                    b: *b,
                    c: *c,
                },
            );
            for p in &hull.points {
                assert!(normal.dot(&(p - hull.points[*a])) <= MERGE_EPSILON);
            }
        }
    }

    #[test]
    fn cube_center_of_mass_is_origin() {
        let hull = build(&cube_points()).unwrap();
        assert_abs_diff_eq!(hull.center_of_mass, Vec3::zeros(), epsilon = 1e-6);
    }
}
