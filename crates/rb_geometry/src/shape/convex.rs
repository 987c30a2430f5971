use super::hull::{self, HullData};
use super::speed_over_points;
use rb_math::{Bounds, Fph, Isometry, Mat3, Point3, Vec3};

/// A shape built from an arbitrary convex point cloud at authoring
/// time (§4.4). Carries the pruned vertex list, a CCW outward-facing
/// triangle list, and precomputed mass properties.
#[derive(Clone, Debug)]
pub struct Convex {
    data: HullData,
}

impl Convex {
    /// Builds a convex hull from `points`. Returns `None` per the
    /// §4.4 edge case (fewer than 4 distinct points).
    pub fn build(points: &[Vec3]) -> Option<Self> {
        hull::build(points).map(|data| {
            rb_log::info!(
                "built convex hull with {} vertices, {} triangles",
                data.points.len(),
                data.triangles.len()
            );
            Self { data }
        })
    }

    pub fn points(&self) -> &[Vec3] {
        &self.data.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.data.triangles
    }

    pub fn support(&self, dir: Vec3, pose: &Isometry, bias: Fph) -> Vec3 {
        let best_local = self
            .data
            .points
            .iter()
            .copied()
            .max_by(|a, b| dir.dot(a).partial_cmp(&dir.dot(b)).unwrap())
            .expect("a built hull always has at least 4 points");
        pose * Point3::from(best_local) + dir.normalize() * bias
    }

    pub fn inertia_tensor(&self) -> Mat3 {
        self.data.inertia_tensor
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.data.center_of_mass
    }

    pub fn local_bounds(&self) -> Bounds {
        self.data.local_bounds
    }

    pub fn fastest_linear_speed(&self, omega: Vec3, dir: Vec3) -> Fph {
        speed_over_points(&self.data.points, self.data.center_of_mass, omega, dir)
    }
}
