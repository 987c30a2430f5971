use super::speed_over_points;
use rb_math::{Bounds, Fph, Isometry, Mat3, Point3, Vec3};

/// An axis-aligned (in local space) box, stored as its 8 corner points
/// so the support scan is identical in shape to [`super::convex::Convex`].
#[derive(Clone, Debug)]
pub struct Cuboid {
    points: [Vec3; 8],
    local_bounds: Bounds,
    center_of_mass: Vec3,
}

impl Cuboid {
    pub fn new(half_extents: Vec3) -> Self {
        Self::from_bounds(Bounds::new(
            Point3::origin() - half_extents,
            Point3::origin() + half_extents,
        ))
    }

    pub fn from_bounds(local_bounds: Bounds) -> Self {
        let min = local_bounds.min.coords;
        let max = local_bounds.max.coords;
        let points = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ];
        let center_of_mass = local_bounds.center().coords;
        Self {
            points,
            local_bounds,
            center_of_mass,
        }
    }

    pub fn support(&self, dir: Vec3, pose: &Isometry, bias: Fph) -> Vec3 {
        let best_local = self
            .points
            .iter()
            .copied()
            .max_by(|a, b| dir.dot(a).partial_cmp(&dir.dot(b)).unwrap())
            .expect("cuboid always has 8 points");
        pose * Point3::from(best_local) + dir.normalize() * bias
    }

    /// `(dy^2 + dz^2)/12` pattern per axis. This is already the
    /// inertia about the box's own centroid regardless of where that
    /// centroid sits relative to the shape's local origin, since §4.2
    /// defines the tensor about the center of mass; no parallel-axis
    /// correction is needed for a box authored directly from its
    /// half-extents. A correction is only needed when a box is built
    /// from an arbitrary (non-centered) `Bounds`, which is why
    /// `local_bounds`'s extents (not a stored half-extent) drive this.
    pub fn inertia_tensor(&self) -> Mat3 {
        let extents = self.local_bounds.extents();
        let (dx, dy, dz) = (extents.x, extents.y, extents.z);
        let ixx = (dy * dy + dz * dz) / 12.0;
        let iyy = (dx * dx + dz * dz) / 12.0;
        let izz = (dx * dx + dy * dy) / 12.0;
        Mat3::from_diagonal(&Vec3::new(ixx, iyy, izz))
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.center_of_mass
    }

    pub fn local_bounds(&self) -> Bounds {
        self.local_bounds
    }

    pub fn fastest_linear_speed(&self, omega: Vec3, dir: Vec3) -> Fph {
        speed_over_points(&self.points, self.center_of_mass, omega, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn support_picks_correct_corner() {
        let c = Cuboid::new(Vec3::new(1.0, 2.0, 3.0));
        let pose = Isometry::identity();
        let p = c.support(Vec3::new(1.0, 1.0, 1.0), &pose, 0.0);
        assert_abs_diff_eq!(p, Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-9);
    }

    #[test]
    fn centered_cuboid_has_zero_com() {
        let c = Cuboid::new(Vec3::new(1.0, 1.0, 1.0));
        assert_abs_diff_eq!(c.center_of_mass(), Vec3::zeros(), epsilon = 1e-9);
    }
}
