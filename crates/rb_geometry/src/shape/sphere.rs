use rb_math::{Bounds, Fph, Isometry, Mat3, Point3, Vec3};

#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub radius: Fph,
}

impl Sphere {
    pub fn new(radius: Fph) -> Self {
        Self { radius }
    }

    pub fn support(&self, dir: Vec3, pose: &Isometry, bias: Fph) -> Vec3 {
        let dir = dir.normalize();
        pose.translation.vector + dir * (self.radius + bias)
    }

    /// `2/5 * r^2` on the diagonal, as for any solid sphere of unit
    /// density about its own center.
    pub fn inertia_tensor(&self) -> Mat3 {
        Mat3::identity() * (2.0 / 5.0 * self.radius * self.radius)
    }

    pub fn center_of_mass(&self) -> Vec3 {
        Vec3::zeros()
    }

    pub fn local_bounds(&self) -> Bounds {
        let r = Vec3::new(self.radius, self.radius, self.radius);
        Bounds::new(Point3::origin() - r, Point3::origin() + r)
    }

    pub fn fastest_linear_speed(&self, omega: Vec3, dir: Vec3) -> Fph {
        // Every point on the sphere's surface is `radius` from the
        // center of mass and the bound is linear in that distance, so
        // the supremum is attained at the point most aligned with
        // `omega x dir`.
        let axis = omega.cross(&dir);
        axis.norm() * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn support_lies_on_surface_along_direction() {
        let s = Sphere::new(2.0);
        let pose = Isometry::identity();
        let p = s.support(Vec3::new(0.0, 0.0, 1.0), &pose, 0.0);
        assert_abs_diff_eq!(p, Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn support_includes_bias() {
        let s = Sphere::new(2.0);
        let pose = Isometry::identity();
        let p = s.support(Vec3::new(1.0, 0.0, 0.0), &pose, 0.5);
        assert_abs_diff_eq!(p, Vec3::new(2.5, 0.0, 0.0), epsilon = 1e-9);
    }
}
