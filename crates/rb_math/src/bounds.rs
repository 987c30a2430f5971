use crate::{Fph, Point3, Vec3};

/// An axis-aligned bounding box, used by the broad phase and by shapes
/// that need a cheap conservative bound on their extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point3,
    pub max: Point3,
}

impl Bounds {
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// An inside-out bound with `min = +inf`, `max = -inf`, the correct
    /// starting point for an incremental `expand_to_include` fold.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(Fph::MAX, Fph::MAX, Fph::MAX),
            max: Point3::new(Fph::MIN, Fph::MIN, Fph::MIN),
        }
    }

    pub fn expand_to_include_point(&mut self, point: &Point3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn expand_to_include(&mut self, other: &Bounds) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Grows the box by `margin` on every side, used to build the
    /// swept, inflated bounds the broad phase sorts on.
    pub fn expanded(&self, margin: Fph) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bounds_absorbs_first_point() {
        let mut b = Bounds::empty();
        b.expand_to_include_point(&Point3::new(1.0, 2.0, 3.0));
        assert_eq!(b.min, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(b.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = Bounds::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Bounds::new(Point3::new(2.0, 2.0, 2.0), Point3::new(3.0, 3.0, 3.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let a = Bounds::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Bounds::new(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5));
        assert!(a.intersects(&b));
    }
}
