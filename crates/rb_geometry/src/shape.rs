//! Convex shape variants and the support-mapping contract they share.

pub mod convex;
pub mod cuboid;
pub mod hull;
pub mod sphere;

use convex::Convex;
use cuboid::Cuboid;
use rb_math::{Bounds, Fph, Isometry, Mat3, Vec3};
use sphere::Sphere;

/// Discriminant for the shape variant, exposed so the intersection
/// layer can pick the right narrow-phase path without a second match
/// on the `Shape` enum itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Sphere,
    Cuboid,
    Convex,
}

/// A convex collision shape. Closed, compile-time-known set of
/// variants dispatched with a plain `match` rather than a vtable, so
/// the hot paths (`support`, `fastest_linear_speed`) monomorphize.
#[derive(Clone, Debug)]
pub enum Shape {
    Sphere(Sphere),
    Cuboid(Cuboid),
    Convex(Convex),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Cuboid(_) => ShapeKind::Cuboid,
            Shape::Convex(_) => ShapeKind::Convex,
        }
    }

    /// The point of the shape, transformed by `pose` and inflated by
    /// `bias` along `dir`, that maximizes `dir . p`. `dir` need not be
    /// normalized by the caller for the box/convex paths but should be
    /// unit length when `bias != 0`, since bias is added along `dir`
    /// directly.
    pub fn support(&self, dir: Vec3, pose: &Isometry, bias: Fph) -> Vec3 {
        match self {
            Shape::Sphere(s) => s.support(dir, pose, bias),
            Shape::Cuboid(c) => c.support(dir, pose, bias),
            Shape::Convex(c) => c.support(dir, pose, bias),
        }
    }

    pub fn inertia_tensor(&self) -> Mat3 {
        match self {
            Shape::Sphere(s) => s.inertia_tensor(),
            Shape::Cuboid(c) => c.inertia_tensor(),
            Shape::Convex(c) => c.inertia_tensor(),
        }
    }

    pub fn center_of_mass(&self) -> Vec3 {
        match self {
            Shape::Sphere(s) => s.center_of_mass(),
            Shape::Cuboid(c) => c.center_of_mass(),
            Shape::Convex(c) => c.center_of_mass(),
        }
    }

    pub fn local_bounds(&self) -> Bounds {
        match self {
            Shape::Sphere(s) => s.local_bounds(),
            Shape::Cuboid(c) => c.local_bounds(),
            Shape::Convex(c) => c.local_bounds(),
        }
    }

    pub fn world_bounds(&self, pose: &Isometry) -> Bounds {
        let local = self.local_bounds();
        let mut world = Bounds::empty();
        for corner in corners_of(&local) {
            world.expand_to_include_point(&(pose * corner));
        }
        world
    }

    /// Maximum over vertices `v` of `dir . (omega x (v - com))`, used
    /// by conservative advancement to bound how fast rotation can move
    /// a point along `dir`. `omega` is expressed in the shape's local
    /// frame (the caller rotates the world angular velocity into the
    /// body's local frame before calling this), matching the cheap,
    /// approximate nature of the bound.
    pub fn fastest_linear_speed(&self, omega: Vec3, dir: Vec3) -> Fph {
        match self {
            Shape::Sphere(s) => s.fastest_linear_speed(omega, dir),
            Shape::Cuboid(c) => c.fastest_linear_speed(omega, dir),
            Shape::Convex(c) => c.fastest_linear_speed(omega, dir),
        }
    }
}

fn corners_of(b: &Bounds) -> [rb_math::Point3; 8] {
    [
        rb_math::Point3::new(b.min.x, b.min.y, b.min.z),
        rb_math::Point3::new(b.max.x, b.min.y, b.min.z),
        rb_math::Point3::new(b.min.x, b.max.y, b.min.z),
        rb_math::Point3::new(b.max.x, b.max.y, b.min.z),
        rb_math::Point3::new(b.min.x, b.min.y, b.max.z),
        rb_math::Point3::new(b.max.x, b.min.y, b.max.z),
        rb_math::Point3::new(b.min.x, b.max.y, b.max.z),
        rb_math::Point3::new(b.max.x, b.max.y, b.max.z),
    ]
}

fn fastest_linear_speed_over_points(points: &[Vec3], center_of_mass: Vec3, omega: Vec3, dir: Vec3) -> Fph {
    points
        .iter()
        .map(|v| dir.dot(&omega.cross(&(v - center_of_mass))))
        .fold(Fph::MIN, Fph::max)
}

pub(crate) use fastest_linear_speed_over_points as speed_over_points;
