//! Shared math types used across the simulator: vectors, quaternions,
//! the variable-size matrices used by the constraint solver, and
//! axis-aligned bounding boxes.
//!
//! Everything is built on top of `nalgebra` rather than hand-rolled,
//! matching the rest of the workspace's preference for reusing
//! well-tested linear algebra crates instead of re-deriving them.

mod bounds;
mod quat;

pub use bounds::Bounds;
pub use quat::{quat_left_matrix, quat_right_matrix};

/// The floating point type used throughout the physics pipeline.
///
/// A single type alias makes it trivial to switch the whole simulator
/// between `f32` and `f64` precision.
pub type Fph = f64;

pub type Vec3 = nalgebra::Vector3<Fph>;
pub type Vec4 = nalgebra::Vector4<Fph>;
pub type Point3 = nalgebra::Point3<Fph>;
pub type Mat3 = nalgebra::Matrix3<Fph>;
pub type Mat4 = nalgebra::Matrix4<Fph>;
pub type Quat = nalgebra::Quaternion<Fph>;
pub type UnitQuat = nalgebra::UnitQuaternion<Fph>;
pub type Isometry = nalgebra::Isometry3<Fph>;

/// A vector of runtime-determined length, used for constraint Jacobian
/// rows, cached Lagrange multipliers and velocity stacks.
pub type VecN = nalgebra::DVector<Fph>;

/// A matrix of runtime-determined shape, used for constraint Jacobians
/// and the systems handed to the Gauss-Seidel solver.
pub type MatMN = nalgebra::DMatrix<Fph>;

/// Builds the 12-dimensional velocity/impulse stack `[vA; wA; vB; wB]`
/// used by every constraint's Jacobian.
pub fn pack_velocities(linear_a: &Vec3, angular_a: &Vec3, linear_b: &Vec3, angular_b: &Vec3) -> VecN {
    let mut v = VecN::zeros(12);
    v.fixed_rows_mut::<3>(0).copy_from(linear_a);
    v.fixed_rows_mut::<3>(3).copy_from(angular_a);
    v.fixed_rows_mut::<3>(6).copy_from(linear_b);
    v.fixed_rows_mut::<3>(9).copy_from(angular_b);
    v
}

/// Splits a 12-dimensional stack back into its four 3-vectors, in the
/// same `[vA; wA; vB; wB]` order used by [`pack_velocities`].
pub fn unpack_velocities(v: &VecN) -> (Vec3, Vec3, Vec3, Vec3) {
    (
        Vec3::new(v[0], v[1], v[2]),
        Vec3::new(v[3], v[4], v[5]),
        Vec3::new(v[6], v[7], v[8]),
        Vec3::new(v[9], v[10], v[11]),
    )
}
