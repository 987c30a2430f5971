//! The shared constraint contract and the 12-dimensional Jacobian
//! machinery every concrete constraint builds its rows against.
//!
//! A constraint's row is always laid out over the stacked velocity
//! vector `[linA; angA; linB; angB]` (§4.8); these helpers build that
//! stack, the corresponding block-diagonal inverse mass matrix, and
//! turn a solved impulse row back into per-body impulses.

pub mod constant_velocity;
pub mod distance;
pub mod hinge;
pub mod mover;
pub mod orientation;
pub mod penetration;
pub mod spinner;

use crate::store::BodyStore;
use rb_geometry::body::{Body, BodyId};
use rb_math::{Fph, MatMN, VecN};

/// Builds the block-diagonal 12x12 inverse mass matrix
/// `diag(invMassA*I3, invInertiaA, invMassB*I3, invInertiaB)`.
pub fn inverse_mass_matrix(a: &Body, b: &Body) -> MatMN {
    let mut m = MatMN::zeros(12, 12);
    for i in 0..3 {
        m[(i, i)] = a.inverse_mass;
        m[(6 + i, 6 + i)] = b.inverse_mass;
    }
    let ia = a.inverse_inertia_tensor_world();
    let ib = b.inverse_inertia_tensor_world();
    for r in 0..3 {
        for c in 0..3 {
            m[(3 + r, 3 + c)] = ia[(r, c)];
            m[(9 + r, 9 + c)] = ib[(r, c)];
        }
    }
    m
}

/// Stacks the current velocities of both bodies into the 12-vector a
/// Jacobian row is dotted against.
pub fn velocities(a: &Body, b: &Body) -> VecN {
    rb_math::pack_velocities(&a.linear_velocity, &a.angular_velocity, &b.linear_velocity, &b.angular_velocity)
}

/// Splits a 12-vector of impulses back into per-body linear/angular
/// impulses and applies them.
pub fn apply_impulses(a: &mut Body, b: &mut Body, impulses: &VecN) {
    let (lin_a, ang_a, lin_b, ang_b) = rb_math::unpack_velocities(impulses);
    if !a.is_static() {
        a.linear_velocity += lin_a * a.inverse_mass;
        a.angular_velocity += a.inverse_inertia_tensor_world() * ang_a;
    }
    if !b.is_static() {
        b.linear_velocity += lin_b * b.inverse_mass;
        b.angular_velocity += b.inverse_inertia_tensor_world() * ang_b;
    }
}

/// Solves `(J Minv J^T) dlambda = -(J v) - bias` for the impulse-space
/// delta, clamps the updated total against `clamp`, and applies the
/// resulting velocity change to both bodies. Used by every warm-started
/// constraint (distance, constant-velocity, hinge, orientation); the
/// penetration constraint and the spinner have their own variants
/// (inline row coupling and no warm-start, respectively).
#[allow(clippy::too_many_arguments)]
pub fn solve_rows(
    jacobian: &MatMN,
    cached_lambda: &mut VecN,
    a: &mut Body,
    b: &mut Body,
    bias: &VecN,
    clamp: impl Fn(usize, Fph) -> Fph,
) {
    let inv_mass = inverse_mass_matrix(a, b);
    let v = velocities(a, b);
    let effective_mass = jacobian * &inv_mass * jacobian.transpose();
    let rhs = -(jacobian * &v) - bias;

    let delta_lambda = effective_mass
        .clone()
        .lu()
        .solve(&rhs)
        .unwrap_or_else(|| VecN::zeros(rhs.len()));

    let old_lambda = cached_lambda.clone();
    let mut new_lambda = &old_lambda + &delta_lambda;
    for i in 0..new_lambda.len() {
        new_lambda[i] = clamp(i, new_lambda[i]);
    }
    let applied_delta = &new_lambda - &old_lambda;
    *cached_lambda = new_lambda;

    let impulses = jacobian.transpose() * applied_delta;
    apply_impulses(a, b, &impulses);
}

/// Applies the constraint's cached Lagrange multipliers from the
/// previous step as an impulse before any new solving happens, so the
/// solver starts near the steady-state solution rather than from rest.
pub fn warm_start(jacobian: &MatMN, cached_lambda: &VecN, a: &mut Body, b: &mut Body) {
    if cached_lambda.iter().all(|&x| x == 0.0) {
        return;
    }
    let impulses = jacobian.transpose() * cached_lambda;
    apply_impulses(a, b, &impulses);
}

/// Shared behavior every concrete constraint implements. `pre_solve`
/// rebuilds the Jacobian for the bodies' current pose and warm-starts;
/// `solve` runs one pass of the velocity solve (called once per PGS
/// sweep by the world); `post_solve` runs after all sweeps, used by
/// constraints that need to clean up cached state (the
/// constant-velocity limit's multiplier reset).
pub trait Constraint: std::fmt::Debug {
    fn body_a(&self) -> BodyId;
    fn body_b(&self) -> BodyId;
    fn pre_solve(&mut self, bodies: &mut BodyStore, dt: Fph);
    fn solve(&mut self, bodies: &mut BodyStore);
    fn post_solve(&mut self) {}
    /// Zeroes any cached Lagrange multipliers so the next `pre_solve`
    /// starts cold. Part of the public restart path (§9): callers that
    /// reload a scene or otherwise want a clean start call this instead
    /// of rebuilding every constraint from scratch.
    fn reset_warm_start(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::shape::sphere::Sphere;
    use rb_geometry::shape::Shape;
    use rb_math::{UnitQuat, Vec3};

    fn body(id: u32, inverse_mass: Fph) -> Body {
        Body::new(
            BodyId(id),
            Shape::Sphere(Sphere::new(0.5)),
            Vec3::zeros(),
            UnitQuat::identity(),
            inverse_mass,
            0.5,
            0.5,
        )
    }

    #[test]
    fn static_body_block_is_zero() {
        let a = body(0, 0.0);
        let b = body(1, 1.0);
        let m = inverse_mass_matrix(&a, &b);
        for i in 0..6 {
            assert_eq!(m[(i, i)], 0.0);
        }
        assert_eq!(m[(6, 6)], 1.0);
    }

    #[test]
    fn apply_impulses_round_trips_through_velocities() {
        let mut a = body(0, 1.0);
        let mut b = body(1, 1.0);
        let impulses = rb_math::pack_velocities(
            &Vec3::new(1.0, 0.0, 0.0),
            &Vec3::zeros(),
            &Vec3::new(-1.0, 0.0, 0.0),
            &Vec3::zeros(),
        );
        apply_impulses(&mut a, &mut b, &impulses);
        assert_eq!(a.linear_velocity, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(b.linear_velocity, Vec3::new(-1.0, 0.0, 0.0));
    }
}
