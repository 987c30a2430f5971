//! Shapes, convex-hull construction, support-based collision queries
//! (GJK/EPA), contact records and the sweep-and-prune broad phase.
//!
//! This crate knows nothing about constraint solving; it answers
//! "do these two shapes touch, and where" questions. `rb_physics`
//! consumes its contact records and body store to run the solver.

pub mod body;
pub mod broadphase;
pub mod contact;
pub mod epa;
pub mod gjk;
pub mod intersection;
pub mod shape;

pub use rb_math::Fph;
