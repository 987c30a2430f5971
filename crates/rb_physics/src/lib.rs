//! Constraint solving, contact manifolds and world stepping.
//!
//! Builds on `rb_geometry` (shapes, bodies, narrow/broad phase) to
//! provide the constraint library, manifold collector, LCP solver and
//! the `World` that orchestrates one simulation step end to end.

pub mod constraint;
pub mod lcp;
pub mod manifold;
pub mod material;
pub mod scene;
pub mod snapshot;
pub mod store;
pub mod world;

pub use rb_math::Fph;
