//! The contact record produced by the intersection layer and consumed
//! by the manifold collector / TOI replay in `rb_physics`.

use crate::body::BodyId;
use rb_math::{Fph, Vec3};

/// A single point of contact between two bodies, as produced by the
/// narrow phase (§4.6).
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub world_point_a: Vec3,
    pub world_point_b: Vec3,
    pub local_point_a: Vec3,
    pub local_point_b: Vec3,
    /// Unit normal pointing from B toward A; applying a positive
    /// impulse along it to A separates the pair.
    pub normal: Vec3,
    /// Negative when interpenetrating.
    pub separation: Fph,
    /// Time of impact within the step, in `[0, dt]`.
    pub time_of_impact: Fph,
}

impl Contact {
    /// Swaps the two sides of the contact, used by the manifold when
    /// it needs to preserve a stored (A, B) order.
    pub fn swapped(&self) -> Self {
        Self {
            body_a: self.body_b,
            body_b: self.body_a,
            world_point_a: self.world_point_b,
            world_point_b: self.world_point_a,
            local_point_a: self.local_point_b,
            local_point_b: self.local_point_a,
            normal: -self.normal,
            separation: self.separation,
            time_of_impact: self.time_of_impact,
        }
    }
}
