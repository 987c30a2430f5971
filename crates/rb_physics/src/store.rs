//! A body container addressed by stable [`BodyId`], modeling the
//! "bodies live in an indexable container owned by the world" design
//! note (§9): constraints and manifolds hold ids, not borrows, and
//! resolve them through this store on demand.
//!
//! This is a simplified, non-generic stand-in for the teacher's
//! `KeyIndexMapper` (see DESIGN.md): a plain `HashMap` plus a `Vec`
//! rather than a container generic over an allocator and hasher,
//! since nothing here runs in a no-allocator context.

use rb_geometry::body::{Body, BodyId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BodyStore {
    bodies: Vec<Body>,
    index_of: HashMap<BodyId, usize>,
}

impl BodyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: Body) -> BodyId {
        let id = body.id;
        let idx = self.bodies.len();
        self.bodies.push(body);
        self.index_of.insert(id, idx);
        id
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of.contains_key(&id)
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index_of.get(&id).map(|&idx| &self.bodies[idx])
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.index_of.get(&id).map(|&idx| &mut self.bodies[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.iter_mut()
    }

    pub fn as_slice(&self) -> &[Body] {
        &self.bodies
    }

    /// Mutable access to both bodies of a pair at once. Panics if
    /// either id is unknown or the two ids are equal (a constraint
    /// referencing one body twice must special-case itself, as
    /// `ConstraintMoverSimple` does).
    pub fn pair_mut(&mut self, a: BodyId, b: BodyId) -> (&mut Body, &mut Body) {
        let ia = *self.index_of.get(&a).expect("unknown body id");
        let ib = *self.index_of.get(&b).expect("unknown body id");
        assert_ne!(ia, ib, "pair_mut requires two distinct bodies");
        if ia < ib {
            let (left, right) = self.bodies.split_at_mut(ib);
            (&mut left[ia], &mut right[0])
        } else {
            let (left, right) = self.bodies.split_at_mut(ia);
            (&mut right[0], &mut left[ib])
        }
    }
}
