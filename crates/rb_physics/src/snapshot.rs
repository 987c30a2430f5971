//! Frame-history ring buffer for UI scrubbing (§6). A grow-then-evict
//! buffer over a `VecDeque`: it starts empty and fills up to
//! [`SnapshotHistory::CAPACITY`] entries, after which appending drops
//! the oldest one. This is a different growth shape than the host
//! codebase's `FixedQueue` (which is always pre-initialized to a fixed
//! size); see DESIGN.md for why that container wasn't reused as-is.

use rb_geometry::body::BodyId;
use rb_math::{UnitQuat, Vec3};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub position: Vec3,
    pub orientation: UnitQuat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub bodies: Vec<BodySnapshot>,
}

#[derive(Debug, Default)]
pub struct SnapshotHistory {
    frames: VecDeque<Frame>,
}

impl SnapshotHistory {
    pub const CAPACITY: usize = 120;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() >= Self::CAPACITY {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Captures every body's pose and velocities into a [`Frame`].
pub fn capture(bodies: &crate::store::BodyStore) -> Frame {
    Frame {
        bodies: bodies
            .iter()
            .map(|b| BodySnapshot {
                id: b.id,
                position: b.position,
                orientation: b.orientation,
                linear_velocity: b.linear_velocity,
                angular_velocity: b.angular_velocity,
            })
            .collect(),
    }
}

/// Writes a captured frame's state back onto the live bodies.
pub fn restore(bodies: &mut crate::store::BodyStore, frame: &Frame) {
    for snapshot in &frame.bodies {
        if let Some(body) = bodies.get_mut(snapshot.id) {
            body.position = snapshot.position;
            body.orientation = snapshot.orientation;
            body.linear_velocity = snapshot.linear_velocity;
            body.angular_velocity = snapshot.angular_velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_evicts_oldest_once_at_capacity() {
        let mut history = SnapshotHistory::new();
        for _ in 0..(SnapshotHistory::CAPACITY + 10) {
            history.push(Frame::default());
        }
        assert_eq!(history.len(), SnapshotHistory::CAPACITY);
    }

    #[test]
    fn capture_restore_round_trips_pose() {
        let mut store = crate::store::BodyStore::new();
        store.insert(rb_geometry::body::Body::new(
            BodyId(0),
            rb_geometry::shape::Shape::Sphere(rb_geometry::shape::sphere::Sphere::new(0.5)),
            Vec3::new(1.0, 2.0, 3.0),
            UnitQuat::identity(),
            1.0,
            0.5,
            0.5,
        ));
        let frame = capture(&store);
        store.get_mut(BodyId(0)).unwrap().position = Vec3::zeros();
        restore(&mut store, &frame);
        assert_eq!(store.get(BodyId(0)).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
    }
}
