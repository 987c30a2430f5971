//! Contact manifolds: up to four persistent contact points per body
//! pair, each backed by a [`Penetration`] constraint so friction and
//! normal impulses warm-start across steps instead of popping every
//! frame the narrow phase re-detects the same contact (§4.9).

use crate::constraint::penetration::Penetration;
use crate::material::Material;
use rb_geometry::body::BodyId;
use rb_geometry::contact::Contact;
use rb_math::{Fph, Vec3};

/// Contacts closer together than this (squared, tangential distance)
/// are treated as duplicates rather than added as a new point.
const DUPLICATE_DISTANCE_SQUARED: Fph = 0.02 * 0.02;
/// A cached contact expires once it has drifted apart by more than
/// this tangentially...
const EXPIRE_TANGENTIAL_SQUARED: Fph = 0.02 * 0.02;
const MAX_CONTACTS: usize = 4;

#[derive(Debug)]
pub struct ManifoldContact {
    pub local_point_a: Vec3,
    pub local_point_b: Vec3,
    /// The contact normal, cached in bodyA's local frame so it can be
    /// rotated back to world space as bodyA reorients.
    pub local_normal_a: Vec3,
    pub penetration: Penetration,
}

#[derive(Debug)]
pub struct Manifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    contacts: Vec<ManifoldContact>,
}

impl Manifold {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self { body_a, body_b, contacts: Vec::with_capacity(MAX_CONTACTS) }
    }

    pub fn contacts(&self) -> &[ManifoldContact] {
        &self.contacts
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn penetrations_mut(&mut self) -> impl Iterator<Item = &mut Penetration> {
        self.contacts.iter_mut().map(|c| &mut c.penetration)
    }

    /// Adds a newly-detected contact, deduplicating against existing
    /// points and, once at capacity, replacing whichever existing
    /// point is farthest from the average of all candidate points.
    pub fn add_contact(&mut self, contact: &Contact, bodies_orientation_a: rb_math::UnitQuat, material: Material) {
        // Orient the contact so body_a/body_b match the manifold's
        // stored order.
        let contact = if contact.body_a == self.body_a { *contact } else { contact.swapped() };

        for existing in &self.contacts {
            let tangential = (existing.local_point_a - contact.local_point_a)
                - existing.local_normal_a * existing.local_normal_a.dot(&(existing.local_point_a - contact.local_point_a));
            if tangential.norm_squared() < DUPLICATE_DISTANCE_SQUARED {
                return;
            }
        }

        let local_normal_a = bodies_orientation_a.inverse() * contact.normal;
        let penetration = Penetration::new(
            self.body_a,
            self.body_b,
            contact.local_point_a,
            contact.local_point_b,
            contact.normal,
            material.friction,
        );
        let new_contact = ManifoldContact {
            local_point_a: contact.local_point_a,
            local_point_b: contact.local_point_b,
            local_normal_a,
            penetration,
        };

        if self.contacts.len() < MAX_CONTACTS {
            self.contacts.push(new_contact);
            return;
        }

        let mut candidate_points: Vec<Vec3> = self.contacts.iter().map(|c| c.local_point_a).collect();
        candidate_points.push(new_contact.local_point_a);
        let average = candidate_points.iter().fold(Vec3::zeros(), |acc, p| acc + p) / candidate_points.len() as Fph;

        let farthest_index = self
            .contacts
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (c.local_point_a - average).norm_squared()))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(i, _)| i);

        let new_distance = (new_contact.local_point_a - average).norm_squared();
        if let Some(index) = farthest_index {
            if self.contacts[index].local_point_a != average && (self.contacts[index].local_point_a - average).norm_squared() > new_distance {
                self.contacts[index] = new_contact;
            }
        }
    }

    /// Drops cached contacts whose bodies have since moved apart: the
    /// world point is recomputed from each body's current pose, the
    /// cached normal (rotated from bodyA's local frame into world
    /// space) is used to split the separation into normal and
    /// tangential components, and the point is removed once the
    /// tangential drift exceeds the threshold and the pair is no
    /// longer penetrating.
    pub fn remove_expired_contacts(&mut self, orientation_a: rb_math::UnitQuat, world_from_body_a: impl Fn(Vec3) -> Vec3, world_from_body_b: impl Fn(Vec3) -> Vec3) {
        let mut keep = Vec::with_capacity(self.contacts.len());
        for contact in self.contacts.drain(..) {
            let world_a = world_from_body_a(contact.local_point_a);
            let world_b = world_from_body_b(contact.local_point_b);
            let normal = orientation_a * contact.local_normal_a;
            let delta = world_a - world_b;
            let parallel = delta.dot(&normal);
            let perpendicular = delta - normal * parallel;

            if perpendicular.norm_squared() >= EXPIRE_TANGENTIAL_SQUARED && parallel >= 0.0 {
                continue;
            }
            keep.push(contact);
        }
        self.contacts = keep;
    }
}

/// Owns every active manifold, keyed by an unordered body pair.
#[derive(Debug, Default)]
pub struct ManifoldCollector {
    manifolds: std::collections::HashMap<(BodyId, BodyId), Manifold>,
}

fn pair_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a.0 <= b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

impl ManifoldCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, a: BodyId, b: BodyId) -> &mut Manifold {
        self.manifolds.entry(pair_key(a, b)).or_insert_with(|| Manifold::new(a, b))
    }

    pub fn manifolds_mut(&mut self) -> impl Iterator<Item = &mut Manifold> {
        self.manifolds.values_mut()
    }

    pub fn manifolds(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.values()
    }

    pub fn retain_non_empty(&mut self) {
        self.manifolds.retain(|_, m| !m.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_geometry::body::BodyId;
    use rb_math::UnitQuat;

    fn sample_contact(x: Fph) -> Contact {
        Contact {
            body_a: BodyId(0),
            body_b: BodyId(1),
            world_point_a: Vec3::new(x, 0.0, 0.0),
            world_point_b: Vec3::new(x, -0.1, 0.0),
            local_point_a: Vec3::new(x, 0.0, 0.0),
            local_point_b: Vec3::new(x, -0.1, 0.0),
            normal: Vec3::new(0.0, 1.0, 0.0),
            separation: -0.1,
            time_of_impact: 0.0,
        }
    }

    #[test]
    fn duplicate_nearby_contacts_are_not_added_twice() {
        let mut manifold = Manifold::new(BodyId(0), BodyId(1));
        manifold.add_contact(&sample_contact(0.0), UnitQuat::identity(), Material::new(0.5, 0.5));
        manifold.add_contact(&sample_contact(0.001), UnitQuat::identity(), Material::new(0.5, 0.5));
        assert_eq!(manifold.contacts().len(), 1);
    }

    #[test]
    fn manifold_caps_at_four_contacts() {
        let mut manifold = Manifold::new(BodyId(0), BodyId(1));
        for i in 0..8 {
            manifold.add_contact(&sample_contact(i as Fph), UnitQuat::identity(), Material::new(0.5, 0.5));
        }
        assert!(manifold.contacts().len() <= 4);
    }
}
