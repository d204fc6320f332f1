use std::collections::HashMap;

use crate::collision::manifold::{Collision, ContactId, MAX_CONTACTS};
use crate::objects::rigid_body::BodyId;

#[derive(Debug, Clone, Copy, Default)]
struct CachedImpulse {
    id: ContactId,
    normal_scalar: f64,
    tangent_scalar: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct CachedManifold {
    contacts: [CachedImpulse; MAX_CONTACTS],
    count: usize,
}

/// Accumulated contact impulses of the previous step, keyed by the ordered body pair.
///
/// A contact of a new manifold inherits impulses only from a cached contact of the same
/// pair with the same [`ContactId`]; everything else starts from zero.
#[derive(Debug, Default)]
pub struct ContactCache {
    entries: HashMap<(BodyId, BodyId), CachedManifold>,
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copies cached impulses into the matching contacts of `collision`.
    /// Returns how many contacts were warm started.
    pub fn restore(&self, key: (BodyId, BodyId), collision: &mut Collision) -> usize {
        let cached = match self.entries.get(&key) {
            Some(cached) => cached,
            None => return 0,
        };

        let mut restored = 0;
        for contact in collision.contacts_mut() {
            if let Some(old) = cached.contacts[..cached.count].iter().find(|c| c.id == contact.id) {
                contact.cache.normal_scalar = old.normal_scalar;
                contact.cache.tangent_scalar = old.tangent_scalar;
                restored += 1;
            }
        }
        restored
    }

    /// Replaces the cache with the impulses of this step's collisions.
    pub fn rebuild<'a, I>(&mut self, collisions: I)
    where
        I: IntoIterator<Item = ((BodyId, BodyId), &'a Collision)>,
    {
        self.entries.clear();
        for (key, collision) in collisions {
            let mut cached = CachedManifold::default();
            for (slot, contact) in cached.contacts.iter_mut().zip(collision.contacts()) {
                *slot = CachedImpulse {
                    id: contact.id,
                    normal_scalar: contact.cache.normal_scalar,
                    tangent_scalar: contact.cache.tangent_scalar,
                };
            }
            cached.count = collision.count();
            self.entries.insert(key, cached);
        }
    }

    /// Forgets every entry involving `id`.
    pub fn remove_body(&mut self, id: BodyId) {
        self.entries.retain(|(a, b), _| *a != id && *b != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2::Vec2;

    fn manifold(ids: &[u32], normal_scalar: f64) -> Collision {
        let mut collision = Collision::new(0, 1);
        for &id in ids {
            collision.push_contact(Vec2::ZERO, 0.1, ContactId(id));
        }
        for contact in collision.contacts_mut() {
            contact.cache.normal_scalar = normal_scalar;
            contact.cache.tangent_scalar = -normal_scalar;
        }
        collision
    }

    #[test]
    fn test_restore_matches_by_feature() {
        let key = (BodyId(1), BodyId(2));
        let mut cache = ContactCache::new();
        let previous = manifold(&[5, 9], 1.5);
        cache.rebuild(std::iter::once((key, &previous)));
        assert_eq!(cache.len(), 1);

        let mut next = manifold(&[9, 4], 0.0);
        assert_eq!(cache.restore(key, &mut next), 1);
        assert_eq!(next.contacts()[0].cache.normal_scalar, 1.5);
        assert_eq!(next.contacts()[0].cache.tangent_scalar, -1.5);
        assert_eq!(next.contacts()[1].cache.normal_scalar, 0.0);
    }

    #[test]
    fn test_restore_requires_same_pair() {
        let mut cache = ContactCache::new();
        let previous = manifold(&[0], 2.0);
        cache.rebuild(std::iter::once(((BodyId(1), BodyId(2)), &previous)));

        let mut next = manifold(&[0], 0.0);
        assert_eq!(cache.restore((BodyId(2), BodyId(1)), &mut next), 0);
        assert_eq!(next.contacts()[0].cache.normal_scalar, 0.0);
    }

    #[test]
    fn test_rebuild_drops_stale_pairs_and_remove_body() {
        let mut cache = ContactCache::new();
        let collision = manifold(&[0], 1.0);
        cache.rebuild(vec![
            ((BodyId(1), BodyId(2)), &collision),
            ((BodyId(2), BodyId(3)), &collision),
        ]);
        assert_eq!(cache.len(), 2);

        cache.remove_body(BodyId(3));
        assert_eq!(cache.len(), 1);

        cache.rebuild(std::iter::empty());
        assert!(cache.is_empty());
    }
}
