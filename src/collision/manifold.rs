use crate::math::vec2::Vec2;

/// Maximum number of contacts in one manifold.
pub const MAX_CONTACTS: usize = 2;

/// Identifies the geometric feature that produced a contact, so the same contact can be
/// recognized on the next step and warm started.
///
/// * circle vs circle: `0`
/// * circle vs polygon: the polygon edge index, or `VERTEX_FLAG | vertex` for a vertex region
/// * polygon vs polygon: packed reference edge, incident edge, incident vertex, clip marker
///   and a flip bit (see `collision::detection`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContactId(pub u32);

impl ContactId {
    pub const VERTEX_FLAG: u32 = 0x100;
}

/// Per-contact solver state. The accumulated scalars survive across steps through the
/// world's contact cache; the masses and bias are recomputed every step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImpulseCache {
    /// Inverse of the effective mass along the normal.
    pub normal_mass: f64,
    /// Inverse of the effective mass along the tangent.
    pub tangent_mass: f64,
    /// Accumulated normal impulse, never negative.
    pub normal_scalar: f64,
    /// Accumulated friction impulse, within the friction cone.
    pub tangent_scalar: f64,
    /// Restitution target velocity captured before the solver iterates.
    pub velocity_bias: f64,
}

/// A single contact point of a manifold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contact {
    /// World-space contact point.
    pub point: Vec2,
    /// Penetration depth, positive when overlapping.
    pub depth: f64,
    pub id: ContactId,
    pub cache: ImpulseCache,
}

/// Stores information about a collision between two bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Index of the first body involved in the collision.
    pub body_a: usize,
    /// Index of the second body involved in the collision.
    pub body_b: usize,
    /// The collision normal, pointing from body A towards body B.
    pub normal: Vec2,
    pub friction: f64,
    pub restitution: f64,
    contacts: [Contact; MAX_CONTACTS],
    count: usize,
    /// Cleared by a pre-solve handler to skip resolving this collision for the step.
    pub enabled: bool,
}

impl Collision {
    pub fn new(body_a: usize, body_b: usize) -> Self {
        Collision {
            body_a,
            body_b,
            normal: Vec2::ZERO,
            friction: 0.0,
            restitution: 0.0,
            contacts: [Contact::default(); MAX_CONTACTS],
            count: 0,
            enabled: true,
        }
    }

    /// Forgets the contacts and the normal. Body indices are kept.
    pub fn reset(&mut self) {
        self.normal = Vec2::ZERO;
        self.friction = 0.0;
        self.restitution = 0.0;
        self.contacts = [Contact::default(); MAX_CONTACTS];
        self.count = 0;
        self.enabled = true;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts[..self.count]
    }

    pub fn contacts_mut(&mut self) -> &mut [Contact] {
        &mut self.contacts[..self.count]
    }

    /// Appends a contact with a fresh solver cache. Extra contacts beyond
    /// [`MAX_CONTACTS`] are dropped.
    pub fn push_contact(&mut self, point: Vec2, depth: f64, id: ContactId) {
        if self.count < MAX_CONTACTS {
            self.contacts[self.count] = Contact {
                point,
                depth,
                id,
                cache: ImpulseCache::default(),
            };
            self.count += 1;
        }
    }
}
