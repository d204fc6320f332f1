use std::fmt;

use tracing::{debug, trace};

use crate::{
    collision::{compute_collision, Collision, Ray, RaycastHit, SpatialHash, AABB},
    constraints::{body_pair_mut, ContactSolver},
    integration::{integrate_position, integrate_velocity},
    math::vec2::Vec2,
    objects::rigid_body::{BodyId, RigidBody},
};

use super::config::WorldConfig;
use super::contact_cache::ContactCache;

/// Called for every detected collision before the solver runs. Clearing
/// `Collision::enabled` skips the collision for this step.
pub type PreSolveFn = Box<dyn FnMut(&mut Collision, &mut RigidBody, &mut RigidBody)>;

/// Called for every solved collision after positions were integrated.
pub type PostSolveFn = Box<dyn FnMut(&Collision, &mut RigidBody, &mut RigidBody)>;

/// Optional callbacks run synchronously inside [`PhysicsWorld::simulate`].
///
/// Callbacks receive the two bodies of the collision and may change their state. They
/// have no access to the world, so bodies cannot be added or removed while stepping.
#[derive(Default)]
pub struct CollisionHandler {
    pub pre_solve: Option<PreSolveFn>,
    pub post_solve: Option<PostSolveFn>,
}

impl fmt::Debug for CollisionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionHandler")
            .field("pre_solve", &self.pre_solve.is_some())
            .field("post_solve", &self.post_solve.is_some())
            .finish()
    }
}

/// Owns the bodies and drives the simulation pipeline.
#[derive(Debug)]
pub struct PhysicsWorld {
    gravity: Vec2,
    bounds: AABB,
    config: WorldConfig,
    solver: ContactSolver,

    bodies: Vec<RigidBody>,
    // Parallel to `bodies`; strictly increasing because ids are never reused.
    ids: Vec<BodyId>,
    next_id: u64,

    hash: SpatialHash,
    // Collisions solved during the last step
    collisions: Vec<Collision>,
    contact_cache: ContactCache,
    handler: CollisionHandler,
    accumulator: f64,
}

impl PhysicsWorld {
    /// Creates a new, empty physics world with default tunables.
    pub fn new(gravity: Vec2, bounds: AABB) -> Self {
        Self::with_config(gravity, bounds, WorldConfig::default())
    }

    pub fn with_config(gravity: Vec2, bounds: AABB, config: WorldConfig) -> Self {
        debug!(?gravity, ?bounds, cell_size = config.cell_size, "creating physics world");
        Self {
            gravity,
            bounds,
            config,
            solver: config.solver(),
            bodies: Vec::new(),
            ids: Vec::new(),
            next_id: 0,
            hash: SpatialHash::new(bounds, config.cell_size),
            collisions: Vec::new(),
            contact_cache: ContactCache::new(),
            handler: CollisionHandler::default(),
            accumulator: 0.0,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Installs the pre-solve/post-solve callbacks, replacing the previous ones.
    pub fn set_collision_handler(&mut self, handler: CollisionHandler) {
        self.handler = handler;
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        trace!(id = id.raw(), body_type = ?body.body_type(), "adding body");
        self.bodies.push(body);
        self.ids.push(id);
        id
    }

    /// Removes a body and returns it. The relative order of the remaining bodies is kept.
    pub fn remove_body(&mut self, id: BodyId) -> Option<RigidBody> {
        let index = self.index_of(id)?;
        trace!(id = id.raw(), index, "removing body");
        self.ids.remove(index);
        self.contact_cache.remove_body(id);
        self.collisions.clear();
        Some(self.bodies.remove(index))
    }

    /// Removes every body and forgets cached contacts.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.ids.clear();
        self.hash.clear();
        self.collisions.clear();
        self.contact_cache.clear();
        self.accumulator = 0.0;
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Bodies in insertion order. Indices are only stable until the next removal.
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn body(&self, index: usize) -> Option<&RigidBody> {
        self.bodies.get(index)
    }

    pub fn body_mut(&mut self, index: usize) -> Option<&mut RigidBody> {
        self.bodies.get_mut(index)
    }

    pub fn body_id(&self, index: usize) -> Option<BodyId> {
        self.ids.get(index).copied()
    }

    pub fn index_of(&self, id: BodyId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.index_of(id).map(|index| &self.bodies[index])
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let index = self.index_of(id)?;
        self.bodies.get_mut(index)
    }

    /// Collisions that were solved during the last step.
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Returns true if the body's AABB overlaps the world bounds. The world never removes
    /// bodies on its own.
    pub fn is_in_bounds(&self, body: &RigidBody) -> bool {
        self.bounds.overlaps(&body.aabb())
    }

    fn rebuild_hash(&mut self) {
        self.hash.clear();
        for (index, body) in self.bodies.iter().enumerate() {
            self.hash.insert(index, &body.aabb());
        }
    }

    /// Bodies whose AABB overlaps `region`, in insertion order.
    pub fn query_aabb(&mut self, region: &AABB) -> Vec<BodyId> {
        self.rebuild_hash();
        self.hash
            .query(region)
            .into_iter()
            .filter(|&index| self.bodies[index].aabb().overlaps(region))
            .map(|index| self.ids[index])
            .collect()
    }

    /// Every body hit by `ray`, nearest first.
    pub fn raycast(&self, ray: &Ray) -> Vec<(BodyId, RaycastHit)> {
        let mut hits: Vec<(BodyId, RaycastHit)> = self
            .bodies
            .iter()
            .zip(&self.ids)
            .filter_map(|(body, id)| body.raycast(ray).map(|hit| (*id, hit)))
            .collect();
        hits.sort_by(|a, b| a.1.distance.total_cmp(&b.1.distance));
        hits
    }

    /// Advances the world by `frame_time` in steps of `WorldConfig::fixed_dt`, carrying
    /// the remainder over to the next call. Returns the number of steps taken.
    pub fn update(&mut self, frame_time: f64) -> u32 {
        let fixed_dt = self.config.fixed_dt;
        if fixed_dt <= 0.0 {
            return 0;
        }

        self.accumulator += frame_time.max(0.0);
        let mut steps = 0;
        while self.accumulator >= fixed_dt && steps < self.config.max_substeps {
            self.simulate(fixed_dt);
            self.accumulator -= fixed_dt;
            steps += 1;
        }

        if self.accumulator >= fixed_dt {
            debug!(dropped = self.accumulator, steps, "simulation falling behind, dropping time");
            self.accumulator = 0.0;
        }
        steps
    }

    /// Advances the simulation by one time step `dt`.
    ///
    /// Broad phase, narrow phase with the pre-solve callback, velocity integration, warm
    /// starting, `solver_iterations` resolve passes, position integration, the post-solve
    /// callback and finally clearing of accumulated forces.
    pub fn simulate(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let inverse_dt = 1.0 / dt;

        // 1. Broad phase
        self.rebuild_hash();
        let bodies = &self.bodies;
        let pairs = self
            .hash
            .potential_pairs(|a, b| bodies[a].is_static() && bodies[b].is_static());

        // 2. Narrow phase
        self.collisions.clear();
        let mut vetoed = 0;
        for (a, b) in pairs.iter().copied() {
            let mut collision = Collision::new(a, b);
            if !compute_collision(&self.bodies[a], &self.bodies[b], &mut collision) {
                continue;
            }
            self.contact_cache.restore((self.ids[a], self.ids[b]), &mut collision);

            if let Some(pre_solve) = self.handler.pre_solve.as_mut() {
                if let Some((body_a, body_b)) = body_pair_mut(&mut self.bodies, a, b) {
                    pre_solve(&mut collision, body_a, body_b);
                }
            }

            if collision.enabled {
                self.collisions.push(collision);
            } else {
                vetoed += 1;
            }
        }
        trace!(
            pairs = pairs.len(),
            collisions = self.collisions.len(),
            vetoed,
            "narrow phase done"
        );

        // 3. Integrate velocities
        for body in self.bodies.iter_mut() {
            body.apply_gravity(self.gravity);
            integrate_velocity(body, dt);
        }

        // 4. Warm start
        for collision in self.collisions.iter_mut() {
            let pair = body_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
            if let Some((a, b)) = pair {
                self.solver.warm_start(a, b, collision);
            }
        }

        // 5. Resolve
        for _ in 0..self.config.solver_iterations {
            for collision in self.collisions.iter_mut() {
                let pair = body_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
                if let Some((a, b)) = pair {
                    self.solver.resolve(a, b, collision, inverse_dt);
                }
            }
        }

        // 6. Integrate positions
        for body in self.bodies.iter_mut() {
            integrate_position(body, dt);
        }

        // 7. Post-solve callback
        if let Some(post_solve) = self.handler.post_solve.as_mut() {
            for collision in self.collisions.iter() {
                let pair = body_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
                if let Some((a, b)) = pair {
                    post_solve(collision, a, b);
                }
            }
        }

        // 8. Clear forces
        for body in self.bodies.iter_mut() {
            body.clear_forces();
        }

        let ids = &self.ids;
        self.contact_cache
            .rebuild(self.collisions.iter().map(|c| ((ids[c.body_a], ids[c.body_b]), c)));
    }
}
