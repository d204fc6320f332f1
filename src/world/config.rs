use crate::constraints::ContactSolver;

/// Tunables of a [`PhysicsWorld`](super::PhysicsWorld). Gravity and bounds are passed to the
/// world constructor directly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    /// Velocity iterations per step.
    pub solver_iterations: usize,
    /// Fraction of the remaining penetration corrected per step.
    pub baumgarte_factor: f64,
    /// Penetration tolerated without positional correction.
    pub baumgarte_slop: f64,
    /// Approach speed below which contacts do not bounce. Zero keeps every bounce.
    pub restitution_threshold: f64,
    /// Edge length of a spatial hash cell.
    pub cell_size: f64,
    /// Time step used by `PhysicsWorld::update`.
    pub fixed_dt: f64,
    /// Most steps `PhysicsWorld::update` takes per call; leftover time is dropped.
    pub max_substeps: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            solver_iterations: 12,
            baumgarte_factor: 0.24,
            baumgarte_slop: 0.01,
            restitution_threshold: 0.0,
            cell_size: 3.2,
            fixed_dt: 1.0 / 60.0,
            max_substeps: 8,
        }
    }
}

impl WorldConfig {
    pub(crate) fn solver(&self) -> ContactSolver {
        ContactSolver {
            baumgarte_factor: self.baumgarte_factor,
            baumgarte_slop: self.baumgarte_slop,
            restitution_threshold: self.restitution_threshold,
        }
    }
}
