// Implements a uniform spatial hash for broadphase collision detection.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::collision::AABB;
use crate::math::vec2::Vec2;

/// A uniform grid of square cells over the world bounds. Only occupied cells are
/// stored, keyed by their integer (column, row) coordinates.
///
/// AABBs are clamped to the bounds before cells are chosen, so a body outside the
/// bounds lands in the border cells and a huge body touches at most every cell once.
#[derive(Debug)]
pub struct SpatialHash {
    bounds: AABB,
    cell_size: f64,
    inv_cell_size: f64, // 1.0 / cell_size, cached for performance
    cells: HashMap<(i32, i32), Vec<usize>>,
    // Every inserted entry in insertion order; drives deterministic pair generation.
    entries: Vec<(usize, AABB)>,
}

impl SpatialHash {
    /// Creates a new SpatialHash.
    ///
    /// # Arguments
    /// * `bounds` - The region covered by cells.
    /// * `cell_size` - The width/height of each cell. Must be positive.
    pub fn new(bounds: AABB, cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "Cell size must be positive");
        debug!(
            cell_size,
            width = bounds.width(),
            height = bounds.height(),
            "creating spatial hash"
        );
        SpatialHash {
            bounds,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of entries inserted since the last [`SpatialHash::clear`].
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts world coordinates to cell coordinates (col, row).
    #[inline]
    fn cell_of(&self, point: Vec2) -> (i32, i32) {
        (
            (point.x * self.inv_cell_size).floor() as i32,
            (point.y * self.inv_cell_size).floor() as i32,
        )
    }

    fn clamp_to_bounds(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.max(self.bounds.min.x).min(self.bounds.max.x),
            point.y.max(self.bounds.min.y).min(self.bounds.max.y),
        )
    }

    /// Inclusive range of cells overlapped by an AABB clamped to the bounds.
    fn cell_range(&self, aabb: &AABB) -> ((i32, i32), (i32, i32)) {
        (
            self.cell_of(self.clamp_to_bounds(aabb.min)),
            self.cell_of(self.clamp_to_bounds(aabb.max)),
        )
    }

    /// Removes every entry. Buckets used since the previous clear keep their
    /// allocations for the next rebuild; the others are dropped.
    pub fn clear(&mut self) {
        self.cells.retain(|_, bucket| {
            let used = !bucket.is_empty();
            bucket.clear();
            used
        });
        self.entries.clear();
    }

    /// Inserts a body's AABB into every cell it overlaps.
    ///
    /// # Arguments
    /// * `index` - The index of the body in the world's body list.
    /// * `aabb` - The world-space AABB of the body.
    pub fn insert(&mut self, index: usize, aabb: &AABB) {
        if !aabb.min.is_finite() || !aabb.max.is_finite() {
            trace!(index, "skipping non-finite aabb");
            return;
        }

        let ((min_col, min_row), (max_col, max_row)) = self.cell_range(aabb);
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                self.cells.entry((col, row)).or_default().push(index);
            }
        }
        self.entries.push((index, *aabb));
    }

    /// Collects the indices stored in any cell the AABB touches into `out`, sorted and
    /// de-duplicated. `out` is cleared first.
    pub fn query_into(&self, aabb: &AABB, out: &mut Vec<usize>) {
        out.clear();
        if !aabb.min.is_finite() || !aabb.max.is_finite() {
            return;
        }

        let ((min_col, min_row), (max_col, max_row)) = self.cell_range(aabb);
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                if let Some(bucket) = self.cells.get(&(col, row)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    /// Convenience wrapper around [`SpatialHash::query_into`].
    pub fn query(&self, aabb: &AABB) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_into(aabb, &mut out);
        out
    }

    /// Generates candidate pairs `(a, b)` with `a < b` whose AABBs overlap.
    ///
    /// Pairs are reported once, in insertion order of `a` and ascending order of `b`.
    /// `skip(a, b)` drops pairs the caller never wants to test (e.g. two static bodies).
    pub fn potential_pairs<F>(&self, mut skip: F) -> Vec<(usize, usize)>
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut lookup: HashMap<usize, AABB> = HashMap::with_capacity(self.entries.len());
        for (index, aabb) in &self.entries {
            lookup.insert(*index, *aabb);
        }

        let mut pairs = Vec::new();
        let mut candidates = Vec::new();
        for (a, aabb_a) in &self.entries {
            self.query_into(aabb_a, &mut candidates);
            for &b in candidates.iter().filter(|&&b| b > *a) {
                if skip(*a, b) {
                    continue;
                }
                let overlapping = lookup
                    .get(&b)
                    .map_or(false, |aabb_b| aabb_a.overlaps(aabb_b));
                if overlapping {
                    pairs.push((*a, b));
                }
            }
        }
        pairs
    }
}
