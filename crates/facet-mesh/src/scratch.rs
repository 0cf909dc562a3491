//! Per-worker scratch state reused across every mesh a worker builds.

use crate::constants::INITIAL_POLYGON_WORDS;
use crate::normal::{NORMAL_ORDER, PolygonNormal};

/// Growable word array accumulating the polygons of the mesh under construction.
/// `reset` keeps the allocation.
#[derive(Debug)]
pub struct PolygonBuffer {
    data: Vec<u32>,
    size: usize,
}

impl Default for PolygonBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonBuffer {
    pub fn new() -> Self {
        Self {
            data: vec![0; INITIAL_POLYGON_WORDS],
            size: 0,
        }
    }

    /// Makes room for `additional` words past the current size, at least doubling.
    pub fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.size + additional;
        if needed > self.data.len() {
            let grown = needed.max(self.data.len() * 2);
            self.data.resize(grown, 0);
        }
    }

    /// Writable words past the current size; callers reserve them first with
    /// [`ensure_capacity`](Self::ensure_capacity).
    #[inline]
    pub fn spare_mut(&mut self, words: usize) -> &mut [u32] {
        &mut self.data[self.size..self.size + words]
    }

    /// Commits `words` previously written through [`spare_mut`](Self::spare_mut).
    #[inline]
    pub fn advance(&mut self, words: usize) {
        debug_assert!(self.size + words <= self.data.len());
        self.size += words;
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.data[..self.size]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn reset(&mut self) {
        self.size = 0;
    }
}

/// Result of a bucket sort: polygon indices in canonical bucket order plus
/// the offset at which each [`NORMAL_ORDER`] bucket begins.
#[derive(Debug)]
pub struct BucketOrder<'a> {
    pub permutation: &'a [u32],
    /// `starts[k]` is where `NORMAL_ORDER[k]` begins; `starts[7]` is the total.
    pub starts: [usize; PolygonNormal::COUNT + 1],
}

impl BucketOrder<'_> {
    /// Polygon count of the bucket at canonical slot `slot`.
    #[inline]
    pub fn bucket_len(&self, slot: usize) -> usize {
        self.starts[slot + 1] - self.starts[slot]
    }
}

/// Stable bucket sort of polygons by their trailing normal word.
#[derive(Debug, Default)]
pub struct BucketSorter {
    buckets: [Vec<u32>; PolygonNormal::COUNT],
    result: Vec<u32>,
}

impl BucketSorter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn bucket(polygons: &[u32], polygon_size: usize, index: usize) -> PolygonNormal {
        PolygonNormal::from_index(polygons[polygon_size * (index + 1) - 1])
    }

    pub fn sort(
        &mut self,
        polygons: &[u32],
        polygon_size: usize,
        polygon_count: usize,
    ) -> BucketOrder<'_> {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        for i in 0..polygon_count {
            let normal = Self::bucket(polygons, polygon_size, i);
            self.buckets[normal.index()].push(i as u32);
        }

        self.result.clear();
        let mut starts = [0usize; PolygonNormal::COUNT + 1];
        for (slot, normal) in NORMAL_ORDER.iter().enumerate() {
            starts[slot] = self.result.len();
            self.result.extend_from_slice(&self.buckets[normal.index()]);
        }
        starts[PolygonNormal::COUNT] = self.result.len();
        debug_assert_eq!(self.result.len(), polygon_count);

        BucketOrder {
            permutation: &self.result,
            starts,
        }
    }
}

/// Everything one worker needs to build meshes, owned for the worker's lifetime
/// and never shared.
#[derive(Debug, Default)]
pub struct ScratchArena {
    pub polygons: PolygonBuffer,
    pub sorter: BucketSorter,
    stale_resets: u64,
}

impl ScratchArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares for a new mesh. Returns `false` when leftovers of an unfinished
    /// construction were found; they are discarded.
    pub fn begin(&mut self) -> bool {
        if self.polygons.is_empty() {
            return true;
        }
        log::error!(
            target: "mesh",
            "Invalid state: tried to construct a chunk mesh before the previous one \
             has finished constructing! Discarding {} stale words.",
            self.polygons.len()
        );
        self.polygons.reset();
        self.stale_resets += 1;
        false
    }

    /// Drops in-flight polygons of a superseded build.
    pub fn cancel(&mut self) {
        if !self.polygons.is_empty() {
            self.polygons.reset();
            log::debug!(target: "mesh", "Cancelled unfinished build");
        }
    }

    /// Number of times `begin` found stale data.
    pub fn stale_resets(&self) -> u64 {
        self.stale_resets
    }
}
