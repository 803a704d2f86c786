//! Deterministic key to partition mapping

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps keys onto `[0, partitions)` by range-bucketing their hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHasher {
    partitions: usize,
}

impl KeyHasher {
    pub fn new(partitions: usize) -> Self {
        Self { partitions }
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Partition owning `key`, or `None` when there are no partitions.
    ///
    /// The hash space is split into contiguous buckets of width
    /// `u64::MAX / P + 1`; the last bucket absorbs the rounding remainder.
    pub fn partition_for_key(&self, key: &str) -> Option<usize> {
        if self.partitions == 0 {
            return None;
        }
        let width = u64::MAX as u128 / self.partitions as u128 + 1;
        let bucket = hash_key(key) as u128 / width;
        Some((bucket as usize).min(self.partitions - 1))
    }
}

/// Unsigned 64-bit hash of a key, stable for the life of the process
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
