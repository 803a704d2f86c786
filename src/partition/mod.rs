//! Key partitioning and replica placement
//!
//! Keys are hashed into `P` equal-width buckets of the 64-bit hash space. Each
//! partition is then mapped to an ordered replica list taken from the node
//! roster by walking it round-robin from the partition's own offset.

pub mod hasher;
pub mod placement;

pub use hasher::KeyHasher;
pub use placement::{PartitionTable, Placement, Role};

/// Largest partition table that can be built
pub const MAX_PARTITIONS: usize = 1 << 16;

/// Minimum number of acknowledgments needed to commit on `replicas` nodes
pub fn quorum_for(replicas: usize) -> usize {
    replicas / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_is_strict_majority() {
        assert_eq!(quorum_for(1), 1);
        assert_eq!(quorum_for(2), 2);
        assert_eq!(quorum_for(3), 2);
        assert_eq!(quorum_for(4), 3);
        assert_eq!(quorum_for(5), 3);
    }
}
