//! Partitioned KV
//!
//! A simulation of a partitioned, replicated key-value cluster. Keys hash into
//! a fixed number of partitions, each partition is assigned an ordered list of
//! replica nodes, and writes are committed by majority quorum over that list.
//! Node liveness is operator-driven so degraded read and write paths can be
//! explored by hand, from scripted walkthroughs, or from a terminal dashboard.

pub mod cli;
pub mod cluster;
pub mod error;
pub mod partition;
pub mod simulation;
pub mod storage;
pub mod ui;

pub use cluster::{ClusterCoordinator, NodeRegistry, WriteOutcome};
pub use error::{ClusterError, Result};
pub use partition::{KeyHasher, PartitionTable, Placement, Role};
pub use simulation::{FailureScenario, Simulator};
pub use storage::{LogStore, MemoryStore, Node, NodeId, NodeState, Storage};
pub use ui::TerminalUI;

use std::path::PathBuf;

/// Partitions created per node when no explicit count is configured
pub const DEFAULT_PARTITIONS_PER_NODE: usize = 2;

/// Where each node keeps its data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Append-only log per node, replayed on startup
    Durable,
    /// Process-local map, lost on exit
    Memory,
}

/// Configuration for a cluster
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Number of nodes created at startup
    pub nodes: usize,
    /// Replica slots per partition
    pub replication_factor: usize,
    /// Number of partitions in the key space
    pub partitions: usize,
    /// Directory holding the per-node log files
    pub data_dir: PathBuf,
    /// Storage backend for every node
    pub storage: StorageMode,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::new(3, 2)
    }
}

impl ClusterConfig {
    /// Create a durable configuration with `nodes * 2` partitions
    pub fn new(nodes: usize, replication_factor: usize) -> Self {
        Self {
            nodes,
            replication_factor,
            partitions: nodes * DEFAULT_PARTITIONS_PER_NODE,
            data_dir: PathBuf::from("."),
            storage: StorageMode::Durable,
        }
    }

    /// Same configuration, but nodes keep their data in memory only
    pub fn in_memory(mut self) -> Self {
        self.storage = StorageMode::Memory;
        self
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(ClusterError::InvalidConfig(
                "node count must be greater than 0".into(),
            ));
        }
        if self.replication_factor == 0 {
            return Err(ClusterError::InvalidConfig(
                "replication factor must be greater than 0".into(),
            ));
        }
        if self.partitions > partition::MAX_PARTITIONS {
            return Err(ClusterError::InvalidConfig(format!(
                "partition count must be at most {}",
                partition::MAX_PARTITIONS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClusterConfig::default();
        assert_eq!(config.nodes, 3);
        assert_eq!(config.replication_factor, 2);
        assert_eq!(config.partitions, 6);
        assert_eq!(config.storage, StorageMode::Durable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(ClusterConfig::new(0, 2).validate().is_err());
        assert!(ClusterConfig::new(3, 0).validate().is_err());
        assert!(ClusterConfig::new(3, 2)
            .with_partitions(partition::MAX_PARTITIONS + 1)
            .validate()
            .is_err());
        assert!(ClusterConfig::new(3, 2)
            .with_partitions(partition::MAX_PARTITIONS)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ClusterConfig::new(4, 3)
            .with_partitions(16)
            .with_data_dir("/tmp/kv")
            .in_memory();
        assert_eq!(config.partitions, 16);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/kv"));
        assert_eq!(config.storage, StorageMode::Memory);
    }
}
