//! Quorum coordinator
//!
//! Writes and deletes are sent to every live replica of the key's partition
//! in rank order and commit when at least `len / 2 + 1` of them acknowledge.
//! Replicas that applied a write stay written even when the quorum is missed,
//! so a failed write can leave replicas disagreeing until the key is written
//! again. Reads return the first live replica, leader first, that holds the
//! key.

use crate::cluster::report::{ClusterReport, NodeStatus};
use crate::cluster::NodeRegistry;
use crate::error::{ClusterError, Result};
use crate::partition::{quorum_for, KeyHasher, PartitionTable, Placement};
use crate::storage::{LogStore, MemoryStore, Node, NodeId, Storage};
use crate::{ClusterConfig, StorageMode};
use std::fmt;
use tracing::{debug, info, warn};

/// Quorum bookkeeping for a single write or delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub partition: usize,
    /// Length of the replica list the write was sent to
    pub replication: usize,
    pub quorum: usize,
    pub acks: usize,
}

impl WriteOutcome {
    pub fn committed(&self) -> bool {
        self.acks >= self.quorum
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "part={} RF={} quorum={} acks={}",
            self.partition, self.replication, self.quorum, self.acks
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteOp<'a> {
    Put(&'a str),
    Delete,
}

impl WriteOp<'_> {
    fn name(&self) -> &'static str {
        match self {
            WriteOp::Put(_) => "PUT",
            WriteOp::Delete => "DEL",
        }
    }

    fn apply(&self, store: &mut dyn Storage, key: &str) -> Result<()> {
        match self {
            WriteOp::Put(value) => store.put(key, value),
            WriteOp::Delete => store.delete(key),
        }
    }
}

/// Owns the roster and partition table and routes every request
pub struct ClusterCoordinator {
    config: ClusterConfig,
    registry: NodeRegistry,
    hasher: KeyHasher,
    table: PartitionTable,
}

impl ClusterCoordinator {
    /// Create `config.nodes` nodes named `Node0..` and place partitions over them
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        let mut cluster = Self::empty(config);
        for i in 0..cluster.config.nodes {
            cluster.add_node(&format!("Node{}", i))?;
        }
        cluster.init_partitions(cluster.config.partitions)?;
        Ok(cluster)
    }

    /// A cluster with no nodes and no partitions yet
    pub fn empty(config: ClusterConfig) -> Self {
        Self {
            config,
            registry: NodeRegistry::new(),
            hasher: KeyHasher::new(0),
            table: PartitionTable::default(),
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn partition_table(&self) -> &PartitionTable {
        &self.table
    }

    pub fn is_initialized(&self) -> bool {
        !self.table.is_empty()
    }

    /// Add a node to the roster. Existing partitions are not reassigned.
    ///
    /// A duplicate id is rejected before its store is opened, so the existing
    /// node's log is never opened twice.
    pub fn add_node(&mut self, id: &str) -> Result<()> {
        self.registry.ensure_absent(id)?;
        let store = self.open_store(id)?;
        self.registry.add(Node::new(id, store))
    }

    fn open_store(&self, id: &str) -> Result<Box<dyn Storage>> {
        match self.config.storage {
            StorageMode::Durable => {
                std::fs::create_dir_all(&self.config.data_dir)?;
                let path = self.config.data_dir.join(format!("{}.log", id));
                Ok(Box::new(LogStore::open(path)?))
            }
            StorageMode::Memory => Ok(Box::new(MemoryStore::new())),
        }
    }

    /// Rebuild the partition table over the current roster.
    ///
    /// With an empty roster nothing changes and `NoNodes` is returned.
    pub fn init_partitions(&mut self, partitions: usize) -> Result<()> {
        let table = PartitionTable::build(
            &self.registry.ids(),
            partitions,
            self.config.replication_factor,
        )?;
        self.hasher = KeyHasher::new(table.len());
        self.table = table;
        info!(
            partitions = self.table.len(),
            rf = self.config.replication_factor,
            nodes = self.registry.len(),
            "initialized partitions"
        );
        Ok(())
    }

    pub fn set_liveness(&mut self, id: &str, up: bool) -> Result<()> {
        self.registry.set_liveness(id, up)
    }

    pub fn is_up(&self, id: &str) -> bool {
        self.registry.is_up(id)
    }

    pub fn partition_for_key(&self, key: &str) -> Option<usize> {
        self.hasher.partition_for_key(key)
    }

    /// Ordered replica list for `key`, empty when uninitialized
    pub fn replica_set(&self, key: &str) -> &[NodeId] {
        match self.hasher.partition_for_key(key) {
            Some(partition) => self.table.placement_for(partition),
            None => &[],
        }
    }

    /// Partition and replica list for `key`
    pub fn placement_of(&self, key: &str) -> Option<Placement> {
        let partition = self.hasher.partition_for_key(key)?;
        Some(Placement {
            partition,
            replicas: self.table.placement_for(partition).to_vec(),
        })
    }

    /// Write `value` to the key's replicas; `Ok` only when quorum acknowledged
    pub fn put(&mut self, key: &str, value: &str) -> Result<WriteOutcome> {
        self.replicate(key, WriteOp::Put(value))
    }

    /// Delete the key on its replicas with the same quorum rule as `put`
    pub fn delete(&mut self, key: &str) -> Result<WriteOutcome> {
        self.replicate(key, WriteOp::Delete)
    }

    fn replicate(&mut self, key: &str, op: WriteOp<'_>) -> Result<WriteOutcome> {
        let partition = self
            .hasher
            .partition_for_key(key)
            .ok_or(ClusterError::NoReplicaSet)?;
        let replicas = self.table.placement_for(partition);
        if replicas.is_empty() {
            warn!(op = op.name(), key, "no replica set available");
            return Err(ClusterError::NoReplicaSet);
        }

        let replication = replicas.len();
        let quorum = quorum_for(replication);
        let mut acks = 0;
        for (rank, id) in replicas.iter().enumerate() {
            let Some(node) = self.registry.get_mut(id) else {
                continue;
            };
            if !node.is_up() {
                warn!(op = op.name(), node = %id, rank, "replica DOWN; skip");
                continue;
            }
            match op.apply(node.store_mut(), key) {
                Ok(()) => {
                    acks += 1;
                    debug!(op = op.name(), node = %id, rank, key, "replica ack");
                }
                Err(e) => {
                    warn!(op = op.name(), node = %id, rank, error = %e, "replica write failed")
                }
            }
        }

        let outcome = WriteOutcome {
            partition,
            replication,
            quorum,
            acks,
        };
        if outcome.committed() {
            info!(op = op.name(), key, %outcome, "COMMIT");
            Ok(outcome)
        } else {
            warn!(op = op.name(), key, %outcome, "FAIL");
            Err(ClusterError::QuorumFailure(outcome))
        }
    }

    /// Read from the leader, falling back to live replicas in rank order
    pub fn get(&self, key: &str) -> Result<String> {
        let replicas = self.replica_set(key);
        if replicas.is_empty() {
            return Err(ClusterError::NoReplicaSet);
        }

        for (rank, id) in replicas.iter().enumerate() {
            let Some(node) = self.registry.get(id) else {
                continue;
            };
            if !node.is_up() {
                debug!(node = %id, rank, "replica DOWN; skip read");
                continue;
            }
            if let Some(value) = node.store().get(key) {
                debug!(node = %id, rank, key, "read hit");
                return Ok(value);
            }
        }
        Err(ClusterError::NotFound(key.to_string()))
    }

    /// Every partition with its replica list
    pub fn list_partitions(&self) -> Vec<Placement> {
        self.table.placements().collect()
    }

    /// Roster with liveness
    pub fn list_nodes(&self) -> Vec<NodeStatus> {
        self.registry.list().iter().map(NodeStatus::from).collect()
    }

    /// Per-node partition ownership
    pub fn cluster_report(&self) -> ClusterReport {
        ClusterReport::build(self.registry.list(), &self.table)
    }
}
