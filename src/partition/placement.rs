//! Replica placement
//!
//! The partition table is computed once per initialization over the node
//! roster as it was at that moment. Nodes added later own nothing until the
//! table is rebuilt explicitly.

use crate::error::{ClusterError, Result};
use crate::partition::MAX_PARTITIONS;
use crate::storage::NodeId;
use std::fmt;

/// Position of a node within a partition's replica list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Rank 0, preferred source for reads
    Leader,
    Replica,
}

impl Role {
    pub fn for_rank(rank: usize) -> Self {
        if rank == 0 {
            Role::Leader
        } else {
            Role::Replica
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            Role::Leader => "L",
            Role::Replica => "R",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Leader => write!(f, "Leader"),
            Role::Replica => write!(f, "Replica"),
        }
    }
}

/// Ordered replica list for a single partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub partition: usize,
    pub replicas: Vec<NodeId>,
}

impl Placement {
    pub fn leader(&self) -> Option<&NodeId> {
        self.replicas.first()
    }

    /// Replicas paired with their role, in rank order
    pub fn ranked(&self) -> impl Iterator<Item = (Role, &NodeId)> {
        self.replicas
            .iter()
            .enumerate()
            .map(|(rank, id)| (Role::for_rank(rank), id))
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition={} -> ", self.partition)?;
        for (i, (role, id)) in self.ranked().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}) {}", role, id)?;
        }
        Ok(())
    }
}

/// Partition index to replica list, fixed until the next initialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    replicas: Vec<Vec<NodeId>>,
    replication_factor: usize,
}

impl PartitionTable {
    /// Place `partitions` partitions (at least one) over `roster`.
    ///
    /// Rank `r` of partition `p` is `roster[(p + r) % N]`. A replication
    /// factor above the roster size wraps around and repeats nodes.
    pub fn build(roster: &[NodeId], partitions: usize, replication_factor: usize) -> Result<Self> {
        if roster.is_empty() {
            return Err(ClusterError::NoNodes);
        }
        if partitions > MAX_PARTITIONS {
            return Err(ClusterError::InvalidConfig(format!(
                "partition count {} exceeds {}",
                partitions, MAX_PARTITIONS
            )));
        }
        let partitions = partitions.max(1);
        let n = roster.len();

        let replicas = (0..partitions)
            .map(|p| {
                (0..replication_factor)
                    .map(|r| roster[(p + r) % n].clone())
                    .collect()
            })
            .collect();

        Ok(Self {
            replicas,
            replication_factor,
        })
    }

    /// Number of partitions; zero until the table has been built
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    /// Replica list for a partition, empty if the index is out of range
    pub fn placement_for(&self, partition: usize) -> &[NodeId] {
        self.replicas
            .get(partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn placements(&self) -> impl Iterator<Item = Placement> + '_ {
        self.replicas
            .iter()
            .enumerate()
            .map(|(partition, replicas)| Placement {
                partition,
                replicas: replicas.clone(),
            })
    }

    /// Role of `node` in `partition`, decided by its first occurrence
    pub fn role_of(&self, node: &str, partition: usize) -> Option<Role> {
        self.placement_for(partition)
            .iter()
            .position(|id| id == node)
            .map(Role::for_rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<NodeId> {
        (0..n).map(|i| format!("N{}", i)).collect()
    }

    #[test]
    fn test_round_robin_placement() {
        let table = PartitionTable::build(&roster(3), 6, 2).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.placement_for(0), ["N0", "N1"]);
        assert_eq!(table.placement_for(1), ["N1", "N2"]);
        assert_eq!(table.placement_for(2), ["N2", "N0"]);
        assert_eq!(table.placement_for(5), ["N2", "N0"]);
    }

    #[test]
    fn test_replica_list_shape() {
        let nodes = roster(5);
        for rf in 1..=5 {
            let table = PartitionTable::build(&nodes, 10, rf).unwrap();
            for p in 0..table.len() {
                let list = table.placement_for(p);
                assert_eq!(list.len(), rf.min(nodes.len()));

                let mut distinct = list.to_vec();
                distinct.sort();
                distinct.dedup();
                assert_eq!(distinct.len(), list.len());
                assert!(list.iter().all(|id| nodes.contains(id)));
            }
        }
    }

    #[test]
    fn test_replication_above_roster_repeats_nodes() {
        let table = PartitionTable::build(&roster(2), 2, 3).unwrap();
        assert_eq!(table.placement_for(0), ["N0", "N1", "N0"]);
        assert_eq!(table.placement_for(1), ["N1", "N0", "N1"]);
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert!(matches!(
            PartitionTable::build(&[], 4, 2),
            Err(ClusterError::NoNodes)
        ));
    }

    #[test]
    fn test_partition_count_clamped() {
        let table = PartitionTable::build(&roster(3), 0, 2).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_oversized_table_rejected() {
        assert!(matches!(
            PartitionTable::build(&roster(3), 100_000_000_000, 2),
            Err(ClusterError::InvalidConfig(_))
        ));
        let table = PartitionTable::build(&roster(3), MAX_PARTITIONS, 1).unwrap();
        assert_eq!(table.len(), MAX_PARTITIONS);
    }

    #[test]
    fn test_out_of_range_partition() {
        let table = PartitionTable::build(&roster(3), 3, 2).unwrap();
        assert!(table.placement_for(3).is_empty());
        assert!(PartitionTable::default().placement_for(0).is_empty());
    }

    #[test]
    fn test_roles() {
        let table = PartitionTable::build(&roster(3), 3, 2).unwrap();
        assert_eq!(table.role_of("N2", 2), Some(Role::Leader));
        assert_eq!(table.role_of("N0", 2), Some(Role::Replica));
        assert_eq!(table.role_of("N1", 2), None);
    }

    #[test]
    fn test_placement_display() {
        let placement = Placement {
            partition: 2,
            replicas: vec!["N2".into(), "N0".into()],
        };
        assert_eq!(placement.leader(), Some(&"N2".to_string()));
        assert_eq!(
            placement.to_string(),
            "partition=2 -> (Leader) N2, (Replica) N0"
        );
    }
}
