//! Read-only operator views over the roster and partition table

use crate::partition::{PartitionTable, Role};
use crate::storage::{Node, NodeId, NodeState};
use std::fmt;

/// One roster entry as shown by `NODES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub id: NodeId,
    pub state: NodeState,
    pub keys: usize,
}

impl From<&Node> for NodeStatus {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            state: node.state(),
            keys: node.key_count(),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] keys={}", self.id, self.state, self.keys)
    }
}

/// Partitions a node appears in, with its role in each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAssignment {
    pub id: NodeId,
    pub state: NodeState,
    pub partitions: Vec<(usize, Role)>,
}

impl NodeAssignment {
    pub fn leader_count(&self) -> usize {
        self.partitions
            .iter()
            .filter(|(_, role)| *role == Role::Leader)
            .count()
    }
}

impl fmt::Display for NodeAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] has partitions: ", self.id, self.state)?;
        if self.partitions.is_empty() {
            return write!(f, "(none)");
        }
        for (i, (partition, role)) in self.partitions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "P{} ({})", partition, role)?;
        }
        Ok(())
    }
}

/// Per-node summary of partition ownership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterReport {
    pub partitions: usize,
    pub replication_factor: usize,
    pub nodes: Vec<NodeAssignment>,
}

impl ClusterReport {
    pub fn build(nodes: &[Node], table: &PartitionTable) -> Self {
        let nodes = nodes
            .iter()
            .map(|node| NodeAssignment {
                id: node.id.clone(),
                state: node.state(),
                partitions: (0..table.len())
                    .filter_map(|p| table.role_of(&node.id, p).map(|role| (p, role)))
                    .collect(),
            })
            .collect();

        Self {
            partitions: table.len(),
            replication_factor: table.replication_factor(),
            nodes,
        }
    }
}

impl fmt::Display for ClusterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Cluster State ({} partitions, RF={}) ---",
            self.partitions, self.replication_factor
        )?;
        for node in &self.nodes {
            writeln!(f, "{}", node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn nodes(n: usize) -> Vec<Node> {
        (0..n)
            .map(|i| Node::new(format!("N{}", i), Box::new(MemoryStore::new())))
            .collect()
    }

    #[test]
    fn test_report_roles() {
        let nodes = nodes(3);
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        let table = PartitionTable::build(&ids, 3, 2).unwrap();

        let report = ClusterReport::build(&nodes, &table);
        assert_eq!(report.partitions, 3);
        assert_eq!(
            report.nodes[0].partitions,
            vec![(0, Role::Leader), (2, Role::Replica)]
        );
        assert_eq!(report.nodes[2].leader_count(), 1);
        assert_eq!(
            report.nodes[1].to_string(),
            "N1 [UP] has partitions: P0 (Replica), P1 (Leader)"
        );
    }

    #[test]
    fn test_unassigned_node() {
        let mut nodes = nodes(2);
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        let table = PartitionTable::build(&ids, 2, 1).unwrap();
        nodes.push(Node::new("N9", Box::new(MemoryStore::new())));

        let report = ClusterReport::build(&nodes, &table);
        assert!(report.nodes[2].partitions.is_empty());
        assert_eq!(report.nodes[2].to_string(), "N9 [UP] has partitions: (none)");
    }
}
