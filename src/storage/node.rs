//! Cluster node
//!
//! A node is an identity, an operator-controlled liveness flag, and the one
//! store it owns. Liveness never changes on its own.

use crate::storage::Storage;
use std::fmt;

/// Unique identifier for a node
pub type NodeId = String;

/// Liveness of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Node takes part in reads and writes
    Up,
    /// Node is skipped by every request
    Down,
}

impl NodeState {
    pub fn from_up(up: bool) -> Self {
        if up {
            NodeState::Up
        } else {
            NodeState::Down
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Up => write!(f, "UP"),
            NodeState::Down => write!(f, "DOWN"),
        }
    }
}

/// A cluster member and its store
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,
    state: NodeState,
    store: Box<dyn Storage>,
}

impl Node {
    /// Create a node that starts out up
    pub fn new(id: impl Into<NodeId>, store: Box<dyn Storage>) -> Self {
        Self {
            id: id.into(),
            state: NodeState::Up,
            store,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    pub fn is_up(&self) -> bool {
        self.state == NodeState::Up
    }

    pub fn store(&self) -> &dyn Storage {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn Storage {
        self.store.as_mut()
    }

    /// Number of keys held by this node's store
    pub fn key_count(&self) -> usize {
        self.store.len()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("keys", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_node_creation() {
        let node = Node::new("Node1", Box::new(MemoryStore::new()));
        assert_eq!(node.id, "Node1");
        assert_eq!(node.state(), NodeState::Up);
        assert!(node.is_up());
        assert_eq!(node.key_count(), 0);
    }

    #[test]
    fn test_node_state_changes() {
        let mut node = Node::new("Node1", Box::new(MemoryStore::new()));

        node.set_state(NodeState::Down);
        assert!(!node.is_up());

        node.set_state(NodeState::from_up(true));
        assert!(node.is_up());
    }

    #[test]
    fn test_store_survives_downtime() {
        let mut node = Node::new("Node1", Box::new(MemoryStore::new()));
        node.store_mut().put("k", "v").unwrap();

        node.set_state(NodeState::Down);
        node.set_state(NodeState::Up);
        assert_eq!(node.store().get("k"), Some("v".to_string()));
        assert_eq!(node.key_count(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(NodeState::Up.to_string(), "UP");
        assert_eq!(NodeState::Down.to_string(), "DOWN");
    }
}
