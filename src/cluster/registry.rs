//! Ordered node roster with liveness

use crate::error::{ClusterError, Result};
use crate::storage::{Node, NodeId, NodeState};
use std::collections::HashMap;
use tracing::{info, warn};

/// Nodes in the order they joined, addressable by id
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `DuplicateNode` (with a warning) when `id` is already registered
    pub fn ensure_absent(&self, id: &str) -> Result<()> {
        if self.index.contains_key(id) {
            warn!(node = %id, "node already exists");
            return Err(ClusterError::DuplicateNode(id.to_string()));
        }
        Ok(())
    }

    /// Register a node; a duplicate id leaves the roster untouched
    pub fn add(&mut self, node: Node) -> Result<()> {
        self.ensure_absent(&node.id)?;
        info!(node = %node.id, position = self.nodes.len(), "added node");
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Flip a node up or down; unknown ids are ignored with a warning
    pub fn set_liveness(&mut self, id: &str, up: bool) -> Result<()> {
        let Some(node) = self.get_mut(id) else {
            warn!(node = %id, "unknown node");
            return Err(ClusterError::UnknownNode(id.to_string()));
        };
        let state = NodeState::from_up(up);
        node.set_state(state);
        info!(node = %id, %state, "liveness changed");
        Ok(())
    }

    /// Whether the node exists and is up
    pub fn is_up(&self, id: &str) -> bool {
        self.get(id).map(Node::is_up).unwrap_or(false)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index.get(id).map(|&i| &mut self.nodes[i])
    }

    /// Roster order
    pub fn list(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn up_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_up()).count()
    }
}
