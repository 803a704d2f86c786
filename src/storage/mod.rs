//! Per-node storage
//!
//! Every node exclusively owns one store. The durable store keeps an
//! append-only operation log that is replayed when the node is created.

pub mod log_store;
pub mod memory;
pub mod node;

pub use log_store::LogStore;
pub use memory::MemoryStore;
pub use node::{Node, NodeId, NodeState};

use crate::Result;

/// Trait for node storage backends
pub trait Storage: Send {
    /// Insert or overwrite a value; `Ok` only once the change is recorded
    fn put(&mut self, key: &str, value: &str) -> Result<()>;

    /// Look up a value
    fn get(&self, key: &str) -> Option<String>;

    /// Remove a key; removing an absent key still succeeds
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Number of keys held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
