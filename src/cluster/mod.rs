//! Cluster coordination
//!
//! The coordinator owns the node registry and the partition table. Requests
//! are resolved to a partition, fanned out in rank order over that
//! partition's replica list, and committed when a majority of the list
//! acknowledges. There is no rollback, read repair, or rebalancing.

pub mod coordinator;
pub mod registry;
pub mod report;

pub use coordinator::{ClusterCoordinator, WriteOutcome};
pub use registry::NodeRegistry;
pub use report::{ClusterReport, NodeAssignment, NodeStatus};
