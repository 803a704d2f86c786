//! Error types shared across the cluster

use crate::cluster::WriteOutcome;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Debug, Error)]
pub enum ClusterError {
    /// The key resolved to no usable replica list
    #[error("no replica set available")]
    NoReplicaSet,

    /// Fewer live replicas acknowledged than the quorum requires
    #[error("quorum not reached ({0})")]
    QuorumFailure(WriteOutcome),

    #[error("key {0} not found on any live replica")]
    NotFound(String),

    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("node {0} already exists")]
    DuplicateNode(String),

    #[error("no nodes present; add nodes before initializing partitions")]
    NoNodes,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Keys and values are stored as single log tokens
    #[error("invalid token {0:?}: must be non-empty and free of whitespace")]
    InvalidToken(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClusterError {
    /// Operator mistakes that are reported and ignored
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ClusterError::UnknownNode(_) | ClusterError::DuplicateNode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_classification() {
        assert!(ClusterError::UnknownNode("Node9".into()).is_warning());
        assert!(ClusterError::DuplicateNode("Node0".into()).is_warning());
        assert!(!ClusterError::NoReplicaSet.is_warning());
        assert!(!ClusterError::NoNodes.is_warning());
    }

    #[test]
    fn test_quorum_failure_message() {
        let outcome = WriteOutcome {
            partition: 2,
            replication: 2,
            quorum: 2,
            acks: 1,
        };
        let message = ClusterError::QuorumFailure(outcome).to_string();
        assert_eq!(message, "quorum not reached (part=2 RF=2 quorum=2 acks=1)");
    }
}
