//! Operator-triggered failure scenarios
//!
//! Nothing here runs on its own; a scenario only takes nodes down when it is
//! explicitly invoked.

use crate::storage::NodeId;
use crate::ClusterCoordinator;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// Which nodes a failure scenario takes down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureScenario {
    /// One random up node
    SingleNode,
    /// Up to `n` random up nodes
    Nodes(usize),
    /// The leader of the partition owning this key, if it is up
    Leader(String),
}

impl fmt::Display for FailureScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureScenario::SingleNode => write!(f, "Single Node Failure"),
            FailureScenario::Nodes(n) => write!(f, "Multiple Node Failure ({})", n),
            FailureScenario::Leader(key) => write!(f, "Leader Failure (key {})", key),
        }
    }
}

impl FailureScenario {
    /// Pick the nodes this scenario would take down right now
    pub fn victims<R>(&self, cluster: &ClusterCoordinator, rng: &mut R) -> Vec<NodeId>
    where
        R: Rng + ?Sized,
    {
        let mut up: Vec<NodeId> = cluster
            .registry()
            .list()
            .iter()
            .filter(|n| n.is_up())
            .map(|n| n.id.clone())
            .collect();

        match self {
            FailureScenario::SingleNode => up.choose(rng).cloned().into_iter().collect(),
            FailureScenario::Nodes(count) => {
                up.shuffle(rng);
                up.truncate(*count);
                up
            }
            FailureScenario::Leader(key) => cluster
                .replica_set(key)
                .first()
                .filter(|id| cluster.is_up(id))
                .cloned()
                .into_iter()
                .collect(),
        }
    }
}
