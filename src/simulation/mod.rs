//! Simulation module for driving a cluster with synthetic traffic
//!
//! The simulator issues random reads and writes over a small key space and
//! applies failure scenarios on request, keeping counters of how many writes
//! reached quorum.

pub mod failure;
pub mod workload;

pub use failure::FailureScenario;
pub use workload::{workload_key, WorkloadStats};

use crate::partition::quorum_for;
use crate::storage::NodeId;
use crate::{ClusterCoordinator, Result, WriteOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Default number of distinct keys the workload touches
pub const DEFAULT_KEY_SPACE: usize = 32;

/// A simulation coordinator that drives a cluster
pub struct Simulator {
    /// The cluster being simulated
    pub cluster: ClusterCoordinator,
    rng: StdRng,
    key_space: usize,
    next_value: u64,
    stats: WorkloadStats,
}

impl Simulator {
    /// Create a new simulator with an entropy-seeded RNG
    pub fn new(cluster: ClusterCoordinator) -> Self {
        Self::with_rng(cluster, StdRng::from_entropy())
    }

    /// Create a simulator whose choices are reproducible
    pub fn with_seed(cluster: ClusterCoordinator, seed: u64) -> Self {
        Self::with_rng(cluster, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cluster: ClusterCoordinator, rng: StdRng) -> Self {
        Self {
            cluster,
            rng,
            key_space: DEFAULT_KEY_SPACE,
            next_value: 0,
            stats: WorkloadStats::default(),
        }
    }

    pub fn set_key_space(&mut self, keys: usize) {
        self.key_space = keys.max(1);
    }

    pub fn stats(&self) -> &WorkloadStats {
        &self.stats
    }

    fn random_key(&mut self) -> String {
        workload_key(self.rng.gen_range(0..self.key_space))
    }

    /// Write a fresh value to a random workload key
    pub fn random_write(&mut self) -> (String, Result<WriteOutcome>) {
        let key = self.random_key();
        self.next_value += 1;
        let value = format!("v{}", self.next_value);
        let result = self.cluster.put(&key, &value);
        self.stats.record_write(&result);
        (key, result)
    }

    /// Read a random workload key
    pub fn random_read(&mut self) -> (String, Result<String>) {
        let key = self.random_key();
        let result = self.cluster.get(&key);
        self.stats.record_read(&result);
        (key, result)
    }

    /// Issue `ops` random requests, `write_ratio` of them writes
    pub fn run_workload(&mut self, ops: usize, write_ratio: f64) -> WorkloadStats {
        let before = self.stats;
        for _ in 0..ops {
            if self.rng.gen_bool(write_ratio.clamp(0.0, 1.0)) {
                self.random_write();
            } else {
                self.random_read();
            }
        }
        self.stats.since(&before)
    }

    /// Take down the nodes selected by `scenario`, returning them
    pub fn run_failure_scenario(&mut self, scenario: &FailureScenario) -> Result<Vec<NodeId>> {
        let victims = scenario.victims(&self.cluster, &mut self.rng);
        for id in &victims {
            self.cluster.set_liveness(id, false)?;
        }
        info!(%scenario, ?victims, "failure scenario applied");
        Ok(victims)
    }

    /// Bring every down node back up
    pub fn bring_all_up(&mut self) -> Result<usize> {
        let down: Vec<NodeId> = self
            .cluster
            .registry()
            .list()
            .iter()
            .filter(|n| !n.is_up())
            .map(|n| n.id.clone())
            .collect();
        for id in &down {
            self.cluster.set_liveness(id, true)?;
        }
        Ok(down.len())
    }

    /// Get simulation status
    pub fn status(&self) -> SimulationStatus {
        let registry = self.cluster.registry();
        let partitions = self.cluster.list_partitions();
        let writable = partitions
            .iter()
            .filter(|p| {
                let up = p.replicas.iter().filter(|id| registry.is_up(id)).count();
                up >= quorum_for(p.replicas.len())
            })
            .count();

        SimulationStatus {
            total_nodes: registry.len(),
            up_nodes: registry.up_count(),
            partitions: partitions.len(),
            writable_partitions: writable,
            replication_factor: self.cluster.config().replication_factor,
            stats: self.stats,
        }
    }
}

/// Current status of the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStatus {
    pub total_nodes: usize,
    pub up_nodes: usize,
    pub partitions: usize,
    /// Partitions whose up replicas still form a quorum
    pub writable_partitions: usize,
    pub replication_factor: usize,
    pub stats: WorkloadStats,
}

impl SimulationStatus {
    /// Share of partitions that can still commit writes, in percent
    pub fn availability_percentage(&self) -> f64 {
        if self.partitions == 0 {
            return 0.0;
        }
        (self.writable_partitions as f64 / self.partitions as f64) * 100.0
    }

    pub fn availability_description(&self) -> &'static str {
        match self.availability_percentage() {
            p if p >= 100.0 => "Fully writable",
            p if p >= 50.0 => "Degraded",
            p if p > 0.0 => "Mostly unavailable",
            _ => "Unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClusterConfig;

    fn simulator() -> Simulator {
        let cluster = ClusterCoordinator::new(ClusterConfig::new(3, 2).in_memory()).unwrap();
        Simulator::with_seed(cluster, 42)
    }

    #[test]
    fn test_workload_all_up_commits_everything() {
        let mut sim = simulator();
        let delta = sim.run_workload(100, 0.7);
        assert_eq!(delta.writes() + delta.reads(), 100);
        assert_eq!(delta.writes_failed, 0);
        assert_eq!(sim.stats().commit_rate(), 1.0);
    }

    #[test]
    fn test_reads_see_written_keys() {
        let mut sim = simulator();
        sim.set_key_space(1);
        let (key, result) = sim.random_write();
        assert!(result.is_ok());

        let (read_key, value) = sim.random_read();
        assert_eq!(read_key, key);
        assert_eq!(value.unwrap(), "v1");
    }

    #[test]
    fn test_failures_reduce_availability() {
        let mut sim = simulator();
        let status = sim.status();
        assert_eq!(status.up_nodes, 3);
        assert_eq!(status.writable_partitions, 6);
        assert_eq!(status.availability_description(), "Fully writable");

        let victims = sim.run_failure_scenario(&FailureScenario::SingleNode).unwrap();
        assert_eq!(victims.len(), 1);

        // with RF=2 every partition holding the victim loses quorum
        let status = sim.status();
        assert_eq!(status.up_nodes, 2);
        assert_eq!(status.writable_partitions, 2);

        let delta = sim.run_workload(200, 1.0);
        assert!(delta.writes_failed > 0);

        assert_eq!(sim.bring_all_up().unwrap(), 1);
        assert_eq!(sim.status().writable_partitions, 6);
    }

    #[test]
    fn test_total_outage() {
        let mut sim = simulator();
        sim.run_failure_scenario(&FailureScenario::Nodes(3)).unwrap();

        let status = sim.status();
        assert_eq!(status.up_nodes, 0);
        assert_eq!(status.availability_percentage(), 0.0);
        assert_eq!(status.availability_description(), "Unavailable");

        let delta = sim.run_workload(20, 0.5);
        assert_eq!(delta.writes_committed, 0);
        assert_eq!(delta.reads_found, 0);
    }
}
