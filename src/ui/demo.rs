//! Scripted walkthroughs
//!
//! Each walkthrough drives a simulator through a fixed story and returns the
//! narration as lines, pausing between steps so the output can be followed.

use crate::simulation::{workload_key, FailureScenario, Simulator, WorkloadStats};
use crate::{ClusterCoordinator, ClusterError, Result, WriteOutcome};
use std::time::Duration;

/// Named walkthroughs selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Walkthrough {
    /// Quorum writes, a failed commit, stale reads and a topology change
    Quorum,
    /// Leaders going down one after another
    Failover,
    /// Random traffic while nodes fail and recover
    Workload,
}

impl Walkthrough {
    pub async fn run(self, simulator: &mut Simulator, pace: Duration) -> Result<Vec<String>> {
        match self {
            Walkthrough::Quorum => quorum(simulator, pace).await,
            Walkthrough::Failover => failover(simulator, pace).await,
            Walkthrough::Workload => workload(simulator, pace).await,
        }
    }
}

/// First key that hashes into `partition`
fn key_in_partition(cluster: &ClusterCoordinator, partition: usize) -> Option<String> {
    (0..100_000)
        .map(|i| format!("user{}", i))
        .find(|key| cluster.partition_for_key(key) == Some(partition))
}

/// What each replica of `key` holds right now, in rank order
fn replica_values(cluster: &ClusterCoordinator, key: &str) -> String {
    cluster
        .replica_set(key)
        .iter()
        .map(|id| {
            let value = cluster
                .registry()
                .get(id)
                .and_then(|node| node.store().get(key))
                .unwrap_or_else(|| "-".to_string());
            format!("{}={}", id, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_write(key: &str, result: &Result<WriteOutcome>) -> String {
    match result {
        Ok(outcome) => format!("PUT {} {} [COMMIT]", key, outcome),
        Err(ClusterError::QuorumFailure(outcome)) => format!("PUT {} {} [FAIL]", key, outcome),
        Err(e) => format!("PUT {} failed: {}", key, e),
    }
}

fn describe_read(key: &str, result: &Result<String>) -> String {
    match result {
        Ok(value) => format!("GET {} -> {}", key, value),
        Err(_) => format!("GET {} -> [NOT FOUND]", key),
    }
}

fn describe_stats(label: &str, stats: &WorkloadStats) -> String {
    format!(
        "{}: {}/{} writes committed ({:.0}%), {}/{} reads found",
        label,
        stats.writes_committed,
        stats.writes(),
        stats.commit_rate() * 100.0,
        stats.reads_found,
        stats.reads(),
    )
}

/// Walk one key through commit, failed quorum, stale read and node join
async fn quorum(simulator: &mut Simulator, pace: Duration) -> Result<Vec<String>> {
    let mut log = Vec::new();
    log.push("=== Quorum Walkthrough ===".to_string());

    let cluster = &mut simulator.cluster;
    let partitions = cluster.partition_table().len();
    if partitions == 0 {
        return Err(ClusterError::NoReplicaSet);
    }
    let target = 2.min(partitions - 1);
    let key = key_in_partition(cluster, target).ok_or(ClusterError::NoReplicaSet)?;
    let placement = cluster.placement_of(&key).ok_or(ClusterError::NoReplicaSet)?;
    let leader = placement.leader().cloned().ok_or(ClusterError::NoReplicaSet)?;

    log.push(format!("1. Key {} maps to {}", key, placement));
    tokio::time::sleep(pace).await;

    let result = cluster.put(&key, "v1");
    log.push(format!("2. All nodes up: {}", describe_write(&key, &result)));
    log.push(format!("   replicas: {}", replica_values(cluster, &key)));
    tokio::time::sleep(pace).await;

    cluster.set_liveness(&leader, false)?;
    log.push(format!("3. Leader {} goes DOWN", leader));
    let result = cluster.put(&key, "v2");
    log.push(format!("   {}", describe_write(&key, &result)));
    log.push(format!("   replicas: {}", replica_values(cluster, &key)));
    if result.is_err() {
        log.push("   the write stays on the replicas that acknowledged it".to_string());
    }
    tokio::time::sleep(pace).await;

    let read = cluster.get(&key);
    log.push(format!("4. With the leader down: {}", describe_read(&key, &read)));
    tokio::time::sleep(pace).await;

    cluster.set_liveness(&leader, true)?;
    let read = cluster.get(&key);
    log.push(format!(
        "5. Leader {} back UP: {}",
        leader,
        describe_read(&key, &read)
    ));
    log.push("   reads prefer the leader even when its copy is stale".to_string());
    tokio::time::sleep(pace).await;

    let new_node = format!("Node{}", cluster.registry().len());
    cluster.add_node(&new_node)?;
    let after = cluster.placement_of(&key).ok_or(ClusterError::NoReplicaSet)?;
    log.push(format!("6. Added {}; key {} still maps to {}", new_node, key, after));
    let report = cluster.cluster_report();
    if let Some(assignment) = report.nodes.iter().find(|n| n.id == new_node) {
        log.push(format!("   {}", assignment));
    }
    log.push("   run INIT to rebuild the table and include the new node".to_string());

    Ok(log)
}

/// Seed keys, then take leaders down one at a time
async fn failover(simulator: &mut Simulator, pace: Duration) -> Result<Vec<String>> {
    const KEYS: usize = 20;

    let mut log = Vec::new();
    log.push("=== Failover Walkthrough ===".to_string());

    let cluster = &mut simulator.cluster;
    let mut committed = 0;
    for i in 0..KEYS {
        if cluster.put(&workload_key(i), &format!("seed{}", i)).is_ok() {
            committed += 1;
        }
    }
    log.push(format!("Seeded {}/{} keys with all nodes up", committed, KEYS));
    tokio::time::sleep(pace).await;

    let roster = cluster.registry().ids();
    for id in roster {
        cluster.set_liveness(&id, false)?;
        let readable = (0..KEYS)
            .filter(|&i| cluster.get(&workload_key(i)).is_ok())
            .count();
        let writable = (0..KEYS)
            .filter(|&i| cluster.put(&workload_key(i), &format!("after-{}", id)).is_ok())
            .count();
        log.push(format!(
            "{} DOWN ({}/{} up): {}/{} keys readable, {}/{} writes committed",
            id,
            cluster.registry().up_count(),
            cluster.registry().len(),
            readable,
            KEYS,
            writable,
            KEYS
        ));
        tokio::time::sleep(pace).await;
    }

    let recovered = simulator.bring_all_up()?;
    let readable = (0..KEYS)
        .filter(|&i| simulator.cluster.get(&workload_key(i)).is_ok())
        .count();
    log.push(format!(
        "Brought {} nodes back UP: {}/{} keys readable",
        recovered, readable, KEYS
    ));

    Ok(log)
}

/// Random traffic across healthy, degraded and recovered phases
async fn workload(simulator: &mut Simulator, pace: Duration) -> Result<Vec<String>> {
    const OPS: usize = 200;
    const WRITE_RATIO: f64 = 0.7;

    let mut log = Vec::new();
    log.push("=== Workload Walkthrough ===".to_string());

    let stats = simulator.run_workload(OPS, WRITE_RATIO);
    log.push(describe_stats("All nodes up", &stats));
    tokio::time::sleep(pace).await;

    for round in 1..=2 {
        let victims = simulator.run_failure_scenario(&FailureScenario::SingleNode)?;
        if victims.is_empty() {
            break;
        }
        let status = simulator.status();
        log.push(format!(
            "{} DOWN: {}/{} partitions writable ({})",
            victims.join(", "),
            status.writable_partitions,
            status.partitions,
            status.availability_description()
        ));
        let stats = simulator.run_workload(OPS, WRITE_RATIO);
        log.push(describe_stats(&format!("After failure {}", round), &stats));
        tokio::time::sleep(pace).await;
    }

    let recovered = simulator.bring_all_up()?;
    log.push(format!("Brought {} nodes back UP", recovered));
    let stats = simulator.run_workload(OPS, WRITE_RATIO);
    log.push(describe_stats("Recovered", &stats));

    log.push(describe_stats("Total", simulator.stats()));
    Ok(log)
}
