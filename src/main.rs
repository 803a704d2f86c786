//! Partitioned KV - Main Application
//!
//! Runs a simulated cluster of key-value nodes with hash partitioning,
//! leader/replica placement and majority-quorum writes. Drive it from the
//! command shell, the live dashboard, or one of the scripted walkthroughs.

use clap::Parser;
use partitioned_kv::cli::{self, Shell};
use partitioned_kv::simulation::Simulator;
use partitioned_kv::ui::Walkthrough;
use partitioned_kv::{ClusterConfig, ClusterCoordinator, TerminalUI};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(
    name = "partitioned-kv",
    version,
    about = "Partitioned, replicated key-value cluster with quorum writes"
)]
struct Args {
    /// Number of storage nodes
    #[arg(short, long, default_value_t = 3)]
    nodes: usize,

    /// Replicas per partition
    #[arg(short, long, default_value_t = 2)]
    replication: usize,

    /// Number of partitions (defaults to twice the node count)
    #[arg(short, long)]
    partitions: Option<usize>,

    /// Directory holding the per-node append logs
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Keep node data in memory only
    #[arg(long)]
    in_memory: bool,

    /// Run a scripted walkthrough instead of the shell (always in memory)
    #[arg(long, value_enum)]
    demo: Option<Walkthrough>,

    /// Open the live dashboard instead of the shell
    #[arg(long, conflicts_with = "demo")]
    tui: bool,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn cluster_config(&self) -> ClusterConfig {
        let mut config = ClusterConfig::new(self.nodes, self.replication)
            .with_data_dir(self.data_dir.clone());
        if let Some(partitions) = self.partitions {
            config = config.with_partitions(partitions);
        }
        // walkthroughs must not leave their demo values in --data-dir
        if self.in_memory || self.demo.is_some() {
            config = config.in_memory();
        }
        config
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    // the dashboard owns the terminal, so it keeps its own activity log
    if !args.tui {
        init_tracing(args.verbose);
    }

    let config = args.cluster_config();
    let cluster = ClusterCoordinator::new(config)?;

    if args.tui {
        run_dashboard(cluster).await
    } else if let Some(walkthrough) = args.demo {
        run_walkthrough(cluster, walkthrough).await
    } else {
        let mut shell = Shell::new(cluster);
        cli::run_repl(&mut shell).await?;
        Ok(())
    }
}

async fn run_dashboard(cluster: ClusterCoordinator) -> Result<(), BoxError> {
    let simulator = Simulator::new(cluster);
    let mut ui = TerminalUI::new()?;
    ui.run(simulator).await?;
    Ok(())
}

async fn run_walkthrough(
    cluster: ClusterCoordinator,
    walkthrough: Walkthrough,
) -> Result<(), BoxError> {
    let mut simulator = Simulator::new(cluster);
    let logs = walkthrough
        .run(&mut simulator, Duration::from_millis(300))
        .await?;

    for line in logs {
        println!("{}", line);
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use partitioned_kv::StorageMode;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("partitioned-kv").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_shell_defaults_to_durable_storage() {
        let config = parse(&["-n", "4", "-d", "/tmp/kv"]).cluster_config();
        assert_eq!(config.storage, StorageMode::Durable);
        assert_eq!(config.partitions, 8);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/kv"));
    }

    #[test]
    fn test_walkthroughs_run_in_memory() {
        let config = parse(&["--demo", "quorum"]).cluster_config();
        assert_eq!(config.storage, StorageMode::Memory);
    }

    #[test]
    fn test_explicit_partition_count() {
        let config = parse(&["-p", "12", "--in-memory"]).cluster_config();
        assert_eq!(config.partitions, 12);
        assert_eq!(config.storage, StorageMode::Memory);
    }
}
