//! Line-oriented operator shell
//!
//! One command per line, case-insensitive command word, whitespace separated
//! arguments. Bad input produces an `(error)` line and the shell keeps going.

use crate::cluster::{ClusterCoordinator, WriteOutcome};
use crate::error::ClusterError;
use crate::partition::MAX_PARTITIONS;
use std::io::{self, Write};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const BANNER: &str = "Partitioned KV cluster shell";

pub const USAGE: &str = "Commands:
  PUT <Key> <Value>
  GET <Key>
  DEL <Key>
  PLACE <Key>
  PARTITIONS
  NODES
  DOWN <Node>
  UP <Node>
  SHOWCLUSTER
  ADDNODE <Node>
  INIT <Partitions>
  HELP
  Q";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Place { key: String },
    Partitions,
    Nodes,
    Down { node: String },
    Up { node: String },
    ShowCluster,
    AddNode { node: String },
    Init { partitions: usize },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command {0}")]
    Unknown(String),

    #[error("{command} requires {usage}")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },

    #[error("invalid partition count {0:?}")]
    InvalidNumber(String),
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        let arg = |index: usize, command: &'static str, usage: &'static str| {
            tokens
                .get(index)
                .map(|s| s.to_string())
                .ok_or(CommandError::Usage { command, usage })
        };

        let command = match first.to_ascii_uppercase().as_str() {
            "PUT" => Command::Put {
                key: arg(1, "PUT", "<Key> <Value>")?,
                value: arg(2, "PUT", "<Key> <Value>")?,
            },
            "GET" => Command::Get {
                key: arg(1, "GET", "<Key>")?,
            },
            "DEL" => Command::Delete {
                key: arg(1, "DEL", "<Key>")?,
            },
            "PLACE" => Command::Place {
                key: arg(1, "PLACE", "<Key>")?,
            },
            "PARTITIONS" => Command::Partitions,
            "NODES" => Command::Nodes,
            "DOWN" => Command::Down {
                node: arg(1, "DOWN", "<Node>")?,
            },
            "UP" => Command::Up {
                node: arg(1, "UP", "<Node>")?,
            },
            "SHOWCLUSTER" => Command::ShowCluster,
            "ADDNODE" => Command::AddNode {
                node: arg(1, "ADDNODE", "<Node>")?,
            },
            "INIT" => {
                let raw = arg(1, "INIT", "<Partitions>")?;
                let partitions = raw
                    .parse()
                    .ok()
                    .filter(|&n: &usize| n <= MAX_PARTITIONS)
                    .ok_or_else(|| CommandError::InvalidNumber(raw.clone()))?;
                Command::Init { partitions }
            }
            "HELP" => Command::Help,
            "Q" | "QUIT" => Command::Quit,
            _ => return Err(CommandError::Unknown(first.to_string())),
        };
        Ok(Some(command))
    }
}

/// Output of one command
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Drives a cluster from operator commands
pub struct Shell {
    cluster: ClusterCoordinator,
}

impl Shell {
    pub fn new(cluster: ClusterCoordinator) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &ClusterCoordinator {
        &self.cluster
    }

    pub fn cluster_mut(&mut self) -> &mut ClusterCoordinator {
        &mut self.cluster
    }

    /// Parse and run one line
    pub fn handle_line(&mut self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Reply::default(),
            Err(e) => {
                let mut reply = Reply::default();
                reply.push(format!("(error) {}", e));
                reply
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Reply {
        let mut reply = Reply::default();
        match command {
            Command::Put { key, value } => {
                self.trace_placement(&key, &mut reply);
                let result = self.cluster.put(&key, &value);
                let ok = write_result("PUT", &key, result, &mut reply);
                reply.push(if ok { "PUT OK" } else { "PUT FAILED" });
            }
            Command::Get { key } => {
                self.trace_placement(&key, &mut reply);
                match self.cluster.get(&key) {
                    Ok(value) => reply.push(format!("{} -> {}", key, value)),
                    Err(_) => reply.push(format!("{} -> [NOT FOUND]", key)),
                }
            }
            Command::Delete { key } => {
                self.trace_placement(&key, &mut reply);
                let result = self.cluster.delete(&key);
                let ok = write_result("DEL", &key, result, &mut reply);
                reply.push(if ok { "DEL OK" } else { "DEL FAILED" });
            }
            Command::Place { key } => self.trace_placement(&key, &mut reply),
            Command::Partitions => {
                reply.push("Partitions (partition_id : leader, replicas...)");
                for placement in self.cluster.list_partitions() {
                    let replicas: Vec<String> = placement
                        .ranked()
                        .map(|(role, id)| format!("({}){}", role.short(), id))
                        .collect();
                    reply.push(format!("{:>3} : {}", placement.partition, replicas.join(", ")));
                }
            }
            Command::Nodes => {
                reply.push("Nodes:");
                for status in self.cluster.list_nodes() {
                    reply.push(format!("  {}", status));
                }
            }
            Command::Down { node } => self.toggle(&node, false, &mut reply),
            Command::Up { node } => self.toggle(&node, true, &mut reply),
            Command::ShowCluster => {
                let report = self.cluster.cluster_report().to_string();
                reply.lines.extend(report.lines().map(str::to_string));
            }
            Command::AddNode { node } => match self.cluster.add_node(&node) {
                Ok(()) => reply.push(format!(
                    "[Cluster] Added node {} (INIT to assign partitions)",
                    node
                )),
                Err(e) => reply.push(status_line(&e)),
            },
            Command::Init { partitions } => match self.cluster.init_partitions(partitions) {
                Ok(()) => reply.push(format!(
                    "[Cluster] Initialized {} partitions with RF={}",
                    self.cluster.partition_table().len(),
                    self.cluster.config().replication_factor
                )),
                Err(e) => reply.push(status_line(&e)),
            },
            Command::Help => reply.lines.extend(USAGE.lines().map(str::to_string)),
            Command::Quit => {
                reply.push("Bye");
                reply.quit = true;
            }
        }
        reply
    }

    fn trace_placement(&self, key: &str, reply: &mut Reply) {
        match self.cluster.placement_of(key) {
            Some(placement) => reply.push(format!("[Placement] key={} -> {}", key, placement)),
            None => reply.push(status_line(&ClusterError::NoReplicaSet)),
        }
    }

    fn toggle(&mut self, node: &str, up: bool, reply: &mut Reply) {
        match self.cluster.set_liveness(node, up) {
            Ok(()) => reply.push(format!(
                "[Cluster] {} is now {}",
                node,
                if up { "UP" } else { "DOWN" }
            )),
            Err(e) => reply.push(status_line(&e)),
        }
    }
}

fn write_result(
    op: &str,
    key: &str,
    result: crate::Result<WriteOutcome>,
    reply: &mut Reply,
) -> bool {
    match result {
        Ok(outcome) => {
            reply.push(format!("[{}] key={} {} [COMMIT]", op, key, outcome));
            true
        }
        Err(ClusterError::QuorumFailure(outcome)) => {
            reply.push(format!("[{}] key={} {} [FAIL]", op, key, outcome));
            false
        }
        Err(e) => {
            reply.push(status_line(&e));
            false
        }
    }
}

fn status_line(error: &ClusterError) -> String {
    if error.is_warning() {
        format!("[Warn] {}", error)
    } else {
        format!("(error) {}", error)
    }
}

/// Read commands from stdin until `Q` or end of input
pub async fn run_repl(shell: &mut Shell) -> io::Result<()> {
    println!("\n{}", BANNER);
    println!("{}\n", USAGE);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let reply = shell.handle_line(&line);
        for line in &reply.lines {
            println!("{}", line);
        }
        if reply.quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClusterConfig;

    fn shell() -> Shell {
        let config = ClusterConfig::new(3, 2).in_memory();
        Shell::new(ClusterCoordinator::new(config).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("put k v").unwrap(),
            Some(Command::Put {
                key: "k".into(),
                value: "v".into()
            })
        );
        assert_eq!(
            Command::parse("  GET   k ").unwrap(),
            Some(Command::Get { key: "k".into() })
        );
        assert_eq!(Command::parse("showcluster").unwrap(), Some(Command::ShowCluster));
        assert_eq!(
            Command::parse("INIT 12").unwrap(),
            Some(Command::Init { partitions: 12 })
        );
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse("PUT k"),
            Err(CommandError::Usage {
                command: "PUT",
                usage: "<Key> <Value>"
            })
        );
        assert!(matches!(
            Command::parse("FROB x"),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            Command::parse("INIT many"),
            Err(CommandError::InvalidNumber(_))
        ));
        assert!(matches!(
            Command::parse("INIT 100000000000"),
            Err(CommandError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_put_get_del_flow() {
        let mut shell = shell();

        let reply = shell.handle_line("PUT user alice");
        assert!(reply.lines[0].starts_with("[Placement] key=user -> partition="));
        assert!(reply.lines[1].ends_with("[COMMIT]"));
        assert_eq!(reply.lines.last().unwrap(), "PUT OK");

        let reply = shell.handle_line("GET user");
        assert_eq!(reply.lines.last().unwrap(), "user -> alice");

        let reply = shell.handle_line("DEL user");
        assert_eq!(reply.lines.last().unwrap(), "DEL OK");

        let reply = shell.handle_line("GET user");
        assert_eq!(reply.lines.last().unwrap(), "user -> [NOT FOUND]");
    }

    #[test]
    fn test_failed_write_reported() {
        let mut shell = shell();
        let leader = shell.cluster().replica_set("k")[0].clone();
        shell.handle_line(&format!("DOWN {}", leader));

        let reply = shell.handle_line("PUT k v");
        assert!(reply.lines[1].contains("acks=1"));
        assert!(reply.lines[1].ends_with("[FAIL]"));
        assert_eq!(reply.lines.last().unwrap(), "PUT FAILED");
    }

    #[test]
    fn test_place_shows_replicas() {
        let mut shell = shell();
        let expected = shell.cluster().placement_of("user").unwrap();

        let reply = shell.handle_line("place user");
        assert_eq!(
            reply.lines,
            vec![format!("[Placement] key=user -> {}", expected)]
        );
        assert!(reply.lines[0].contains("(Leader) Node"));
        assert_eq!(shell.cluster().registry().up_count(), 3);
    }

    #[test]
    fn test_down_then_up_restores_writes() {
        let mut shell = shell();
        let leader = shell.cluster().replica_set("k")[0].clone();

        let reply = shell.handle_line(&format!("DOWN {}", leader));
        assert_eq!(reply.lines, vec![format!("[Cluster] {} is now DOWN", leader)]);
        assert_eq!(shell.handle_line("PUT k v").lines.last().unwrap(), "PUT FAILED");

        let reply = shell.handle_line(&format!("UP {}", leader));
        assert_eq!(reply.lines, vec![format!("[Cluster] {} is now UP", leader)]);
        assert!(shell.cluster().is_up(&leader));
        assert_eq!(shell.handle_line("PUT k v").lines.last().unwrap(), "PUT OK");
    }

    #[test]
    fn test_errors_do_not_quit() {
        let mut shell = shell();

        let reply = shell.handle_line("BOGUS");
        assert_eq!(reply.lines, vec!["(error) Unknown command BOGUS"]);
        assert!(!reply.quit);

        let reply = shell.handle_line("DOWN");
        assert_eq!(reply.lines, vec!["(error) DOWN requires <Node>"]);

        let reply = shell.handle_line("UP Node9");
        assert_eq!(reply.lines, vec!["[Warn] unknown node Node9"]);

        let reply = shell.handle_line("ADDNODE Node0");
        assert_eq!(reply.lines, vec!["[Warn] node Node0 already exists"]);
    }

    #[test]
    fn test_listings() {
        let mut shell = shell();
        shell.handle_line("DOWN Node1");

        let reply = shell.handle_line("PARTITIONS");
        assert_eq!(reply.lines.len(), 7);
        assert_eq!(reply.lines[1], "  0 : (L)Node0, (R)Node1");
        assert_eq!(reply.lines[3], "  2 : (L)Node2, (R)Node0");

        let reply = shell.handle_line("NODES");
        assert_eq!(reply.lines[2], "  Node1 [DOWN] keys=0");

        let reply = shell.handle_line("SHOWCLUSTER");
        assert_eq!(reply.lines.len(), 4);
        assert!(reply.lines[1].starts_with("Node0 [UP] has partitions: P0 (Leader)"));
    }

    #[test]
    fn test_addnode_and_init() {
        let mut shell = shell();
        shell.handle_line("ADDNODE Node3");

        let reply = shell.handle_line("SHOWCLUSTER");
        assert_eq!(reply.lines[4], "Node3 [UP] has partitions: (none)");

        let reply = shell.handle_line("INIT 8");
        assert_eq!(reply.lines, vec!["[Cluster] Initialized 8 partitions with RF=2"]);
        let reply = shell.handle_line("PARTITIONS");
        assert_eq!(reply.lines[4], "  3 : (L)Node3, (R)Node0");
    }

    #[test]
    fn test_quit() {
        let mut shell = shell();
        let reply = shell.handle_line("Q");
        assert!(reply.quit);
        assert_eq!(reply.lines, vec!["Bye"]);
    }
}
