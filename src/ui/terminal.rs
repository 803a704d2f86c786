//! Terminal UI implementation using ratatui
//!
//! Shows the roster with liveness, the partition table colored by whether
//! each partition can still reach write quorum, and a log of the requests
//! issued from the keyboard.

use crate::partition::{quorum_for, Role};
use crate::simulation::{FailureScenario, SimulationStatus, Simulator};
use crate::ui::{LogEntry, LogLevel, UIConfig, UIEvent, UIState, HELP_TEXT};
use crate::ClusterError;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Node row as drawn in the roster panel
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub id: String,
    pub up: bool,
    pub keys: usize,
    pub leads: usize,
    pub replicates: usize,
}

/// Partition row as drawn in the partition panel
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRow {
    pub partition: usize,
    /// Replica ids in rank order with their liveness
    pub replicas: Vec<(String, bool)>,
    pub writable: bool,
}

/// Everything one frame needs, captured from the simulator
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub nodes: Vec<NodeRow>,
    pub partitions: Vec<PartitionRow>,
    pub status: SimulationStatus,
}

impl DashboardView {
    pub fn capture(simulator: &Simulator) -> Self {
        let cluster = &simulator.cluster;
        let registry = cluster.registry();
        let report = cluster.cluster_report();

        let nodes = registry
            .list()
            .iter()
            .zip(report.nodes.iter())
            .map(|(node, assignment)| {
                let leads = assignment.leader_count();
                NodeRow {
                    id: node.id.clone(),
                    up: node.is_up(),
                    keys: node.key_count(),
                    leads,
                    replicates: assignment.partitions.len() - leads,
                }
            })
            .collect();

        let partitions = cluster
            .list_partitions()
            .into_iter()
            .map(|placement| {
                let replicas: Vec<(String, bool)> = placement
                    .replicas
                    .iter()
                    .map(|id| (id.clone(), registry.is_up(id)))
                    .collect();
                let up = replicas.iter().filter(|(_, up)| *up).count();
                PartitionRow {
                    partition: placement.partition,
                    writable: up >= quorum_for(replicas.len()),
                    replicas,
                }
            })
            .collect();

        Self {
            nodes,
            partitions,
            status: simulator.status(),
        }
    }
}

/// Main terminal UI coordinator
pub struct TerminalUI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    config: UIConfig,
    state: UIState,
    log_entries: Vec<LogEntry>,
    started: Instant,
    last_update: Instant,
    /// Outcome of the most recent request, shown in the status bar
    last_request: Option<String>,
}

impl TerminalUI {
    /// Create a new terminal UI
    pub fn new() -> io::Result<Self> {
        let stdout = io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            config: UIConfig::default(),
            state: UIState::Running,
            log_entries: Vec::new(),
            started: Instant::now(),
            last_update: Instant::now(),
            last_request: None,
        })
    }

    /// Run the dashboard until the user quits
    pub async fn run(&mut self, mut simulator: Simulator) -> io::Result<()> {
        enable_raw_mode()?;
        execute!(self.terminal.backend_mut(), EnterAlternateScreen)?;

        let config = simulator.cluster.config();
        self.log_info(format!(
            "Cluster started: {} nodes, {} partitions, RF={}",
            config.nodes,
            simulator.cluster.partition_table().len(),
            config.replication_factor
        ));
        self.log_info("Press 'H' for help, '1'-'9' to toggle nodes, 'Q' to quit".to_string());

        let mut event_receiver = self.setup_event_handling();

        loop {
            while let Ok(event) = event_receiver.try_recv() {
                self.handle_event(event, &mut simulator);
                if self.state == UIState::Shutdown {
                    break;
                }
            }

            if self.state == UIState::Shutdown {
                break;
            }

            if self.last_update.elapsed() >= Duration::from_millis(self.config.update_interval_ms) {
                let view = DashboardView::capture(&simulator);
                self.draw(&view)?;
                self.last_update = Instant::now();
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        self.cleanup()
    }

    fn handle_event(&mut self, event: UIEvent, simulator: &mut Simulator) {
        if self.state == UIState::Help {
            // any key closes the help overlay
            self.state = UIState::Running;
            return;
        }

        match event {
            UIEvent::Quit => self.state = UIState::Shutdown,
            UIEvent::ShowHelp => self.state = UIState::Help,
            UIEvent::ToggleNode(position) => {
                let Some(node) = simulator.cluster.registry().list().get(position) else {
                    self.log_warn(format!("No node at position {}", position + 1));
                    return;
                };
                let (id, up) = (node.id.clone(), node.is_up());
                match simulator.cluster.set_liveness(&id, !up) {
                    Ok(()) if up => self.log_warn(format!("{} is now DOWN", id)),
                    Ok(()) => self.log_success(format!("{} is now UP", id)),
                    Err(e) => self.log_error(e.to_string()),
                }
            }
            UIEvent::RandomWrite => {
                let (key, result) = simulator.random_write();
                let message = match &result {
                    Ok(outcome) => format!("[PUT] key={} {} [COMMIT]", key, outcome),
                    Err(ClusterError::QuorumFailure(outcome)) => {
                        format!("[PUT] key={} {} [FAIL]", key, outcome)
                    }
                    Err(e) => format!("[PUT] key={} {}", key, e),
                };
                if result.is_ok() {
                    self.log_success(message.clone());
                } else {
                    self.log_error(message.clone());
                }
                self.last_request = Some(message);
            }
            UIEvent::RandomRead => {
                let (key, result) = simulator.random_read();
                let message = match result {
                    Ok(value) => format!("[GET] {} -> {}", key, value),
                    Err(_) => format!("[GET] {} -> [NOT FOUND]", key),
                };
                self.log_info(message.clone());
                self.last_request = Some(message);
            }
            UIEvent::FailRandomNode => {
                match simulator.run_failure_scenario(&FailureScenario::SingleNode) {
                    Ok(victims) if victims.is_empty() => {
                        self.log_warn("No UP nodes left to fail".to_string())
                    }
                    Ok(victims) => self.log_warn(format!("{} is now DOWN", victims.join(", "))),
                    Err(e) => self.log_error(format!("Failure injection failed: {}", e)),
                }
            }
            UIEvent::RecoverAllNodes => match simulator.bring_all_up() {
                Ok(0) => self.log_info("All nodes already UP".to_string()),
                Ok(count) => self.log_success(format!("Brought {} nodes UP", count)),
                Err(e) => self.log_error(format!("Recovery failed: {}", e)),
            },
            UIEvent::Unknown(_) => {}
        }
    }

    /// Forward key presses from a polling task
    fn setup_event_handling(&self) -> mpsc::UnboundedReceiver<UIEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                if let Ok(true) = event::poll(Duration::from_millis(50)) {
                    if let Ok(Event::Key(key)) = event::read() {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if tx.send(UIEvent::from(key)).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        rx
    }

    fn draw(&mut self, view: &DashboardView) -> io::Result<()> {
        let state = self.state;
        let config = self.config.clone();
        let log_entries = self.log_entries.clone();
        let last_request = self.last_request.clone();

        self.terminal.draw(|f| match state {
            UIState::Help => Self::render_help_static(f, &config),
            _ => Self::render_main_static(f, view, &config, &log_entries, last_request.as_deref()),
        })?;
        Ok(())
    }

    fn render_main_static(
        f: &mut Frame,
        view: &DashboardView,
        config: &UIConfig,
        log_entries: &[LogEntry],
        last_request: Option<&str>,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(10),   // Nodes and partitions
                Constraint::Length(8), // Logs
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        Self::render_title_static(f, chunks[0], view, config);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
            .split(chunks[1]);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(main_chunks[0]);

        Self::render_nodes_static(f, left[0], view, config);
        Self::render_availability_static(f, left[1], &view.status, config);
        Self::render_partitions_static(f, main_chunks[1], view, config);
        Self::render_logs_static(f, chunks[2], log_entries, config);
        Self::render_status_bar_static(f, chunks[3], &view.status, config, last_request);
    }

    fn render_title_static(f: &mut Frame, area: Rect, view: &DashboardView, config: &UIConfig) {
        let title = format!(
            "Partitioned KV Cluster - {} nodes, {} partitions, RF={}",
            view.status.total_nodes, view.status.partitions, view.status.replication_factor
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(config.colors.highlight));

        let paragraph = Paragraph::new(title)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD));

        f.render_widget(paragraph, area);
    }

    fn render_nodes_static(f: &mut Frame, area: Rect, view: &DashboardView, config: &UIConfig) {
        let block = Block::default().title("Nodes").borders(Borders::ALL);

        let items: Vec<ListItem> = view
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let (symbol, label, color) = if node.up {
                    ("●", "UP", config.colors.up)
                } else {
                    ("○", "DOWN", config.colors.down)
                };
                let position = if i < 9 {
                    format!("{} ", i + 1)
                } else {
                    "  ".to_string()
                };
                ListItem::new(format!(
                    "{}{} {:<8} {:<4} keys={:<4} L={} R={}",
                    position, symbol, node.id, label, node.keys, node.leads, node.replicates
                ))
                .style(Style::default().fg(color))
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }

    fn render_availability_static(
        f: &mut Frame,
        area: Rect,
        status: &SimulationStatus,
        config: &UIConfig,
    ) {
        let ratio = status.availability_percentage() / 100.0;
        let gauge = Gauge::default()
            .block(Block::default().title("Writable").borders(Borders::ALL))
            .gauge_style(Style::default().fg(if ratio >= 1.0 {
                config.colors.up
            } else if ratio > 0.0 {
                config.colors.warning
            } else {
                config.colors.down
            }))
            .label(format!(
                "{}/{} partitions",
                status.writable_partitions, status.partitions
            ))
            .ratio(ratio.clamp(0.0, 1.0));

        f.render_widget(gauge, area);
    }

    fn render_partitions_static(
        f: &mut Frame,
        area: Rect,
        view: &DashboardView,
        config: &UIConfig,
    ) {
        let block = Block::default().title("Partitions").borders(Borders::ALL);

        let items: Vec<ListItem> = view
            .partitions
            .iter()
            .map(|row| {
                let header_color = if row.writable {
                    config.colors.text
                } else {
                    config.colors.error
                };
                let mut spans = vec![Span::styled(
                    format!("P{:<3}", row.partition),
                    Style::default().fg(header_color).add_modifier(Modifier::BOLD),
                )];
                for (rank, (id, up)) in row.replicas.iter().enumerate() {
                    let role = Role::for_rank(rank);
                    let mut style = Style::default().fg(if *up {
                        config.colors.up
                    } else {
                        config.colors.down
                    });
                    if role == Role::Leader {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled(format!("({}){}", role.short(), id), style));
                }
                if !row.writable {
                    spans.push(Span::styled(
                        "  no quorum",
                        Style::default().fg(config.colors.error),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }

    fn render_logs_static(f: &mut Frame, area: Rect, log_entries: &[LogEntry], config: &UIConfig) {
        let block = Block::default().title("Activity Log").borders(Borders::ALL);

        let items: Vec<ListItem> = log_entries
            .iter()
            .rev()
            .take(area.height.saturating_sub(2) as usize)
            .map(|entry| {
                let color = entry.level.color(&config.colors);
                ListItem::new(entry.format()).style(Style::default().fg(color))
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }

    fn render_status_bar_static(
        f: &mut Frame,
        area: Rect,
        status: &SimulationStatus,
        config: &UIConfig,
        last_request: Option<&str>,
    ) {
        let status_text = format!(
            "Up: {}/{} | {} | Writes committed: {}/{} | {} | 'H' for help",
            status.up_nodes,
            status.total_nodes,
            status.availability_description(),
            status.stats.writes_committed,
            status.stats.writes(),
            last_request.unwrap_or("no requests yet"),
        );

        let paragraph = Paragraph::new(status_text)
            .style(Style::default().fg(config.colors.text))
            .alignment(Alignment::Center);

        f.render_widget(paragraph, area);
    }

    fn render_help_static(f: &mut Frame, config: &UIConfig) {
        let area = f.size();
        f.render_widget(Clear, area);

        let popup_area = crate::ui::utils::centered_rect(64, 26, area);

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .style(Style::default().fg(config.colors.highlight));

        let paragraph = Paragraph::new(HELP_TEXT)
            .block(block)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(config.colors.text));

        f.render_widget(paragraph, popup_area);
    }

    fn log(&mut self, level: LogLevel, message: String) {
        self.log_entries.push(LogEntry::new(self.started, level, message));
        if self.log_entries.len() > self.config.max_log_entries {
            self.log_entries.remove(0);
        }
    }

    fn log_info(&mut self, message: String) {
        self.log(LogLevel::Info, message);
    }

    fn log_warn(&mut self, message: String) {
        self.log(LogLevel::Warning, message);
    }

    fn log_error(&mut self, message: String) {
        self.log(LogLevel::Error, message);
    }

    fn log_success(&mut self, message: String) {
        self.log(LogLevel::Success, message);
    }

    /// Restore the terminal
    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusterConfig, ClusterCoordinator};

    fn simulator() -> Simulator {
        let cluster = ClusterCoordinator::new(ClusterConfig::new(3, 2).in_memory()).unwrap();
        Simulator::with_seed(cluster, 7)
    }

    #[test]
    fn test_view_all_up() {
        let sim = simulator();
        let view = DashboardView::capture(&sim);

        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.partitions.len(), 6);
        assert!(view.nodes.iter().all(|n| n.up && n.leads == 2 && n.replicates == 2));
        assert!(view.partitions.iter().all(|p| p.writable));
        assert_eq!(
            view.partitions[2].replicas,
            vec![("Node2".to_string(), true), ("Node0".to_string(), true)]
        );
    }

    #[test]
    fn test_view_marks_lost_quorum() {
        let mut sim = simulator();
        sim.cluster.set_liveness("Node0", false).unwrap();
        let view = DashboardView::capture(&sim);

        assert!(!view.nodes[0].up);
        let writable: Vec<usize> = view
            .partitions
            .iter()
            .filter(|p| p.writable)
            .map(|p| p.partition)
            .collect();
        assert_eq!(writable, vec![1, 4]);
        assert_eq!(view.status.writable_partitions, 2);
    }

    #[test]
    fn test_view_counts_keys() {
        let mut sim = simulator();
        sim.set_key_space(1);
        sim.random_write().1.unwrap();

        let view = DashboardView::capture(&sim);
        let total: usize = view.nodes.iter().map(|n| n.keys).sum();
        assert_eq!(total, 2);
    }
}
