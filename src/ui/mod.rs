//! Terminal user interface module
//!
//! A live dashboard over a running cluster (node liveness, partition table,
//! quorum decisions) plus scripted walkthroughs that print their progress.

pub mod demo;
pub mod terminal;

pub use demo::Walkthrough;
pub use terminal::TerminalUI;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::Color;
use std::time::{Duration, Instant};

/// Events that can be triggered by user input
#[derive(Debug, Clone, PartialEq)]
pub enum UIEvent {
    /// User wants to quit the application
    Quit,
    /// Flip liveness of the node at this roster position
    ToggleNode(usize),
    /// Write a fresh value to a random workload key
    RandomWrite,
    /// Read a random workload key
    RandomRead,
    /// Take a random up node down
    FailRandomNode,
    /// Bring every node back up
    RecoverAllNodes,
    /// User wants to show help
    ShowHelp,
    /// User pressed an unrecognized key
    Unknown(KeyCode),
}

impl From<KeyEvent> for UIEvent {
    fn from(key_event: KeyEvent) -> Self {
        match key_event.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => UIEvent::Quit,
            KeyCode::Char(c @ '1'..='9') => UIEvent::ToggleNode(c as usize - '1' as usize),
            KeyCode::Char('w') | KeyCode::Char('W') => UIEvent::RandomWrite,
            KeyCode::Char('g') | KeyCode::Char('G') => UIEvent::RandomRead,
            KeyCode::Char('f') | KeyCode::Char('F') => UIEvent::FailRandomNode,
            KeyCode::Char('a') | KeyCode::Char('A') => UIEvent::RecoverAllNodes,
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => UIEvent::ShowHelp,
            KeyCode::Esc => UIEvent::Quit,
            other => UIEvent::Unknown(other),
        }
    }
}

/// Color scheme for the UI
#[derive(Debug, Clone, Copy)]
pub struct ColorScheme {
    pub up: Color,
    pub down: Color,
    pub text: Color,
    pub highlight: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            up: Color::Green,
            down: Color::Red,
            text: Color::White,
            highlight: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

/// Configuration for UI rendering
#[derive(Debug, Clone)]
pub struct UIConfig {
    /// Color scheme to use
    pub colors: ColorScheme,
    /// Update frequency in milliseconds
    pub update_interval_ms: u64,
    /// Maximum number of log entries to keep
    pub max_log_entries: usize,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colors: ColorScheme::default(),
            update_interval_ms: 100,
            max_log_entries: 100,
        }
    }
}

/// State of the UI application
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UIState {
    Running,
    /// Help overlay is shown
    Help,
    /// Application is shutting down
    Shutdown,
}

/// One line in the activity panel
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Time since the dashboard started
    pub at: Duration,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(started: Instant, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            at: started.elapsed(),
            level,
            message: message.into(),
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{:>4}.{}s {:<6} {}",
            self.at.as_secs(),
            self.at.subsec_millis() / 100,
            self.level.tag(),
            self.message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    fn tag(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
            LogLevel::Success => "ok",
        }
    }

    pub fn color(&self, colors: &ColorScheme) -> Color {
        match self {
            LogLevel::Info => colors.text,
            LogLevel::Warning => colors.warning,
            LogLevel::Error => colors.error,
            LogLevel::Success => colors.success,
        }
    }
}

/// Help text for the dashboard
pub const HELP_TEXT: &str = r#"
Partitioned KV Dashboard - Controls

Navigation:
  Q, Esc    - Quit
  H, F1     - Show/hide this help

Nodes:
  1-9       - Toggle UP/DOWN for node at that roster position
  F         - Take a random UP node down
  A         - Bring all nodes up

Data:
  W         - Write a random workload key
  G         - Read a random workload key

Partitions are red when their UP replicas no longer form a quorum.
Writes to those partitions fail but still land on the UP replicas.

Press any key to return to the dashboard.
"#;

/// Utility functions for UI rendering
pub mod utils {
    use ratatui::layout::{Constraint, Direction, Layout, Rect};

    /// Create a centered rectangle with given width and height
    pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length((area.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((area.height.saturating_sub(height)) / 2),
            ])
            .split(area);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length((area.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((area.width.saturating_sub(width)) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}
