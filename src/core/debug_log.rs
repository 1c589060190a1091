//! Bounded diagnostic log
//!
//! A fixed-capacity ring buffer of timestamped events kept for support and
//! troubleshooting. The controller is the only writer; the UI reads it to
//! build the diagnostics panel. Entries are also mirrored to the `log` facade.
//!
//! The buffer never influences control flow.

use chrono::Local;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::{self, Display};

/// Default number of retained entries
pub const DEFAULT_CAPACITY: usize = 20;

/// Severity of a debug log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Success,
}

impl Severity {
    /// Short tag used when rendering entries
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Success => "OK",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One timestamped diagnostic event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugLogEntry {
    /// Local wall-clock time (`HH:MM:SS`)
    pub time: String,
    /// Event text
    pub message: String,
    /// Severity
    pub severity: Severity,
}

impl Display for DebugLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:<5} {}", self.time, self.severity.tag(), self.message)
    }
}

/// Fixed-capacity FIFO ring buffer of [`DebugLogEntry`]
#[derive(Debug, Clone)]
pub struct DebugLog {
    entries: VecDeque<DebugLogEntry>,
    capacity: usize,
}

impl DebugLog {
    /// Create a log with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a log with a specific capacity (at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one when full
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();

        match severity {
            Severity::Info | Severity::Success => info!("[scanner] {}", message),
            Severity::Warn => warn!("[scanner] {}", message),
            Severity::Error => error!("[scanner] {}", message),
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DebugLogEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            message,
            severity,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    /// Entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &DebugLogEntry> {
        self.entries.iter()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&DebugLogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Render every entry as one line, oldest first
    pub fn render_lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.to_string()).collect()
    }

    /// Export the entries as pretty JSON (for support tickets)
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<&DebugLogEntry> = self.entries.iter().collect();
        serde_json::to_string_pretty(&entries)
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new()
    }
}
