//! Progress and console output utilities for the CLI
//!
//! Key features:
//! - A spinner that follows controller state while actions are in flight
//! - Consistent symbols for success, info, warning and error lines
//! - The dual writer used for console plus file logging

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

use crate::ui::controller::ScannerState;

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the spinner style for in-flight scanner actions
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a section divider
pub fn print_divider() {
    println!();
    println!("{}", "─".repeat(60));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Spinner for scanner actions
// ============================================================================

/// Spinner shown while a controller action is running
pub struct ScannerSpinner {
    spinner: ProgressBar,
}

impl ScannerSpinner {
    pub fn new(action: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(action.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    /// Show the state the controller is currently in
    pub fn set_state(&self, state: ScannerState) {
        self.spinner.set_message(format!("{}...", state));
    }

    /// Print a line above the spinner without tearing it
    pub fn println(&self, msg: &str) {
        self.spinner.println(msg);
    }

    /// Stop the spinner and leave a final line
    pub fn finish(&self, state: ScannerState) {
        let symbol = match state {
            ScannerState::Scanning => "✓",
            ScannerState::Error => "✗",
            _ => "•",
        };
        self.spinner
            .finish_with_message(format!("{} {}", symbol, state));
    }

    pub fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else if secs >= 1 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================
