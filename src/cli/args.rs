//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::messages::Language;

/// Camera-based QR acquisition with permission handling, camera ranking and manual fallback
#[derive(Parser, Debug)]
#[command(name = "qr-scanner")]
#[command(author = "Vihaan Reddy M")]
#[command(version = "1.0.0")]
#[command(about = "Drive the QR camera scanner against a simulated platform", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// UI language: en or th (overrides config)
    #[arg(long, global = true)]
    pub language: Option<Language>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scanner against a simulated platform
    ///
    /// Without --interactive the scenario's scripted actions are replayed.
    /// With --interactive the scanner is initialized and you choose what to
    /// do next (retry, switch camera, manual entry, simulate a decode, close).
    Simulate {
        /// Scenario whose simulated platform is used
        #[arg(short, long, default_value = "happy_path")]
        scenario: String,

        /// Choose actions from a menu instead of replaying the script
        #[arg(short, long)]
        interactive: bool,

        /// Print the final status and debug log as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank camera labels the way camera selection does
    Rank {
        /// Device labels in enumeration order
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Print the error message and recovery table
    Messages,

    /// Submit a code through the manual-entry path
    Manual {
        /// Code to submit (prompts when omitted)
        code: Option<String>,
    },

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\qr_camera_scanner\config.toml
    /// - Linux/macOS: ~/.config/qr_camera_scanner/config.toml
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,

    /// Run scanner scenarios against the simulated platform
    ///
    /// Each scenario replays a scripted session (initialize, decode, retry,
    /// switch camera, manual entry, close) and checks the outcome.
    Test {
        #[command(subcommand)]
        test_command: TestCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Run all available test scenarios
    RunAll {
        /// Stop on first failure
        #[arg(long)]
        fail_fast: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the end-to-end scenarios only (fast)
    RunQuick {
        /// Verbose output showing detailed results
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run tests filtered by tag
    RunTag {
        /// Tag to filter scenarios by
        /// Available tags: e2e, permission, capability, device, mount, engine, manual, teardown, switch
        tag: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run specific test scenarios by name
    Run {
        /// Scenario names to run (comma-separated or multiple values)
        #[arg(value_delimiter = ',')]
        scenarios: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all available test scenarios
    ListScenarios {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Show detailed information about each scenario
        #[arg(short, long)]
        detailed: bool,
    },

    /// List all available tags for filtering
    ListTags,

    /// Show information about a specific scenario
    Info {
        /// Name of the scenario to show info about
        name: String,
    },
}
