//! Test Database Module
//!
//! This module provides a testing framework for the QR scanner that exercises
//! the whole acquisition lifecycle without a browser, a camera, or a decoder.
//!
//! Note: Many functions in this module are intentionally kept for API completeness
//! even if not currently used by the CLI.

#![allow(dead_code)]

//!
//! # Features
//!
//! - **Mock Platform**: Simulated runtime with configurable cameras, permission
//!   outcomes, mount delays and engine failures
//! - **Test Scenarios**: Scripted user sessions with expected outcomes
//! - **Test Runner**: Replay scenarios against a fresh controller and report
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use qr_camera_scanner::testdb::{TestRunner, TestRunnerConfig};
//!
//! # async fn demo() {
//! // Run the end-to-end scenarios
//! let mut runner = TestRunner::new();
//! let summary = runner.run_quick().await;
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! // Run specific scenarios by name
//! let mut runner = TestRunner::with_config(TestRunnerConfig {
//!     verbose: true,
//!     ..Default::default()
//! });
//! let summary = runner.run_by_names(&["happy_path", "permission_denied"]).await;
//! # }
//! ```
//!
//! # Available Scenarios
//!
//! ## Acquisition
//! - `happy_path` - Rear camera selected, one decode delivered
//! - `logical_camera_zero` - Android "camera2 0" preferred over other rear lenses
//! - `double_decode` - Second decode in the same session is dropped
//! - `depth_camera_listed_first` - Denylisted lens never selected
//! - `unlabeled_cameras` - Labels hidden, fallback names used
//!
//! ## Camera Switching
//! - `switch_camera` - Second camera takes over
//! - `switch_camera_wraps` - Switching past the last camera wraps to the first
//! - `switch_single_camera` - Switch rejected with one camera
//!
//! ## Error Conditions
//! - `permission_denied`, `permission_dismissed_then_retry`, `camera_in_use`
//! - `enumeration_failure`, `no_cameras`
//! - `https_required`, `localhost_without_https`, `api_not_supported`
//! - `mount_never_ready`, `slow_mount`
//! - `engine_start_failed`, `engine_busy_then_retry`
//!
//! ## Manual Entry
//! - `manual_entry_only`, `manual_after_error`, `manual_back_to_camera`
//!
//! ## Teardown
//! - `close_while_scanning`, `close_during_permission`, `close_during_engine_start`

pub mod mock_platform;
pub mod runner;
pub mod scenarios;

// Re-export commonly used types for convenience
pub use mock_platform::{
    MockCall, MockEngine, MockHook, MockPlatform, MockPlatformConfig, MockStats,
};
pub use runner::{apply_action, ScenarioResult, TestRunner, TestRunnerConfig, TestSummary};
pub use scenarios::{ExpectedOutcome, ScenarioLibrary, TestScenario, UserAction};

/// Get a list of all available scenario names
pub fn list_scenario_names() -> Vec<String> {
    ScenarioLibrary::all_scenarios()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

/// Get a list of all available tags
pub fn list_tags() -> Vec<String> {
    let mut tags: Vec<String> = ScenarioLibrary::all_scenarios()
        .into_iter()
        .flat_map(|s| s.tags)
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Print available scenarios to console
pub fn print_available_scenarios() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║               AVAILABLE SCANNER SCENARIOS                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let scenarios = ScenarioLibrary::all_scenarios();

    // Group by first tag
    let mut by_category: std::collections::BTreeMap<String, Vec<&TestScenario>> =
        std::collections::BTreeMap::new();

    for scenario in &scenarios {
        let category = scenario
            .tags
            .first()
            .cloned()
            .unwrap_or_else(|| "other".to_string());
        by_category.entry(category).or_default().push(scenario);
    }

    for (category, scenarios) in &by_category {
        println!("📁 {}", category.to_uppercase());
        for scenario in scenarios {
            println!("   • {} - {}", scenario.name, scenario.description);
        }
        println!();
    }

    println!("Total: {} scenarios available\n", scenarios.len());
}
