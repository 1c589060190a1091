//! Test runner for executing scenarios and generating reports
//!
//! Each scenario gets a fresh simulated platform and controller. The script is
//! replayed action by action, pending decodes are processed after every step,
//! and the final controller and platform state is compared with the expected
//! outcome.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::config::Config;
use crate::core::error::{ErrorKind, Result as ActionResult};
use crate::ui::controller::{ScannerCallbacks, ScannerController, ScannerState};

use super::mock_platform::{MockCall, MockPlatform, MockStats};
use super::scenarios::{ExpectedOutcome, ScenarioLibrary, TestScenario, UserAction};

/// Perform one scripted action against a controller
///
/// `Decode` only injects the text into the running engine; delivering it is
/// left to [`ScannerController::process_decodes`].
pub async fn apply_action(
    controller: &mut ScannerController<MockPlatform>,
    platform: &MockPlatform,
    action: &UserAction,
) -> ActionResult<()> {
    match action {
        UserAction::Initialize => controller.initialize().await,
        UserAction::Retry => controller.retry().await,
        UserAction::SwitchCamera => controller.switch_camera().await,
        UserAction::EnterManualEntry => controller.enter_manual_entry().await,
        UserAction::SubmitManualCode(code) => controller.submit_manual_code(code).await.map(|_| ()),
        UserAction::ReturnToCamera => controller.return_to_camera().await,
        UserAction::Decode(text) => {
            platform.emit_decode(text);
            Ok(())
        }
        UserAction::Close => {
            controller.close().await;
            Ok(())
        }
    }
}

/// Result of running a single test scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the test passed
    pub passed: bool,
    /// Execution time
    #[serde(serialize_with = "serialize_millis", rename = "duration_ms")]
    pub duration: Duration,
    /// State the controller ended in
    pub final_state: ScannerState,
    /// Error kind the controller ended with
    pub error_kind: Option<ErrorKind>,
    /// Codes delivered to on_scan
    pub scanned: Vec<String>,
    /// Number of rejected actions
    pub rejected_actions: usize,
    /// Number of events the controller emitted
    pub events: usize,
    /// Failure reasons (empty when passed)
    pub failures: Vec<String>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

impl ScenarioResult {
    /// First failure reason, if any
    pub fn failure_reason(&self) -> Option<&str> {
        self.failures.first().map(|s| s.as_str())
    }
}

/// Summary of test run results
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    /// Total scenarios run
    pub total: usize,
    /// Scenarios that passed
    pub passed: usize,
    /// Scenarios that failed
    pub failed: usize,
    /// Total execution time
    #[serde(serialize_with = "serialize_millis", rename = "total_duration_ms")]
    pub total_duration: Duration,
    /// Results grouped by first tag
    pub results_by_tag: HashMap<String, Vec<ScenarioResult>>,
}

impl TestSummary {
    /// Calculate pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Get all failed scenario names
    pub fn failed_scenarios(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .results_by_tag
            .values()
            .flatten()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Configuration for test runner
#[derive(Debug, Clone, Default)]
pub struct TestRunnerConfig {
    /// Whether to print each result as it completes
    pub verbose: bool,
    /// Whether to stop on first failure
    pub fail_fast: bool,
    /// Only run scenarios whose name contains this pattern
    pub name_filter: Option<String>,
}

/// What the runner observed while replaying a script
struct Observation {
    scanned: Vec<String>,
    closes: usize,
    rejected_actions: usize,
    events: usize,
    stats: MockStats,
}

/// Test runner for executing scenarios
pub struct TestRunner {
    /// Configuration
    config: TestRunnerConfig,
    /// Results from test runs
    results: Vec<ScenarioResult>,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(TestRunnerConfig::default())
    }

    /// Create a new test runner with configuration
    pub fn with_config(config: TestRunnerConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
        }
    }

    /// Run all available scenarios
    pub async fn run_all(&mut self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::all_scenarios()).await
    }

    /// Run quick test scenarios only
    pub async fn run_quick(&mut self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::quick_scenarios()).await
    }

    /// Run scenarios filtered by tag
    pub async fn run_by_tag(&mut self, tag: &str) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::scenarios_by_tag(tag))
            .await
    }

    /// Run specific scenarios by name
    pub async fn run_by_names(&mut self, names: &[&str]) -> TestSummary {
        let scenarios: Vec<_> = ScenarioLibrary::all_scenarios()
            .into_iter()
            .filter(|s| names.contains(&s.name.as_str()))
            .collect();
        self.run_scenarios(scenarios).await
    }

    /// Run a list of scenarios
    pub async fn run_scenarios(&mut self, scenarios: Vec<TestScenario>) -> TestSummary {
        let start = Instant::now();
        self.results.clear();

        let scenarios: Vec<TestScenario> = match &self.config.name_filter {
            Some(pattern) => scenarios
                .into_iter()
                .filter(|s| s.name.contains(pattern.as_str()))
                .collect(),
            None => scenarios,
        };

        if self.config.verbose {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                QR SCANNER - SCENARIO RUNNER                  ║");
            println!("╚══════════════════════════════════════════════════════════════╝");
            println!("  Running {} scenario(s)\n", scenarios.len());
        }

        let mut summary = TestSummary::default();

        for scenario in scenarios {
            let category = scenario
                .tags
                .first()
                .cloned()
                .unwrap_or_else(|| "other".to_string());
            let result = Self::run_single_scenario(&scenario).await;

            if self.config.verbose {
                Self::print_result(&result);
            }

            summary.total += 1;
            if result.passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            summary
                .results_by_tag
                .entry(category)
                .or_default()
                .push(result.clone());

            let should_stop = self.config.fail_fast && !result.passed;
            self.results.push(result);
            if should_stop {
                break;
            }
        }

        summary.total_duration = start.elapsed();

        if self.config.verbose {
            Self::print_summary(&summary);
        }

        summary
    }

    /// Replay one scenario against a fresh platform and controller
    pub async fn run_single_scenario(scenario: &TestScenario) -> ScenarioResult {
        let start = Instant::now();

        let scans = Arc::new(Mutex::new(Vec::new()));
        let closes = Arc::new(AtomicUsize::new(0));
        let scan_sink = Arc::clone(&scans);
        let close_count = Arc::clone(&closes);
        let callbacks = ScannerCallbacks::new(
            move |code| {
                if let Ok(mut scans) = scan_sink.lock() {
                    scans.push(code.to_string());
                }
            },
            move || {
                close_count.fetch_add(1, Ordering::SeqCst);
            },
        );

        let platform = MockPlatform::new(scenario.platform.clone());
        let mut controller =
            ScannerController::new(platform.clone(), &Config::default(), callbacks);

        if let Some(target) = scenario.close_during {
            let handle = controller.handle();
            platform.set_hook(Arc::new(move |call: MockCall| {
                if call == target {
                    handle.request_close();
                }
            }));
        }

        let mut rejected_actions = 0;
        let mut events = 0;

        for action in &scenario.actions {
            let outcome = apply_action(&mut controller, &platform, action).await;

            if let Err(e) = outcome {
                log::debug!("[{}] {:?} rejected: {}", scenario.name, action, e);
                rejected_actions += 1;
            }

            if !controller.is_closed() {
                if let Err(e) = controller.process_decodes().await {
                    log::debug!("[{}] decode processing rejected: {}", scenario.name, e);
                }
            }
            events += controller.drain_events().len();
        }

        let observation = Observation {
            scanned: scans.lock().map(|s| s.clone()).unwrap_or_default(),
            closes: closes.load(Ordering::SeqCst),
            rejected_actions,
            events,
            stats: platform.stats(),
        };

        let failures = Self::verify(&scenario.expected, &controller, &platform, &observation);

        ScenarioResult {
            name: scenario.name.clone(),
            passed: failures.is_empty(),
            duration: start.elapsed(),
            final_state: controller.state(),
            error_kind: controller.error().map(|e| e.kind),
            scanned: observation.scanned,
            rejected_actions,
            events,
            failures,
        }
    }

    fn verify(
        expected: &ExpectedOutcome,
        controller: &ScannerController<MockPlatform>,
        platform: &MockPlatform,
        observed: &Observation,
    ) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(state) = expected.final_state {
            if controller.state() != state {
                failures.push(format!(
                    "Expected state {}, got {}",
                    state,
                    controller.state()
                ));
            }
        }

        let error_kind = controller.error().map(|e| e.kind);
        if error_kind != expected.error_kind {
            failures.push(format!(
                "Expected error {:?}, got {:?}",
                expected.error_kind, error_kind
            ));
        }

        if observed.scanned != expected.scanned {
            failures.push(format!(
                "Expected scans {:?}, got {:?}",
                expected.scanned, observed.scanned
            ));
        }

        if let Some(device) = &expected.scanning_device {
            let actual = platform.scanning_device();
            if actual.as_ref() != Some(device) {
                failures.push(format!(
                    "Expected scanning on {}, got {:?}",
                    device, actual
                ));
            }
        }

        if let Some(mode) = expected.mode {
            if controller.mode() != mode {
                failures.push(format!("Expected mode {}, got {}", mode, controller.mode()));
            }
        }

        if controller.retry_count() != expected.retry_count {
            failures.push(format!(
                "Expected {} retries, got {}",
                expected.retry_count,
                controller.retry_count()
            ));
        }

        if observed.rejected_actions != expected.rejected_actions {
            failures.push(format!(
                "Expected {} rejected action(s), got {}",
                expected.rejected_actions, observed.rejected_actions
            ));
        }

        let expected_closes = usize::from(expected.closed);
        if observed.closes != expected_closes {
            failures.push(format!(
                "Expected on_close {} time(s), got {}",
                expected_closes, observed.closes
            ));
        }

        if let Some(starts) = expected.engine_starts {
            if observed.stats.engine_starts != starts {
                failures.push(format!(
                    "Expected {} engine start(s), got {}",
                    starts, observed.stats.engine_starts
                ));
            }
        }

        if let Some(requests) = expected.permission_requests {
            if observed.stats.permission_requests != requests {
                failures.push(format!(
                    "Expected {} permission request(s), got {}",
                    requests, observed.stats.permission_requests
                ));
            }
        }

        // Invariants that hold for every scenario
        if observed.stats.max_running_engines > 1 {
            failures.push(format!(
                "{} engines ran at the same time",
                observed.stats.max_running_engines
            ));
        }
        if observed.stats.live_tracks != 0 {
            failures.push(format!(
                "{} probe track(s) never released",
                observed.stats.live_tracks
            ));
        }
        if expected.closed && observed.stats.running_engines != 0 {
            failures.push("Engine still running after close".to_string());
        }

        failures
    }

    fn print_result(result: &ScenarioResult) {
        let status = if result.passed { "✓ PASS" } else { "✗ FAIL" };
        println!(
            "  {} {:<34} {:>8.2}ms  {}",
            status,
            result.name,
            result.duration.as_secs_f64() * 1000.0,
            result.final_state
        );
        for failure in &result.failures {
            println!("      - {}", failure);
        }
    }

    fn print_summary(summary: &TestSummary) {
        println!();
        println!("  Total:  {}", summary.total);
        println!("  Passed: {}", summary.passed);
        println!("  Failed: {}", summary.failed);
        println!("  Pass rate: {:.1}%", summary.pass_rate());
        println!(
            "  Duration: {:.2}s",
            summary.total_duration.as_secs_f64()
        );

        let failed = summary.failed_scenarios();
        if !failed.is_empty() {
            println!("\n  Failed scenarios:");
            for name in failed {
                println!("    • {}", name);
            }
        }
        println!();
    }

    /// Get all results
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_scenario_passes() {
        let mut runner = TestRunner::new();
        let summary = runner.run_all().await;

        for result in runner.results() {
            assert!(
                result.passed,
                "Scenario {} failed: {:?}",
                result.name, result.failures
            );
        }
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total, ScenarioLibrary::all_scenarios().len());
    }

    #[tokio::test]
    async fn test_quick_run() {
        let mut runner = TestRunner::new();
        let summary = runner.run_quick().await;
        assert_eq!(summary.total, 5);
        assert_eq!(summary.pass_rate(), 100.0);
    }

    #[tokio::test]
    async fn test_wrong_expectation_fails() {
        let mut scenario = ScenarioLibrary::happy_path();
        scenario.expected.scanned = vec!["SOMETHING ELSE".to_string()];

        let result = TestRunner::run_single_scenario(&scenario).await;
        assert!(!result.passed);
        assert!(result.failure_reason().unwrap().contains("Expected scans"));
    }

    #[tokio::test]
    async fn test_name_filter_and_fail_fast() {
        let mut runner = TestRunner::with_config(TestRunnerConfig {
            name_filter: Some("switch".to_string()),
            ..Default::default()
        });
        let summary = runner.run_all().await;
        assert_eq!(summary.total, 3);

        let mut failing = ScenarioLibrary::permission_denied();
        failing.expected.error_kind = None;
        let mut runner = TestRunner::with_config(TestRunnerConfig {
            fail_fast: true,
            ..Default::default()
        });
        let summary = runner
            .run_scenarios(vec![failing, ScenarioLibrary::happy_path()])
            .await;
        assert_eq!(summary.total, 1);
        assert_eq!(summary.failed_scenarios(), vec!["permission_denied"]);
    }

    #[test]
    fn test_summary_json() {
        let summary = TestSummary {
            total: 2,
            passed: 1,
            failed: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(summary.pass_rate(), 50.0);
    }
}
