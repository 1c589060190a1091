//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands. Controller
//! work runs on a current-thread tokio runtime built per command.

use crate::cli::progress::{
    format_duration, print_divider, print_error, print_header, print_info, print_success,
    print_warning, ScannerSpinner,
};
use crate::cli::{Args, Commands, TestCommands};
use crate::core::config::{get_config_path, init_config, open_config_in_editor, reset_config, Config};
use crate::core::error::ErrorKind;
use crate::core::manual_entry::ManualEntry;
use crate::core::messages::{Label, Messages};
use crate::device::ranking::rank_cameras;
use crate::device::traits::MediaDeviceInfo;
use crate::testdb::{
    self, apply_action, MockCall, MockPlatform, MockPlatformConfig, ScenarioLibrary, TestRunner,
    TestRunnerConfig,
};
use crate::ui::controller::{InputMode, ScannerCallbacks, ScannerController, ScannerHandle, ScannerState};
use crate::ui::status::Recovery;
use anyhow::{anyhow, Result};
use dialoguer::{Input, Select};
use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Run the appropriate command based on CLI arguments
///
/// Without a subcommand the `happy_path` scenario is simulated.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Some(Commands::Simulate {
            scenario,
            interactive,
            json,
        }) => {
            let runtime = build_runtime()?;
            runtime.block_on(simulate(config, scenario, *interactive, *json, shutdown_flag))?;
        }
        None => {
            let runtime = build_runtime()?;
            runtime.block_on(simulate(config, "happy_path", false, false, shutdown_flag))?;
        }
        Some(Commands::Rank { labels }) => {
            rank_labels(labels);
        }
        Some(Commands::Messages) => {
            print_message_table(config);
        }
        Some(Commands::Manual { code }) => {
            let runtime = build_runtime()?;
            runtime.block_on(manual_entry(config, code.clone()))?;
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        Some(Commands::Test { test_command }) => {
            handle_test_command(test_command)?;
        }
    }

    Ok(())
}

fn build_runtime() -> Result<Runtime> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    Ok(runtime)
}

/// Turn a Ctrl+C into a close request on the scanner
fn forward_shutdown(shutdown_flag: &AtomicBool, handle: &ScannerHandle) {
    if shutdown_flag.load(Ordering::SeqCst) && handle.is_alive() {
        info!("Interrupt received, closing scanner");
        handle.request_close();
    }
}

fn print_events(controller: &ScannerController<MockPlatform>) {
    for event in controller.drain_events() {
        print_info(&event.summary());
    }
}

fn print_status(controller: &ScannerController<MockPlatform>) {
    for line in controller.status().render_lines(controller.messages()) {
        println!("{}", line);
    }
}

// =========================================================================
// SIMULATION
// =========================================================================

/// Drive a controller against the simulated platform of a scenario
async fn simulate(
    config: &Config,
    scenario_name: &str,
    interactive: bool,
    json: bool,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let scenario = ScenarioLibrary::by_name(scenario_name).ok_or_else(|| {
        anyhow!(
            "Unknown scenario '{}'. Run 'qr-scanner test list-scenarios' to see them all.",
            scenario_name
        )
    })?;

    // Give the simulation a realistic frame clock
    let mut platform_config = scenario.platform.clone();
    platform_config.frame_interval_ms = config.scanner.frame_interval_ms;
    platform_config.frame_jitter_ms = config.scanner.frame_interval_ms / 4;
    let platform = MockPlatform::new(platform_config);

    let callbacks = ScannerCallbacks::new(
        |code| print_success(&format!("on_scan: {}", code)),
        || print_info("on_close"),
    );
    let mut controller = ScannerController::new(platform.clone(), config, callbacks);
    let handle = controller.handle();

    if !json {
        print_header(&format!("SIMULATE: {}", scenario.name));
        print_info(&scenario.description);
        println!();
    }

    if interactive {
        run_interactive(&mut controller, &platform, &shutdown_flag).await?;
    } else {
        if let Some(target) = scenario.close_during {
            let close_handle = handle.clone();
            platform.set_hook(Arc::new(move |call: MockCall| {
                if call == target {
                    close_handle.request_close();
                }
            }));
        }

        for action in &scenario.actions {
            forward_shutdown(&shutdown_flag, &handle);
            if controller.is_closed() {
                break;
            }

            let spinner = (!json).then(|| ScannerSpinner::new(&format!("{:?}", action)));
            let outcome = apply_action(&mut controller, &platform, action).await;
            if let Some(spinner) = &spinner {
                spinner.finish(controller.state());
            }

            if let Err(e) = outcome {
                if !json {
                    print_warning(&format!("{:?} rejected: {}", action, e));
                }
            }
            if !controller.is_closed() {
                if let Err(e) = controller.process_decodes().await {
                    debug!("Decode processing rejected: {}", e);
                }
            }

            if json {
                controller.drain_events();
            } else {
                print_events(&controller);
            }
        }
    }

    // Finish a close requested mid-script (idempotent)
    if !handle.is_alive() {
        controller.close().await;
        if !json {
            print_events(&controller);
        }
    }

    if json {
        let report = serde_json::json!({
            "scenario": scenario.name,
            "status": controller.status(),
            "debug_log": controller.debug_log().entries().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_divider();
    print_status(&controller);
    println!();
    println!("Debug log:");
    for line in controller.debug_log().render_lines() {
        println!("  {}", line);
    }

    Ok(())
}

/// Actions offered by the interactive simulation menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Retry,
    SwitchCamera,
    ManualEntry,
    SubmitCode,
    UseCamera,
    Decode,
    FrameMiss,
    Close,
}

impl MenuChoice {
    fn label(&self, messages: &Messages) -> String {
        match self {
            MenuChoice::Retry => Recovery::Retry.label(messages).to_string(),
            MenuChoice::ManualEntry => Recovery::ManualEntry.label(messages).to_string(),
            MenuChoice::SwitchCamera => messages.label(Label::SwitchCamera).to_string(),
            MenuChoice::SubmitCode => messages.label(Label::Submit).to_string(),
            MenuChoice::UseCamera => messages.label(Label::UseCamera).to_string(),
            MenuChoice::Close => messages.label(Label::Close).to_string(),
            MenuChoice::Decode => "Simulate a decode".to_string(),
            MenuChoice::FrameMiss => "Simulate a frame without a code".to_string(),
        }
    }
}

/// Menu entries that make sense for the current controller state
fn menu_for(controller: &ScannerController<MockPlatform>) -> Vec<MenuChoice> {
    if controller.is_session_complete() {
        return vec![MenuChoice::Close];
    }

    if controller.mode() == InputMode::Manual {
        return vec![MenuChoice::SubmitCode, MenuChoice::UseCamera, MenuChoice::Close];
    }

    match controller.state() {
        ScannerState::Error => vec![MenuChoice::Retry, MenuChoice::ManualEntry, MenuChoice::Close],
        ScannerState::Scanning => {
            let mut choices = vec![MenuChoice::Decode, MenuChoice::FrameMiss];
            if controller.can_switch_camera() {
                choices.push(MenuChoice::SwitchCamera);
            }
            choices.push(MenuChoice::ManualEntry);
            choices.push(MenuChoice::Close);
            choices
        }
        _ => vec![MenuChoice::ManualEntry, MenuChoice::Close],
    }
}

async fn run_interactive(
    controller: &mut ScannerController<MockPlatform>,
    platform: &MockPlatform,
    shutdown_flag: &AtomicBool,
) -> Result<()> {
    let handle = controller.handle();
    let messages = *controller.messages();

    let spinner = ScannerSpinner::new("initializing");
    let outcome = controller.initialize().await;
    spinner.finish(controller.state());
    if let Err(e) = outcome {
        print_warning(&e.to_string());
    }
    print_events(controller);

    loop {
        forward_shutdown(shutdown_flag, &handle);
        if !handle.is_alive() {
            controller.close().await;
        }
        if controller.is_closed() {
            print_events(controller);
            break;
        }

        println!();
        print_status(controller);
        println!();

        let choices = menu_for(controller);
        let labels: Vec<String> = choices.iter().map(|c| c.label(&messages)).collect();
        let selection = Select::new()
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        let outcome = match choices[selection] {
            MenuChoice::Retry => controller.retry().await,
            MenuChoice::SwitchCamera => controller.switch_camera().await,
            MenuChoice::ManualEntry => controller.enter_manual_entry().await,
            MenuChoice::UseCamera => controller.return_to_camera().await,
            MenuChoice::SubmitCode => {
                let mut entry = ManualEntry::new();
                let text: String = Input::new()
                    .with_prompt(messages.label(Label::ManualPrompt))
                    .allow_empty(true)
                    .interact_text()?;
                entry.set_text(&text);
                if entry.can_submit() {
                    controller.submit_manual_code(entry.text()).await.map(|_| ())
                } else {
                    print_warning(messages.label(Label::EmptyCode));
                    Ok(())
                }
            }
            MenuChoice::Decode => {
                let text: String = Input::new()
                    .with_prompt("Decoded text")
                    .default("https://example.com/ticket/42".to_string())
                    .interact_text()?;
                if !platform.emit_decode(&text) {
                    print_warning("No engine is scanning");
                }
                Ok(())
            }
            MenuChoice::FrameMiss => {
                platform.emit_frame_miss();
                Ok(())
            }
            MenuChoice::Close => {
                controller.close().await;
                Ok(())
            }
        };

        if let Err(e) = outcome {
            print_warning(&e.to_string());
        }
        if !controller.is_closed() {
            if let Err(e) = controller.process_decodes().await {
                debug!("Decode processing rejected: {}", e);
            }
        }
        print_events(controller);
    }

    Ok(())
}

// =========================================================================
// RANKING, MESSAGES AND MANUAL ENTRY
// =========================================================================

/// Print the ranked camera table for a list of labels
pub fn rank_labels(labels: &[String]) {
    let devices: Vec<MediaDeviceInfo> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| MediaDeviceInfo::video(&format!("device-{}", i), label))
        .collect();

    let ranked = rank_cameras(&devices);

    print_header("CAMERA RANKING");
    println!("  {:<4} {:<40} {:>6}  {}", "#", "Label", "Score", "Rear");
    println!("  {}", "─".repeat(58));
    for (i, camera) in ranked.iter().enumerate() {
        println!(
            "  {:<4} {:<40} {:>6}  {}",
            i + 1,
            camera.label,
            camera.score,
            if camera.is_rear { "yes" } else { "no" }
        );
    }
    println!();
    if let Some(best) = ranked.first() {
        print_success(&format!("Selected first: {} ({})", best.label, best.device_id));
    }
}

/// Print every error kind with its localized message and recoveries
pub fn print_message_table(config: &Config) {
    let messages = Messages::new(config.scanner.language);
    let recoveries = [Recovery::Retry, Recovery::ManualEntry];

    print_header(&format!("ERROR MESSAGES ({})", config.scanner.language));
    for kind in ErrorKind::ALL {
        println!("  {}", kind);
        println!("    {}", messages.error_message(kind));
        let labels: Vec<&str> = recoveries.iter().map(|r| r.label(&messages)).collect();
        println!("    [{}]", labels.join("] ["));
        if kind.shows_diagnostics() {
            println!("    + {}", messages.label(Label::ShowDiagnostics));
        }
        println!();
    }

    println!("  States:");
    for state in ScannerState::ALL {
        println!("    {:<22} {}", state.as_str(), messages.status_message(state));
    }
    println!();
}

/// Submit a code through the controller's manual-entry path
async fn manual_entry(config: &Config, code: Option<String>) -> Result<()> {
    let messages = Messages::new(config.scanner.language);

    let mut entry = ManualEntry::new();
    match code {
        Some(code) => entry.set_text(&code),
        None => {
            while !entry.can_submit() {
                let text: String = Input::new()
                    .with_prompt(messages.label(Label::ManualPrompt))
                    .allow_empty(true)
                    .interact_text()?;
                entry.set_text(&text);
                if !entry.can_submit() {
                    print_warning(messages.label(Label::EmptyCode));
                }
            }
        }
    }

    let platform = MockPlatform::new(MockPlatformConfig::default());
    let mut controller = ScannerController::new(platform, config, ScannerCallbacks::noop());
    controller.enter_manual_entry().await?;

    match controller.submit_manual_code(entry.text()).await {
        Ok(code) => {
            println!("{}", code);
            controller.close().await;
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            controller.close().await;
            Err(e.into())
        }
    }
}

// =========================================================================
// CONFIGURATION
// =========================================================================

pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        let path = reset_config()?;
        info!("Reset config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Save the file after editing to apply changes.");
            info!("Run 'qr-scanner show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            std::fs::write(&path, Config::generate_default_config())?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize the scanner settings.");
    info!("");
    info!("Quick tip: Run 'qr-scanner config' to open the config in your editor.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[scanner]");
    info!("  language = \"{}\"", config.scanner.language);
    info!("  mount_element_id = \"{}\"", config.scanner.mount_element_id);
    info!("  max_mount_attempts = {}", config.scanner.max_mount_attempts);
    info!("  frame_interval_ms = {}", config.scanner.frame_interval_ms);
    info!("  fps = {}", config.scanner.fps);
    info!("  qrbox_ratio = {}", config.scanner.qrbox_ratio);
    info!(
        "  probe = {}x{}",
        config.scanner.probe_width, config.scanner.probe_height
    );
    info!("");
    info!("[debug_log]");
    info!("  capacity = {}", config.debug_log.capacity);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

// =========================================================================
// TEST COMMAND IMPLEMENTATIONS
// =========================================================================

/// Handle test subcommands
pub fn handle_test_command(test_command: &TestCommands) -> Result<()> {
    match test_command {
        TestCommands::RunAll { fail_fast, json } => {
            test_run_all(*fail_fast, *json)?;
        }
        TestCommands::RunQuick { verbose } => {
            test_run_quick(*verbose)?;
        }
        TestCommands::RunTag { tag, verbose } => {
            test_run_by_tag(tag, *verbose)?;
        }
        TestCommands::Run { scenarios, verbose } => {
            test_run_scenarios(scenarios, *verbose)?;
        }
        TestCommands::ListScenarios { tag, detailed } => {
            test_list_scenarios(tag.as_deref(), *detailed);
        }
        TestCommands::ListTags => {
            test_list_tags();
        }
        TestCommands::Info { name } => {
            test_scenario_info(name);
        }
    }
    Ok(())
}

/// Run all test scenarios
fn test_run_all(fail_fast: bool, json: bool) -> Result<()> {
    let config = TestRunnerConfig {
        verbose: !json,
        fail_fast,
        ..Default::default()
    };

    let mut runner = TestRunner::with_config(config);
    let summary = build_runtime()?.block_on(runner.run_all());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Run the end-to-end scenarios
fn test_run_quick(verbose: bool) -> Result<()> {
    let config = TestRunnerConfig {
        verbose,
        ..Default::default()
    };

    let mut runner = TestRunner::with_config(config);
    let summary = build_runtime()?.block_on(runner.run_quick());

    println!(
        "\n✓ Quick tests complete: {}/{} passed in {}",
        summary.passed,
        summary.total,
        format_duration(summary.total_duration)
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Run tests filtered by tag
fn test_run_by_tag(tag: &str, verbose: bool) -> Result<()> {
    let config = TestRunnerConfig {
        verbose,
        ..Default::default()
    };

    let mut runner = TestRunner::with_config(config);
    let summary = build_runtime()?.block_on(runner.run_by_tag(tag));

    if summary.total == 0 {
        print_warning(&format!("No scenarios tagged '{}'", tag));
        return Ok(());
    }

    println!(
        "\n✓ Tests with tag '{}' complete: {}/{} passed",
        tag, summary.passed, summary.total
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Run specific scenarios by name
fn test_run_scenarios(scenarios: &[String], verbose: bool) -> Result<()> {
    let config = TestRunnerConfig {
        verbose,
        ..Default::default()
    };

    let names: Vec<&str> = scenarios.iter().map(|s| s.as_str()).collect();
    for name in &names {
        if ScenarioLibrary::by_name(name).is_none() {
            print_warning(&format!("Unknown scenario '{}'", name));
        }
    }

    let mut runner = TestRunner::with_config(config);
    let summary = build_runtime()?.block_on(runner.run_by_names(&names));

    println!(
        "\n✓ Selected tests complete: {}/{} passed",
        summary.passed, summary.total
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// List all available test scenarios
fn test_list_scenarios(tag_filter: Option<&str>, detailed: bool) {
    if tag_filter.is_none() && !detailed {
        testdb::print_available_scenarios();
        return;
    }

    let scenarios = match tag_filter {
        Some(tag) => ScenarioLibrary::scenarios_by_tag(tag),
        None => ScenarioLibrary::all_scenarios(),
    };

    if scenarios.is_empty() {
        match tag_filter {
            Some(tag) => println!("No scenarios found with tag '{}'", tag),
            None => println!("No scenarios available"),
        }
        return;
    }

    print_header("AVAILABLE TEST SCENARIOS");

    if detailed {
        for scenario in &scenarios {
            println!("📋 {}", scenario.name);
            println!("   Description: {}", scenario.description);
            println!("   Tags: {}", scenario.tags.join(", "));
            println!("   Actions: {}", scenario.actions.len());
            if let Some(state) = scenario.expected.final_state {
                println!("   Expected state: {}", state);
            }
            if let Some(kind) = scenario.expected.error_kind {
                println!("   Expected error: {}", kind);
            }
            println!();
        }
    } else {
        for scenario in &scenarios {
            let tags_str = if scenario.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", scenario.tags.join(", "))
            };
            println!("  • {} - {}{}", scenario.name, scenario.description, tags_str);
        }
        println!();
    }

    println!("Total: {} scenarios", scenarios.len());
}

/// List all available tags
fn test_list_tags() {
    let tags = testdb::list_tags();

    println!("\n📌 Available Tags for Filtering:\n");
    for tag in &tags {
        let count = ScenarioLibrary::scenarios_by_tag(tag).len();
        println!("  • {} ({} scenarios)", tag, count);
    }
    println!();
    println!("Use: qr-scanner test run-tag <TAG>");
}

/// Show information about a specific scenario
fn test_scenario_info(name: &str) {
    let Some(s) = ScenarioLibrary::by_name(name) else {
        println!("Scenario '{}' not found.", name);
        println!("\nAvailable scenarios:");
        for name in testdb::list_scenario_names() {
            println!("  • {}", name);
        }
        return;
    };

    print_header(&format!("SCENARIO: {}", s.name));
    println!("Description: {}", s.description);
    println!("Tags: {}", s.tags.join(", "));

    println!("\nPlatform:");
    println!(
        "  Host: {} (secure: {}, media API: {})",
        s.platform.context.hostname,
        s.platform.context.secure_context,
        s.platform.context.media_devices_available
    );
    for device in &s.platform.devices {
        let label = if device.label.is_empty() {
            "(no label)"
        } else {
            device.label.as_str()
        };
        println!("  Camera: {} [{}]", label, device.device_id);
    }
    for result in &s.platform.permission_results {
        match result {
            Ok(()) => println!("  Permission: granted"),
            Err(e) => println!("  Permission: {}", e.describe()),
        }
    }
    match s.platform.mount_ready_after {
        Some(0) => {}
        Some(n) => println!("  Mount point ready after {} check(s)", n),
        None => println!("  Mount point never appears"),
    }
    for result in &s.platform.engine_start_results {
        if let Err(e) = result {
            println!("  Engine start: {}", e.describe());
        }
    }
    if let Some(call) = s.close_during {
        println!("  Closed during: {:?}", call);
    }

    println!("\nActions:");
    for (i, action) in s.actions.iter().enumerate() {
        println!("  {}. {:?}", i + 1, action);
    }

    println!("\nExpected Outcome:");
    if let Some(state) = s.expected.final_state {
        println!("  State: {}", state);
    }
    if let Some(kind) = s.expected.error_kind {
        println!("  Error: {}", kind);
    }
    if !s.expected.scanned.is_empty() {
        println!("  Scanned: {}", s.expected.scanned.join(", "));
    }
    if let Some(device) = &s.expected.scanning_device {
        println!("  Scanning on: {}", device);
    }
    if s.expected.retry_count > 0 {
        println!("  Retries: {}", s.expected.retry_count);
    }
    if s.expected.rejected_actions > 0 {
        println!("  Rejected actions: {}", s.expected.rejected_actions);
    }
    if s.expected.closed {
        println!("  Closed: yes");
    }
    println!();
}
