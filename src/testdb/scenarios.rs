//! Predefined test scenarios for the scanner
//!
//! Each scenario pairs a simulated platform with a script of user actions and
//! the outcome the controller must reach. They cover the happy path, every
//! failure kind, recovery paths and teardown races.

use crate::core::error::{ErrorKind, PlatformError};
use crate::device::traits::{MediaDeviceInfo, MediaDeviceKind, RuntimeContext};
use crate::ui::controller::{InputMode, ScannerState};

use super::mock_platform::{MockCall, MockPlatformConfig};

/// One scripted user or platform action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Mount the scanner
    Initialize,
    /// Tap "Retry" in the error state
    Retry,
    /// Tap "Switch camera"
    SwitchCamera,
    /// Tap "Enter code manually"
    EnterManualEntry,
    /// Type and submit a code
    SubmitManualCode(String),
    /// Leave manual entry for the camera
    ReturnToCamera,
    /// The engine decodes a frame
    Decode(String),
    /// Dismiss the scanner
    Close,
}

impl UserAction {
    pub fn submit(code: &str) -> Self {
        UserAction::SubmitManualCode(code.to_string())
    }

    pub fn decode(text: &str) -> Self {
        UserAction::Decode(text.to_string())
    }
}

/// Expected outcome after the script ran
#[derive(Debug, Clone, Default)]
pub struct ExpectedOutcome {
    /// Lifecycle state at the end
    pub final_state: Option<ScannerState>,
    /// Active error kind at the end (`None` = no error expected)
    pub error_kind: Option<ErrorKind>,
    /// Codes delivered to `on_scan`, in order
    pub scanned: Vec<String>,
    /// Device the engine should be scanning on at the end
    pub scanning_device: Option<String>,
    /// Input mode at the end
    pub mode: Option<InputMode>,
    pub retry_count: u32,
    /// Number of actions the controller must reject
    pub rejected_actions: usize,
    /// Whether `on_close` must have fired (exactly once)
    pub closed: bool,
    /// Exact number of engine start attempts, when it matters
    pub engine_starts: Option<usize>,
    /// Exact number of permission probes, when it matters
    pub permission_requests: Option<usize>,
}

/// A complete test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Scenario name for identification
    pub name: String,
    /// Description of what this scenario tests
    pub description: String,
    /// Simulated platform behavior
    pub platform: MockPlatformConfig,
    /// Script executed in order
    pub actions: Vec<UserAction>,
    /// Request a close from inside this platform call
    pub close_during: Option<MockCall>,
    /// Expected outcome
    pub expected: ExpectedOutcome,
    /// Tags for filtering scenarios
    pub tags: Vec<String>,
}

impl TestScenario {
    pub fn new(
        name: &str,
        description: &str,
        platform: MockPlatformConfig,
        actions: Vec<UserAction>,
        expected: ExpectedOutcome,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            platform,
            actions,
            close_during: None,
            expected,
            tags: Vec::new(),
        }
    }

    /// Add tags to the scenario
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.into_iter().map(String::from).collect();
        self
    }

    /// Request a close while the given platform call is in flight
    pub fn close_during(mut self, call: MockCall) -> Self {
        self.close_during = Some(call);
        self
    }
}

fn cameras(labels: &[(&str, &str)]) -> Vec<MediaDeviceInfo> {
    labels
        .iter()
        .map(|(id, label)| MediaDeviceInfo::video(id, label))
        .collect()
}

fn phone_cameras() -> Vec<MediaDeviceInfo> {
    cameras(&[
        ("front-0", "camera2 1, facing front"),
        ("back-0", "camera2 0, facing back"),
        ("back-2", "camera2 2, facing back"),
    ])
}

fn denied(name: &str, message: &str) -> MockPlatformConfig {
    MockPlatformConfig {
        permission_results: vec![Err(PlatformError::new(name, message))],
        ..Default::default()
    }
}

/// Collection of all predefined test scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    // =========================================================================
    // HAPPY PATH SCENARIOS
    // =========================================================================

    /// Scenario: laptop with back and front cameras, one decode
    pub fn happy_path() -> TestScenario {
        TestScenario::new(
            "happy_path",
            "Back camera starts first and the first decode is delivered",
            MockPlatformConfig::default(),
            vec![UserAction::Initialize, UserAction::decode("https://example.com/t/42")],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanned: vec!["https://example.com/t/42".to_string()],
                engine_starts: Some(1),
                permission_requests: Some(1),
                ..Default::default()
            },
        )
        .with_tags(vec!["e2e", "basic"])
    }

    /// Scenario: Android logical camera 0
    pub fn logical_camera_zero() -> TestScenario {
        TestScenario::new(
            "logical_camera_zero",
            "Android 'camera2 0, facing back' is boosted and auto-started",
            MockPlatformConfig {
                devices: phone_cameras(),
                ..Default::default()
            },
            vec![UserAction::Initialize, UserAction::decode("ABC123")],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanned: vec!["ABC123".to_string()],
                ..Default::default()
            },
        )
        .with_tags(vec!["e2e", "ranking", "android"])
    }

    /// Scenario: two decodes in a row
    pub fn double_decode() -> TestScenario {
        TestScenario::new(
            "double_decode",
            "Two rapid decodes invoke on_scan exactly once",
            MockPlatformConfig::default(),
            vec![
                UserAction::Initialize,
                UserAction::decode("FIRST"),
                UserAction::decode("SECOND"),
            ],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanned: vec!["FIRST".to_string()],
                ..Default::default()
            },
        )
        .with_tags(vec!["lifecycle", "basic"])
    }

    /// Scenario: switch from rear to front
    pub fn switch_camera() -> TestScenario {
        TestScenario::new(
            "switch_camera",
            "Switching stops the rear engine and starts the front one",
            MockPlatformConfig {
                devices: cameras(&[("rear", "Back Main Camera"), ("front", "Front Camera")]),
                ..Default::default()
            },
            vec![UserAction::Initialize, UserAction::SwitchCamera],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanning_device: Some("front".to_string()),
                engine_starts: Some(2),
                ..Default::default()
            },
        )
        .with_tags(vec!["e2e", "switch"])
    }

    /// Scenario: switching around the whole list
    pub fn switch_camera_wraps() -> TestScenario {
        TestScenario::new(
            "switch_camera_wraps",
            "Switching cycles circularly through the ranked list",
            MockPlatformConfig {
                devices: phone_cameras(),
                ..Default::default()
            },
            vec![
                UserAction::Initialize,
                UserAction::SwitchCamera,
                UserAction::SwitchCamera,
                UserAction::SwitchCamera,
            ],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanning_device: Some("back-0".to_string()),
                engine_starts: Some(4),
                ..Default::default()
            },
        )
        .with_tags(vec!["switch", "ranking"])
    }

    /// Scenario: only one camera
    pub fn switch_single_camera() -> TestScenario {
        TestScenario::new(
            "switch_single_camera",
            "Switching with one camera is rejected and scanning continues",
            MockPlatformConfig {
                devices: cameras(&[("only", "Integrated Webcam")]),
                ..Default::default()
            },
            vec![UserAction::Initialize, UserAction::SwitchCamera],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanning_device: Some("only".to_string()),
                rejected_actions: 1,
                ..Default::default()
            },
        )
        .with_tags(vec!["switch", "edge-case"])
    }

    /// Scenario: depth sensor listed first
    pub fn depth_camera_listed_first() -> TestScenario {
        TestScenario::new(
            "depth_camera_listed_first",
            "A depth camera enumerated first is never started first",
            MockPlatformConfig {
                devices: cameras(&[
                    ("depth", "Back TrueDepth Camera"),
                    ("front", "Front Camera"),
                ]),
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanning_device: Some("front".to_string()),
                ..Default::default()
            },
        )
        .with_tags(vec!["ranking", "edge-case"])
    }

    /// Scenario: labels withheld by the platform
    pub fn unlabeled_cameras() -> TestScenario {
        TestScenario::new(
            "unlabeled_cameras",
            "Unlabeled cameras keep enumeration order",
            MockPlatformConfig {
                devices: cameras(&[("first", ""), ("second", "")]),
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanning_device: Some("first".to_string()),
                ..Default::default()
            },
        )
        .with_tags(vec!["ranking", "edge-case"])
    }

    // =========================================================================
    // PERMISSION SCENARIOS
    // =========================================================================

    /// Scenario: user denies access
    pub fn permission_denied() -> TestScenario {
        TestScenario::new(
            "permission_denied",
            "NotAllowedError ends in permission_denied",
            denied("NotAllowedError", "Permission denied"),
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::PermissionDenied),
                engine_starts: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["permission", "error"])
    }

    /// Scenario: prompt dismissed, then retry
    pub fn permission_dismissed_then_retry() -> TestScenario {
        TestScenario::new(
            "permission_dismissed_then_retry",
            "Dismissed prompt, user retries and the sequence restarts",
            denied("NotAllowedError", "Permission dismissed"),
            vec![UserAction::Initialize, UserAction::Retry],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                retry_count: 1,
                permission_requests: Some(2),
                ..Default::default()
            },
        )
        .with_tags(vec!["e2e", "permission", "retry"])
    }

    /// Scenario: camera held by another app
    pub fn camera_in_use() -> TestScenario {
        TestScenario::new(
            "camera_in_use",
            "NotReadableError ends in camera_in_use",
            denied("NotReadableError", "Could not start video source"),
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::CameraInUse),
                ..Default::default()
            },
        )
        .with_tags(vec!["permission", "error"])
    }

    /// Scenario: enumeration throws
    pub fn enumeration_failure() -> TestScenario {
        TestScenario::new(
            "enumeration_failure",
            "A failing device enumeration is classified",
            MockPlatformConfig {
                enumerate_error: Some(PlatformError::new("AbortError", "enumeration aborted")),
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::CameraInUse),
                engine_starts: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["permission", "error", "edge-case"])
    }

    // =========================================================================
    // CAPABILITY SCENARIOS
    // =========================================================================

    /// Scenario: plain HTTP on a public host
    pub fn https_required() -> TestScenario {
        TestScenario::new(
            "https_required",
            "Insecure remote context never touches the camera",
            MockPlatformConfig {
                context: RuntimeContext {
                    secure_context: false,
                    hostname: "shop.example.com".to_string(),
                    media_devices_available: true,
                },
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::HttpsRequired),
                permission_requests: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["capability", "error"])
    }

    /// Scenario: plain HTTP on localhost
    pub fn localhost_without_https() -> TestScenario {
        TestScenario::new(
            "localhost_without_https",
            "Local development hosts are allowed without HTTPS",
            MockPlatformConfig {
                context: RuntimeContext {
                    secure_context: false,
                    hostname: "127.0.0.1".to_string(),
                    media_devices_available: true,
                },
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                ..Default::default()
            },
        )
        .with_tags(vec!["capability"])
    }

    /// Scenario: no media API at all
    pub fn api_not_supported() -> TestScenario {
        TestScenario::new(
            "api_not_supported",
            "Missing media-capture API ends in not_supported",
            MockPlatformConfig {
                context: RuntimeContext {
                    media_devices_available: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::NotSupported),
                permission_requests: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["capability", "error"])
    }

    // =========================================================================
    // DEVICE / ENGINE SCENARIOS
    // =========================================================================

    /// Scenario: no video inputs
    pub fn no_cameras() -> TestScenario {
        TestScenario::new(
            "no_cameras",
            "Empty device list ends in no_camera without starting an engine",
            MockPlatformConfig {
                devices: vec![MediaDeviceInfo {
                    device_id: "mic".to_string(),
                    label: "Built-in Microphone".to_string(),
                    kind: MediaDeviceKind::AudioInput,
                }],
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::NoCamera),
                engine_starts: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["e2e", "device", "error"])
    }

    /// Scenario: mount point never rendered
    pub fn mount_never_ready() -> TestScenario {
        TestScenario::new(
            "mount_never_ready",
            "Missing viewfinder element ends in ui_not_ready",
            MockPlatformConfig {
                mount_ready_after: None,
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::UiNotReady),
                engine_starts: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["mount", "error"])
    }

    /// Scenario: mount point appears after a few frames of real time
    pub fn slow_mount() -> TestScenario {
        TestScenario::new(
            "slow_mount",
            "Viewfinder element appears after ten jittered frames",
            MockPlatformConfig {
                mount_ready_after: Some(10),
                frame_interval_ms: 16,
                frame_jitter_ms: 8,
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                ..Default::default()
            },
        )
        .with_tags(vec!["mount", "slow"])
    }

    /// Scenario: engine fails for an unknown reason
    pub fn engine_start_failed() -> TestScenario {
        TestScenario::new(
            "engine_start_failed",
            "Unclassified engine failure ends in start_failed",
            MockPlatformConfig {
                engine_start_results: vec![Err(PlatformError::message(
                    "Camera streaming not supported by the browser.",
                ))],
                ..Default::default()
            },
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::StartFailed),
                ..Default::default()
            },
        )
        .with_tags(vec!["engine", "error"])
    }

    /// Scenario: camera busy at start, free on retry
    pub fn engine_busy_then_retry() -> TestScenario {
        TestScenario::new(
            "engine_busy_then_retry",
            "Busy camera at engine start recovers on retry",
            MockPlatformConfig {
                engine_start_results: vec![Err(PlatformError::message(
                    "NotReadableError: Could not start video source",
                ))],
                ..Default::default()
            },
            vec![UserAction::Initialize, UserAction::Retry, UserAction::decode("ok")],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                scanned: vec!["ok".to_string()],
                retry_count: 1,
                engine_starts: Some(2),
                ..Default::default()
            },
        )
        .with_tags(vec!["engine", "retry"])
    }

    // =========================================================================
    // MANUAL ENTRY SCENARIOS
    // =========================================================================

    /// Scenario: manual entry without ever touching the camera
    pub fn manual_entry_only() -> TestScenario {
        TestScenario::new(
            "manual_entry_only",
            "Typed code is uppercased and delivered; camera untouched",
            MockPlatformConfig::default(),
            vec![UserAction::EnterManualEntry, UserAction::submit("vip001")],
            ExpectedOutcome {
                final_state: Some(ScannerState::Initializing),
                scanned: vec!["VIP001".to_string()],
                mode: Some(InputMode::Manual),
                engine_starts: Some(0),
                permission_requests: Some(0),
                ..Default::default()
            },
        )
        .with_tags(vec!["e2e", "manual"])
    }

    /// Scenario: manual entry from the error state
    pub fn manual_after_error() -> TestScenario {
        TestScenario::new(
            "manual_after_error",
            "Denied camera falls back to manual entry; empty code rejected",
            denied("NotAllowedError", "Permission denied"),
            vec![
                UserAction::Initialize,
                UserAction::EnterManualEntry,
                UserAction::submit("   "),
                UserAction::submit("ticket-7"),
            ],
            ExpectedOutcome {
                final_state: Some(ScannerState::Error),
                error_kind: Some(ErrorKind::PermissionDenied),
                scanned: vec!["TICKET-7".to_string()],
                mode: Some(InputMode::Manual),
                rejected_actions: 1,
                ..Default::default()
            },
        )
        .with_tags(vec!["manual", "error"])
    }

    /// Scenario: manual entry, then back to the camera
    pub fn manual_back_to_camera() -> TestScenario {
        TestScenario::new(
            "manual_back_to_camera",
            "Returning to the camera restarts the pipeline without a retry",
            MockPlatformConfig::default(),
            vec![
                UserAction::Initialize,
                UserAction::EnterManualEntry,
                UserAction::ReturnToCamera,
            ],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                mode: Some(InputMode::Camera),
                scanning_device: Some("cam-back".to_string()),
                engine_starts: Some(2),
                ..Default::default()
            },
        )
        .with_tags(vec!["manual"])
    }

    // =========================================================================
    // TEARDOWN SCENARIOS
    // =========================================================================

    /// Scenario: close while scanning
    pub fn close_while_scanning() -> TestScenario {
        TestScenario::new(
            "close_while_scanning",
            "Closing stops the engine and fires on_close once",
            MockPlatformConfig::default(),
            vec![UserAction::Initialize, UserAction::Close, UserAction::Close],
            ExpectedOutcome {
                final_state: Some(ScannerState::Scanning),
                closed: true,
                ..Default::default()
            },
        )
        .with_tags(vec!["teardown", "basic"])
    }

    /// Scenario: close while the permission prompt is open
    pub fn close_during_permission() -> TestScenario {
        TestScenario::new(
            "close_during_permission",
            "A permission grant after close does not resurrect the scanner",
            MockPlatformConfig::default(),
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::RequestingPermission),
                closed: true,
                engine_starts: Some(0),
                rejected_actions: 1,
                ..Default::default()
            },
        )
        .close_during(MockCall::PermissionRequest)
        .with_tags(vec!["teardown", "edge-case"])
    }

    /// Scenario: close while the engine is starting
    pub fn close_during_engine_start() -> TestScenario {
        TestScenario::new(
            "close_during_engine_start",
            "An engine that finishes starting after close is stopped",
            MockPlatformConfig::default(),
            vec![UserAction::Initialize],
            ExpectedOutcome {
                final_state: Some(ScannerState::Starting),
                closed: true,
                engine_starts: Some(1),
                rejected_actions: 1,
                ..Default::default()
            },
        )
        .close_during(MockCall::EngineStart)
        .with_tags(vec!["teardown", "edge-case"])
    }

    // =========================================================================
    // COLLECTIONS
    // =========================================================================

    /// Get all available scenarios
    pub fn all_scenarios() -> Vec<TestScenario> {
        vec![
            Self::happy_path(),
            Self::logical_camera_zero(),
            Self::double_decode(),
            Self::switch_camera(),
            Self::switch_camera_wraps(),
            Self::switch_single_camera(),
            Self::depth_camera_listed_first(),
            Self::unlabeled_cameras(),
            Self::permission_denied(),
            Self::permission_dismissed_then_retry(),
            Self::camera_in_use(),
            Self::enumeration_failure(),
            Self::https_required(),
            Self::localhost_without_https(),
            Self::api_not_supported(),
            Self::no_cameras(),
            Self::mount_never_ready(),
            Self::slow_mount(),
            Self::engine_start_failed(),
            Self::engine_busy_then_retry(),
            Self::manual_entry_only(),
            Self::manual_after_error(),
            Self::manual_back_to_camera(),
            Self::close_while_scanning(),
            Self::close_during_permission(),
            Self::close_during_engine_start(),
        ]
    }

    /// Get a scenario by name
    pub fn by_name(name: &str) -> Option<TestScenario> {
        Self::all_scenarios().into_iter().find(|s| s.name == name)
    }

    /// Get scenarios by tag
    pub fn scenarios_by_tag(tag: &str) -> Vec<TestScenario> {
        Self::all_scenarios()
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Get quick test scenarios (the end-to-end set)
    pub fn quick_scenarios() -> Vec<TestScenario> {
        vec![
            Self::logical_camera_zero(),
            Self::permission_dismissed_then_retry(),
            Self::no_cameras(),
            Self::switch_camera(),
            Self::manual_entry_only(),
        ]
    }
}
