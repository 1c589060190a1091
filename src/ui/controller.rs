//! Scanner Controller Module
//!
//! Owns the camera acquisition state machine: capability check, permission
//! probe, enumeration, ranking, mount wait, engine start, decode delivery,
//! camera switching, manual entry and teardown. All state is mutated through
//! controller methods; frontends observe it through accessors, the status
//! snapshot and the event channel.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::config::{Config, ScannerSettings};
use crate::core::debug_log::DebugLog;
use crate::core::error::{ActionError, ErrorKind, Result, ScanError};
use crate::core::manual_entry::normalize_code;
use crate::core::messages::Messages;
use crate::device::capability::check_capabilities;
use crate::device::engine::{wait_for_mount_point, MountPoint, ScanEngineAdapter};
use crate::device::enumerator::list_cameras;
use crate::device::permission::request_permission;
use crate::device::ranking::{rank_cameras, CameraDevice};
use crate::device::traits::{CameraPlatform, EngineState};
use crate::ui::events::{ScanSource, ScannerEvent};
use crate::ui::status::ScannerStatus;

// =============================================================================
// Controller State
// =============================================================================

/// Lifecycle state of the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerState {
    /// Checking runtime capabilities
    Initializing,
    /// Waiting for the permission probe
    RequestingPermission,
    /// Enumerating and ranking cameras
    SelectingCamera,
    /// Waiting for the viewfinder mount point
    PreparingUi,
    /// Starting the decoding engine
    Starting,
    /// Engine running (resting state)
    Scanning,
    /// Acquisition failed (resting state)
    Error,
}

impl ScannerState {
    pub const ALL: [ScannerState; 7] = [
        ScannerState::Initializing,
        ScannerState::RequestingPermission,
        ScannerState::SelectingCamera,
        ScannerState::PreparingUi,
        ScannerState::Starting,
        ScannerState::Scanning,
        ScannerState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerState::Initializing => "initializing",
            ScannerState::RequestingPermission => "requesting_permission",
            ScannerState::SelectingCamera => "selecting_camera",
            ScannerState::PreparingUi => "preparing_ui",
            ScannerState::Starting => "starting",
            ScannerState::Scanning => "scanning",
            ScannerState::Error => "error",
        }
    }

    /// States the controller stays in until the user acts
    pub fn is_resting(&self) -> bool {
        matches!(self, ScannerState::Scanning | ScannerState::Error)
    }
}

impl Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which input path the scanner presents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Camera,
    Manual,
}

impl Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Camera => write!(f, "camera"),
            InputMode::Manual => write!(f, "manual"),
        }
    }
}

// =============================================================================
// Callbacks and Handle
// =============================================================================

/// Application callbacks
///
/// `on_scan` receives every delivered code (camera or manual), at most once
/// per session. `on_close` fires once on teardown.
#[derive(Clone)]
pub struct ScannerCallbacks {
    on_scan: Arc<dyn Fn(&str) + Send + Sync>,
    on_close: Arc<dyn Fn() + Send + Sync>,
}

impl ScannerCallbacks {
    pub fn new<S, C>(on_scan: S, on_close: C) -> Self
    where
        S: Fn(&str) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Self {
            on_scan: Arc::new(on_scan),
            on_close: Arc::new(on_close),
        }
    }

    /// Callbacks that do nothing
    pub fn noop() -> Self {
        Self::new(|_| {}, || {})
    }
}

impl fmt::Debug for ScannerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScannerCallbacks")
    }
}

/// Cloneable handle for requesting teardown from outside the controller
///
/// Used from signal handlers and platform callbacks. The controller finishes
/// the teardown at its next continuation or action.
#[derive(Debug, Clone)]
pub struct ScannerHandle {
    alive: Arc<AtomicBool>,
}

impl ScannerHandle {
    pub fn request_close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Scanner Controller
// =============================================================================

/// Camera acquisition state machine
pub struct ScannerController<P: CameraPlatform> {
    platform: P,
    settings: ScannerSettings,
    callbacks: ScannerCallbacks,
    messages: Messages,

    state: ScannerState,
    error: Option<ScanError>,
    mode: InputMode,
    /// Ranked cameras, best first
    cameras: Vec<CameraDevice>,
    selected: usize,
    retry_count: u32,
    /// Set once a code was delivered in the current session
    result_delivered: bool,
    /// Set once teardown completed
    closed: bool,
    alive: Arc<AtomicBool>,

    adapter: ScanEngineAdapter,
    debug_log: DebugLog,

    decode_tx: Sender<String>,
    decode_rx: Receiver<String>,
    event_tx: Sender<ScannerEvent>,
    event_rx: Receiver<ScannerEvent>,
}

impl<P: CameraPlatform> ScannerController<P> {
    /// Create a controller in the `initializing` state
    ///
    /// Nothing touches the platform until [`initialize`](Self::initialize).
    pub fn new(platform: P, config: &Config, callbacks: ScannerCallbacks) -> Self {
        let (decode_tx, decode_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        Self {
            platform,
            settings: config.scanner.clone(),
            callbacks,
            messages: Messages::new(config.scanner.language),
            state: ScannerState::Initializing,
            error: None,
            mode: InputMode::Camera,
            cameras: Vec::new(),
            selected: 0,
            retry_count: 0,
            result_delivered: false,
            closed: false,
            alive: Arc::new(AtomicBool::new(true)),
            adapter: ScanEngineAdapter::new(config.scanner.engine_config()),
            debug_log: DebugLog::with_capacity(config.debug_log.capacity),
            decode_tx,
            decode_rx,
            event_tx,
            event_rx,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn state(&self) -> ScannerState {
        self.state
    }

    /// Active error, if the scanner is in the error state
    pub fn error(&self) -> Option<&ScanError> {
        self.error.as_ref()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Ranked cameras, best first
    pub fn cameras(&self) -> &[CameraDevice] {
        &self.cameras
    }

    pub fn selected_camera(&self) -> Option<&CameraDevice> {
        self.cameras.get(self.selected)
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether a code was already delivered in this session
    pub fn is_session_complete(&self) -> bool {
        self.result_delivered
    }

    /// Whether teardown completed or was requested
    pub fn is_closed(&self) -> bool {
        self.closed || !self.is_alive()
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// State reported by the active engine
    pub fn engine_state(&self) -> EngineState {
        self.adapter.engine_state()
    }

    /// Whether "switch camera" is currently offered
    pub fn can_switch_camera(&self) -> bool {
        !self.is_closed()
            && self.state == ScannerState::Scanning
            && self.mode == InputMode::Camera
            && !self.result_delivered
            && self.cameras.len() >= 2
    }

    /// UI-facing snapshot of the scanner
    pub fn status(&self) -> ScannerStatus {
        ScannerStatus::from_controller(self)
    }

    /// Handle for requesting teardown from elsewhere
    pub fn handle(&self) -> ScannerHandle {
        ScannerHandle {
            alive: Arc::clone(&self.alive),
        }
    }

    /// Try to receive the next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ScannerEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain all pending events
    pub fn drain_events(&self) -> Vec<ScannerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv_event() {
            events.push(event);
        }
        events
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Run the acquisition sequence from the start
    ///
    /// Camera failures are not returned: they move the controller into the
    /// `error` state. An `Err` means the action itself was rejected or the
    /// scanner was closed while it ran.
    pub async fn initialize(&mut self) -> Result<()> {
        self.ensure_alive().await?;
        self.run_pipeline().await
    }

    /// Re-run initialization from the error state
    pub async fn retry(&mut self) -> Result<()> {
        self.ensure_alive().await?;
        if self.result_delivered {
            return Err(ActionError::SessionComplete);
        }
        if self.state != ScannerState::Error {
            return Err(self.invalid("retry"));
        }

        self.retry_count += 1;
        self.debug_log.info(format!("Retry #{}", self.retry_count));
        self.run_pipeline().await
    }

    /// Move to the next ranked camera (circular)
    pub async fn switch_camera(&mut self) -> Result<()> {
        self.ensure_alive().await?;
        if self.result_delivered {
            return Err(ActionError::SessionComplete);
        }
        if self.state != ScannerState::Scanning || self.mode != InputMode::Camera {
            return Err(self.invalid("switch_camera"));
        }
        if self.cameras.len() < 2 {
            return Err(ActionError::NotEnoughCameras {
                found: self.cameras.len(),
            });
        }

        self.selected = (self.selected + 1) % self.cameras.len();
        self.debug_log.info(format!(
            "Switching to camera #{} ({})",
            self.selected + 1,
            self.cameras[self.selected].label
        ));

        self.adapter.stop().await;
        if !self.is_alive() {
            return self.abandon("switch_camera").await;
        }

        let mount = wait_for_mount_point(
            &self.platform,
            &self.settings.mount_element_id,
            self.settings.max_mount_attempts,
        )
        .await;
        if !self.is_alive() {
            return self.abandon("switch_camera").await;
        }

        match mount {
            Ok(mount) => self.start_selected(&mount).await,
            Err(e) => {
                self.fail(e);
                Ok(())
            }
        }
    }

    /// Deliver a pending camera decode, if any
    ///
    /// The first decode of a session is handed to `on_scan` and ends the
    /// session: the engine is stopped and later decodes are dropped.
    pub async fn process_decodes(&mut self) -> Result<Option<String>> {
        self.ensure_alive().await?;

        let code = match self.decode_rx.try_recv() {
            Ok(code) => code,
            Err(_) => return Ok(None),
        };

        if self.result_delivered || self.mode != InputMode::Camera {
            debug!("Ignoring decode outside an open camera session");
            self.drain_decodes();
            return Ok(None);
        }

        self.result_delivered = true;
        self.drain_decodes();
        self.debug_log.success("QR code decoded");
        (self.callbacks.on_scan)(&code);
        self.emit(ScannerEvent::Scanned {
            code: code.clone(),
            source: ScanSource::Camera,
        });

        self.adapter.stop().await;
        Ok(Some(code))
    }

    /// Switch to manual code entry, tearing down the camera pipeline
    pub async fn enter_manual_entry(&mut self) -> Result<()> {
        self.ensure_alive().await?;
        if self.result_delivered {
            return Err(ActionError::SessionComplete);
        }
        if self.mode == InputMode::Manual {
            return Ok(());
        }

        self.adapter.stop().await;
        self.drain_decodes();
        if !self.is_alive() {
            return self.abandon("enter_manual_entry").await;
        }

        self.mode = InputMode::Manual;
        self.debug_log.info("Manual entry opened");
        self.emit(ScannerEvent::ModeChanged {
            mode: InputMode::Manual,
        });
        Ok(())
    }

    /// Submit a typed code through the same output contract as a decode
    ///
    /// Returns the normalized code that was delivered.
    pub async fn submit_manual_code(&mut self, input: &str) -> Result<String> {
        self.ensure_alive().await?;
        if self.mode != InputMode::Manual {
            return Err(self.invalid("submit_manual_code"));
        }
        if self.result_delivered {
            return Err(ActionError::SessionComplete);
        }

        let code = normalize_code(input)?;

        self.result_delivered = true;
        self.debug_log.success("Manual code submitted");
        (self.callbacks.on_scan)(&code);
        self.emit(ScannerEvent::Scanned {
            code: code.clone(),
            source: ScanSource::Manual,
        });
        Ok(code)
    }

    /// Leave manual entry and restart the camera pipeline
    ///
    /// Unlike [`retry`](Self::retry) this does not count as a retry.
    pub async fn return_to_camera(&mut self) -> Result<()> {
        self.ensure_alive().await?;
        if self.mode != InputMode::Manual {
            return Err(self.invalid("return_to_camera"));
        }
        if self.result_delivered {
            return Err(ActionError::SessionComplete);
        }

        self.debug_log.info("Returning to camera");
        self.run_pipeline().await
    }

    /// Tear the scanner down and notify the application
    ///
    /// Idempotent; `on_close` fires once.
    pub async fn close(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.finish_close().await;
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    async fn run_pipeline(&mut self) -> Result<()> {
        self.adapter.stop().await;
        if !self.is_alive() {
            return self.abandon("initialize").await;
        }

        // A new session: nothing from the previous attempt survives
        self.drain_decodes();
        self.result_delivered = false;
        self.error = None;
        if self.mode != InputMode::Camera {
            self.mode = InputMode::Camera;
            self.emit(ScannerEvent::ModeChanged {
                mode: InputMode::Camera,
            });
        }
        self.set_state(ScannerState::Initializing);
        self.debug_log.info("Initializing scanner");

        let context = self.platform.runtime_context();
        if let Err(e) = check_capabilities(&context) {
            self.fail(e);
            return Ok(());
        }

        self.set_state(ScannerState::RequestingPermission);
        let constraints = self.settings.probe_constraints();
        let permission = request_permission(&self.platform, &constraints).await;
        if !self.is_alive() {
            return self.abandon("permission request").await;
        }
        if let Err(e) = permission {
            self.fail(e);
            return Ok(());
        }
        self.debug_log.info("Camera permission granted");

        self.set_state(ScannerState::SelectingCamera);
        let devices = list_cameras(&self.platform).await;
        if !self.is_alive() {
            return self.abandon("enumeration").await;
        }
        let devices = match devices {
            Ok(devices) => devices,
            Err(e) => {
                self.fail(e);
                return Ok(());
            }
        };

        self.cameras = rank_cameras(&devices);
        self.selected = 0;
        self.emit(ScannerEvent::CamerasRanked {
            cameras: self.cameras.clone(),
        });

        if self.cameras.is_empty() {
            self.fail(ScanError::new(
                ErrorKind::NoCamera,
                "No video input devices found",
            ));
            return Ok(());
        }

        let summary: Vec<String> = self
            .cameras
            .iter()
            .map(|c| format!("{} ({})", c.label, c.score))
            .collect();
        self.debug_log
            .info(format!("Found {} camera(s): {}", self.cameras.len(), summary.join(", ")));

        self.set_state(ScannerState::PreparingUi);
        let mount = wait_for_mount_point(
            &self.platform,
            &self.settings.mount_element_id,
            self.settings.max_mount_attempts,
        )
        .await;
        if !self.is_alive() {
            return self.abandon("mount wait").await;
        }
        let mount = match mount {
            Ok(mount) => mount,
            Err(e) => {
                self.fail(e);
                return Ok(());
            }
        };

        self.start_selected(&mount).await
    }

    /// Start the engine on the selected camera (starting -> scanning | error)
    async fn start_selected(&mut self, mount: &MountPoint) -> Result<()> {
        let Some(camera) = self.cameras.get(self.selected).cloned() else {
            self.fail(ScanError::new(ErrorKind::NoCamera, "No camera selected"));
            return Ok(());
        };

        self.set_state(ScannerState::Starting);
        self.emit(ScannerEvent::CameraSelected {
            index: self.selected,
            label: camera.label.clone(),
        });

        let started = self
            .adapter
            .start(
                &self.platform,
                &camera.device_id,
                mount,
                self.decode_tx.clone(),
            )
            .await;

        if !self.is_alive() {
            // Finished starting after teardown: release it right away
            return self.abandon("engine start").await;
        }

        match started {
            Ok(()) => {
                self.debug_log
                    .success(format!("Camera started: {}", camera.label));
                self.set_state(ScannerState::Scanning);
            }
            Err(e) => self.fail(e),
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Reject actions after teardown, completing a requested close first
    async fn ensure_alive(&mut self) -> Result<()> {
        if self.closed {
            return Err(ActionError::Closed);
        }
        if !self.is_alive() {
            self.finish_close().await;
            return Err(ActionError::Closed);
        }
        Ok(())
    }

    /// Stop a continuation that resumed after teardown
    async fn abandon(&mut self, step: &str) -> Result<()> {
        debug!("Abandoning {} after close", step);
        self.finish_close().await;
        Err(ActionError::Closed)
    }

    async fn finish_close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.alive.store(false, Ordering::SeqCst);

        self.adapter.stop().await;
        self.drain_decodes();
        self.debug_log.info("Scanner closed");
        (self.callbacks.on_close)();
        self.emit(ScannerEvent::Closed);
    }

    fn fail(&mut self, error: ScanError) {
        self.debug_log
            .error(format!("{}: {}", error.kind, error.detail));
        self.emit(ScannerEvent::ErrorRaised {
            kind: error.kind,
            detail: error.detail.clone(),
        });
        self.error = Some(error);
        self.set_state(ScannerState::Error);
    }

    fn set_state(&mut self, to: ScannerState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        info!("Scanner state: {} -> {}", from, to);
        self.emit(ScannerEvent::StateChanged {
            from,
            to,
            error: self.error.as_ref().map(|e| e.kind),
        });
    }

    fn invalid(&self, action: &'static str) -> ActionError {
        warn!("Rejected '{}' while {}", action, self.state);
        ActionError::InvalidState {
            action,
            state: self.state,
        }
    }

    fn drain_decodes(&self) {
        while self.decode_rx.try_recv().is_ok() {}
    }

    fn emit(&self, event: ScannerEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ManualEntryError, PlatformError};
    use crate::device::traits::{MediaDeviceInfo, RuntimeContext};
    use crate::testdb::{MockCall, MockPlatform, MockPlatformConfig};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct Recorder {
        scans: Arc<Mutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn scans(&self) -> Vec<String> {
            self.scans.lock().unwrap().clone()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    fn setup(
        config: MockPlatformConfig,
    ) -> (ScannerController<MockPlatform>, MockPlatform, Recorder) {
        let scans = Arc::new(Mutex::new(Vec::new()));
        let closes = Arc::new(AtomicUsize::new(0));
        let scan_sink = Arc::clone(&scans);
        let close_count = Arc::clone(&closes);
        let callbacks = ScannerCallbacks::new(
            move |code| scan_sink.lock().unwrap().push(code.to_string()),
            move || {
                close_count.fetch_add(1, Ordering::SeqCst);
            },
        );

        let platform = MockPlatform::new(config);
        let controller =
            ScannerController::new(platform.clone(), &Config::default(), callbacks);
        (controller, platform, Recorder { scans, closes })
    }

    fn devices(labels: &[(&str, &str)]) -> Vec<MediaDeviceInfo> {
        labels
            .iter()
            .map(|(id, label)| MediaDeviceInfo::video(id, label))
            .collect()
    }

    fn states(events: &[ScannerEvent]) -> Vec<ScannerState> {
        events
            .iter()
            .filter_map(|e| match e {
                ScannerEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // End-to-end scenarios
    // =========================================================================

    #[tokio::test]
    async fn test_logical_camera_zero_decodes_once() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig {
            devices: devices(&[("cam0", "camera2 0, facing back")]),
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(controller.state(), ScannerState::Scanning);

        let selected = controller.selected_camera().unwrap();
        assert!(selected.is_rear);
        assert_eq!(selected.score, 50);
        assert_eq!(platform.scanning_device().as_deref(), Some("cam0"));

        assert!(platform.emit_decode("ABC123"));
        assert_eq!(
            controller.process_decodes().await.unwrap().as_deref(),
            Some("ABC123")
        );
        assert_eq!(recorder.scans(), vec!["ABC123".to_string()]);
        assert!(controller.is_session_complete());
        assert_eq!(platform.stats().running_engines, 0);

        let events = states(&controller.drain_events());
        assert_eq!(
            events,
            vec![
                ScannerState::RequestingPermission,
                ScannerState::SelectingCamera,
                ScannerState::PreparingUi,
                ScannerState::Starting,
                ScannerState::Scanning,
            ]
        );
    }

    #[tokio::test]
    async fn test_dismissed_permission_then_retry() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig {
            permission_results: vec![Err(PlatformError::new(
                "NotAllowedError",
                "Permission dismissed",
            ))],
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(controller.state(), ScannerState::Error);
        assert_eq!(
            controller.error().map(|e| e.kind),
            Some(ErrorKind::PermissionDismissed)
        );
        controller.drain_events();

        controller.retry().await.unwrap();
        assert_eq!(controller.retry_count(), 1);
        assert_eq!(controller.state(), ScannerState::Scanning);
        assert!(controller.error().is_none());
        assert_eq!(platform.stats().permission_requests, 2);

        let events = controller.drain_events();
        match &events[0] {
            ScannerEvent::StateChanged { from, to, error } => {
                assert_eq!(*from, ScannerState::Error);
                assert_eq!(*to, ScannerState::Initializing);
                assert_eq!(*error, None);
            }
            other => panic!("Unexpected first event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_cameras_never_starts_engine() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig {
            devices: vec![],
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(controller.state(), ScannerState::Error);
        assert_eq!(controller.error().map(|e| e.kind), Some(ErrorKind::NoCamera));

        let stats = platform.stats();
        assert_eq!(stats.engines_created, 0);
        assert_eq!(stats.engine_starts, 0);
    }

    #[tokio::test]
    async fn test_switch_camera_cycles_to_front() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig {
            devices: devices(&[("front", "Front Camera"), ("rear", "Back Main Camera")]),
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(controller.cameras()[0].score, 20);
        assert_eq!(controller.cameras()[1].score, -15);
        assert_eq!(platform.scanning_device().as_deref(), Some("rear"));
        controller.drain_events();

        controller.switch_camera().await.unwrap();
        assert_eq!(controller.state(), ScannerState::Scanning);
        assert_eq!(controller.selected_camera().unwrap().device_id, "front");
        assert_eq!(platform.scanning_device().as_deref(), Some("front"));

        let stats = platform.stats();
        assert_eq!(stats.engine_stops, 1);
        assert_eq!(stats.max_running_engines, 1);
        assert_eq!(stats.started_devices, vec!["rear", "front"]);

        assert_eq!(
            states(&controller.drain_events()),
            vec![ScannerState::Starting, ScannerState::Scanning]
        );

        // Wraps around
        controller.switch_camera().await.unwrap();
        assert_eq!(controller.selected_camera().unwrap().device_id, "rear");
    }

    #[tokio::test]
    async fn test_manual_entry_without_camera() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig::default());

        controller.enter_manual_entry().await.unwrap();
        let code = controller.submit_manual_code("  vip001 ").await.unwrap();

        assert_eq!(code, "VIP001");
        assert_eq!(recorder.scans(), vec!["VIP001".to_string()]);

        let stats = platform.stats();
        assert_eq!(stats.permission_requests, 0);
        assert_eq!(stats.enumerations, 0);
        assert_eq!(stats.engines_created, 0);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    #[tokio::test]
    async fn test_rapid_decodes_deliver_once() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig::default());
        controller.initialize().await.unwrap();

        platform.emit_decode("FIRST");
        platform.emit_decode("SECOND");

        controller.process_decodes().await.unwrap();
        controller.process_decodes().await.unwrap();

        assert_eq!(recorder.scans(), vec!["FIRST".to_string()]);
        assert!(!platform.emit_decode("THIRD"));
        assert_eq!(controller.process_decodes().await.unwrap(), None);
        assert_eq!(recorder.scans().len(), 1);
    }

    #[tokio::test]
    async fn test_double_initialize_keeps_one_engine() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig::default());

        controller.initialize().await.unwrap();
        controller.initialize().await.unwrap();

        let stats = platform.stats();
        assert_eq!(stats.engines_created, 2);
        assert_eq!(stats.running_engines, 1);
        assert_eq!(stats.max_running_engines, 1);
    }

    #[tokio::test]
    async fn test_mount_never_appears() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig {
            mount_ready_after: None,
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(controller.error().map(|e| e.kind), Some(ErrorKind::UiNotReady));
        assert_eq!(
            platform.stats().mount_checks,
            controller.settings().max_mount_attempts
        );
        assert_eq!(platform.stats().engines_created, 0);
        assert!(controller.status().error.unwrap().diagnostics.is_some());
    }

    #[tokio::test]
    async fn test_capability_failures() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig {
            context: RuntimeContext {
                secure_context: false,
                hostname: "shop.example.com".to_string(),
                media_devices_available: true,
            },
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(
            controller.error().map(|e| e.kind),
            Some(ErrorKind::HttpsRequired)
        );
        assert_eq!(platform.stats().permission_requests, 0);
    }

    #[tokio::test]
    async fn test_engine_start_failure_is_error_state() {
        let (mut controller, _platform, _recorder) = setup(MockPlatformConfig {
            engine_start_results: vec![Err(PlatformError::message(
                "Camera streaming not supported by the browser.",
            ))],
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        assert_eq!(controller.state(), ScannerState::Error);
        assert_eq!(
            controller.error().map(|e| e.kind),
            Some(ErrorKind::StartFailed)
        );
        assert!(!controller.can_switch_camera());
    }

    // =========================================================================
    // Invalid actions
    // =========================================================================

    #[tokio::test]
    async fn test_retry_only_from_error() {
        let (mut controller, _platform, _recorder) = setup(MockPlatformConfig::default());
        controller.initialize().await.unwrap();

        let err = controller.retry().await.unwrap_err();
        assert_eq!(
            err,
            ActionError::InvalidState {
                action: "retry",
                state: ScannerState::Scanning
            }
        );
        assert_eq!(controller.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_switch_requirements() {
        let (mut controller, _platform, _recorder) = setup(MockPlatformConfig {
            devices: devices(&[("only", "Back Camera")]),
            ..Default::default()
        });

        assert!(matches!(
            controller.switch_camera().await,
            Err(ActionError::InvalidState { .. })
        ));

        controller.initialize().await.unwrap();
        assert_eq!(
            controller.switch_camera().await,
            Err(ActionError::NotEnoughCameras { found: 1 })
        );
        assert_eq!(controller.state(), ScannerState::Scanning);
    }

    #[tokio::test]
    async fn test_manual_entry_rules() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig::default());
        controller.initialize().await.unwrap();

        assert!(matches!(
            controller.submit_manual_code("ABC").await,
            Err(ActionError::InvalidState { .. })
        ));

        controller.enter_manual_entry().await.unwrap();
        assert_eq!(controller.mode(), InputMode::Manual);
        assert_eq!(platform.stats().running_engines, 0);

        assert_eq!(
            controller.submit_manual_code("   ").await,
            Err(ActionError::ManualEntry(ManualEntryError::Empty))
        );
        assert!(recorder.scans().is_empty());

        controller.submit_manual_code("abc").await.unwrap();
        assert_eq!(
            controller.submit_manual_code("def").await,
            Err(ActionError::SessionComplete)
        );
        assert_eq!(recorder.scans(), vec!["ABC".to_string()]);
    }

    #[tokio::test]
    async fn test_return_to_camera_does_not_count_retry() {
        let (mut controller, platform, _recorder) = setup(MockPlatformConfig {
            permission_results: vec![Err(PlatformError::new("NotAllowedError", "denied"))],
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        controller.enter_manual_entry().await.unwrap();
        controller.return_to_camera().await.unwrap();

        assert_eq!(controller.mode(), InputMode::Camera);
        assert_eq!(controller.state(), ScannerState::Scanning);
        assert_eq!(controller.retry_count(), 0);
        assert!(platform.scanning_device().is_some());
    }

    #[tokio::test]
    async fn test_retry_rejected_after_manual_delivery() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig {
            permission_results: vec![Err(PlatformError::new("NotAllowedError", "denied"))],
            ..Default::default()
        });

        controller.initialize().await.unwrap();
        controller.enter_manual_entry().await.unwrap();
        controller.submit_manual_code("abc").await.unwrap();

        assert_eq!(controller.retry().await, Err(ActionError::SessionComplete));
        assert_eq!(
            controller.enter_manual_entry().await,
            Err(ActionError::SessionComplete)
        );
        assert!(controller.is_session_complete());
        assert_eq!(controller.retry_count(), 0);
        assert_eq!(platform.stats().engine_starts, 0);
        assert_eq!(recorder.scans(), vec!["ABC".to_string()]);
    }

    // =========================================================================
    // State x action table
    // =========================================================================

    #[derive(Debug, Clone, Copy)]
    enum Fixture {
        /// Never initialized
        Fresh,
        Scanning,
        /// Permission denied once
        Error,
        /// Manual entry opened from the error state
        ManualFromError,
        /// Camera decode delivered
        CameraDelivered,
        /// Manual code delivered
        ManualDelivered,
        Closed,
    }

    #[derive(Debug, Clone, Copy)]
    enum Action {
        Initialize,
        Retry,
        Switch,
        Decode,
        EnterManual,
        SubmitManual,
        ReturnToCamera,
        Close,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Emitted {
        StateTo(ScannerState),
        Mode(InputMode),
        Scanned(ScanSource),
        Closed,
    }

    #[derive(Debug)]
    enum Outcome {
        /// Accepted: resulting state and mode, plus an event that must be emitted
        /// (`None` means nothing is emitted)
        Accepted(ScannerState, InputMode, Option<Emitted>),
        Rejected(ActionError),
    }

    async fn fixture(
        kind: Fixture,
    ) -> (ScannerController<MockPlatform>, MockPlatform, Recorder) {
        let config = match kind {
            Fixture::Error | Fixture::ManualFromError | Fixture::ManualDelivered => {
                MockPlatformConfig {
                    permission_results: vec![Err(PlatformError::new(
                        "NotAllowedError",
                        "denied",
                    ))],
                    ..Default::default()
                }
            }
            _ => MockPlatformConfig::default(),
        };
        let (mut controller, platform, recorder) = setup(config);

        match kind {
            Fixture::Fresh => {}
            Fixture::Scanning | Fixture::Error => controller.initialize().await.unwrap(),
            Fixture::ManualFromError => {
                controller.initialize().await.unwrap();
                controller.enter_manual_entry().await.unwrap();
            }
            Fixture::CameraDelivered => {
                controller.initialize().await.unwrap();
                assert!(platform.emit_decode("FIRST"));
                controller.process_decodes().await.unwrap();
            }
            Fixture::ManualDelivered => {
                controller.initialize().await.unwrap();
                controller.enter_manual_entry().await.unwrap();
                controller.submit_manual_code("first").await.unwrap();
            }
            Fixture::Closed => {
                controller.initialize().await.unwrap();
                controller.close().await;
            }
        }
        controller.drain_events();
        (controller, platform, recorder)
    }

    async fn apply(
        controller: &mut ScannerController<MockPlatform>,
        platform: &MockPlatform,
        action: Action,
    ) -> Result<()> {
        match action {
            Action::Initialize => controller.initialize().await,
            Action::Retry => controller.retry().await,
            Action::Switch => controller.switch_camera().await,
            Action::Decode => {
                platform.emit_decode("TABLE");
                controller.process_decodes().await.map(|_| ())
            }
            Action::EnterManual => controller.enter_manual_entry().await,
            Action::SubmitManual => controller.submit_manual_code("abc").await.map(|_| ()),
            Action::ReturnToCamera => controller.return_to_camera().await,
            Action::Close => {
                controller.close().await;
                Ok(())
            }
        }
    }

    fn invalid(action: &'static str, state: ScannerState) -> Outcome {
        Outcome::Rejected(ActionError::InvalidState { action, state })
    }

    fn expected(fixture: Fixture, action: Action) -> Outcome {
        use Action as A;
        use Emitted as E;
        use InputMode::{Camera, Manual};
        use Outcome::{Accepted, Rejected};
        use ScannerState::{Error, Initializing, Scanning};

        let done = || Rejected(ActionError::SessionComplete);

        match (fixture, action) {
            (Fixture::Fresh, A::Initialize) => Accepted(Scanning, Camera, Some(E::StateTo(Scanning))),
            (Fixture::Fresh, A::Retry) => invalid("retry", Initializing),
            (Fixture::Fresh, A::Switch) => invalid("switch_camera", Initializing),
            (Fixture::Fresh, A::Decode) => Accepted(Initializing, Camera, None),
            (Fixture::Fresh, A::EnterManual) => Accepted(Initializing, Manual, Some(E::Mode(Manual))),
            (Fixture::Fresh, A::SubmitManual) => invalid("submit_manual_code", Initializing),
            (Fixture::Fresh, A::ReturnToCamera) => invalid("return_to_camera", Initializing),
            (Fixture::Fresh, A::Close) => Accepted(Initializing, Camera, Some(E::Closed)),

            (Fixture::Scanning, A::Initialize) => Accepted(Scanning, Camera, Some(E::StateTo(Scanning))),
            (Fixture::Scanning, A::Retry) => invalid("retry", Scanning),
            (Fixture::Scanning, A::Switch) => Accepted(Scanning, Camera, Some(E::StateTo(Scanning))),
            (Fixture::Scanning, A::Decode) => {
                Accepted(Scanning, Camera, Some(E::Scanned(ScanSource::Camera)))
            }
            (Fixture::Scanning, A::EnterManual) => Accepted(Scanning, Manual, Some(E::Mode(Manual))),
            (Fixture::Scanning, A::SubmitManual) => invalid("submit_manual_code", Scanning),
            (Fixture::Scanning, A::ReturnToCamera) => invalid("return_to_camera", Scanning),
            (Fixture::Scanning, A::Close) => Accepted(Scanning, Camera, Some(E::Closed)),

            (Fixture::Error, A::Initialize) => Accepted(Scanning, Camera, Some(E::StateTo(Scanning))),
            (Fixture::Error, A::Retry) => Accepted(Scanning, Camera, Some(E::StateTo(Scanning))),
            (Fixture::Error, A::Switch) => invalid("switch_camera", Error),
            (Fixture::Error, A::Decode) => Accepted(Error, Camera, None),
            (Fixture::Error, A::EnterManual) => Accepted(Error, Manual, Some(E::Mode(Manual))),
            (Fixture::Error, A::SubmitManual) => invalid("submit_manual_code", Error),
            (Fixture::Error, A::ReturnToCamera) => invalid("return_to_camera", Error),
            (Fixture::Error, A::Close) => Accepted(Error, Camera, Some(E::Closed)),

            (Fixture::ManualFromError, A::Initialize) => {
                Accepted(Scanning, Camera, Some(E::Mode(Camera)))
            }
            (Fixture::ManualFromError, A::Retry) => Accepted(Scanning, Camera, Some(E::Mode(Camera))),
            (Fixture::ManualFromError, A::Switch) => invalid("switch_camera", Error),
            (Fixture::ManualFromError, A::Decode) => Accepted(Error, Manual, None),
            (Fixture::ManualFromError, A::EnterManual) => Accepted(Error, Manual, None),
            (Fixture::ManualFromError, A::SubmitManual) => {
                Accepted(Error, Manual, Some(E::Scanned(ScanSource::Manual)))
            }
            (Fixture::ManualFromError, A::ReturnToCamera) => {
                Accepted(Scanning, Camera, Some(E::Mode(Camera)))
            }
            (Fixture::ManualFromError, A::Close) => Accepted(Error, Manual, Some(E::Closed)),

            (Fixture::CameraDelivered, A::Initialize) => {
                Accepted(Scanning, Camera, Some(E::StateTo(Scanning)))
            }
            (Fixture::CameraDelivered, A::Retry) => done(),
            (Fixture::CameraDelivered, A::Switch) => done(),
            (Fixture::CameraDelivered, A::Decode) => Accepted(Scanning, Camera, None),
            (Fixture::CameraDelivered, A::EnterManual) => done(),
            (Fixture::CameraDelivered, A::SubmitManual) => invalid("submit_manual_code", Scanning),
            (Fixture::CameraDelivered, A::ReturnToCamera) => invalid("return_to_camera", Scanning),
            (Fixture::CameraDelivered, A::Close) => Accepted(Scanning, Camera, Some(E::Closed)),

            (Fixture::ManualDelivered, A::Initialize) => {
                Accepted(Scanning, Camera, Some(E::Mode(Camera)))
            }
            (Fixture::ManualDelivered, A::Retry) => done(),
            (Fixture::ManualDelivered, A::Switch) => done(),
            (Fixture::ManualDelivered, A::Decode) => Accepted(Error, Manual, None),
            (Fixture::ManualDelivered, A::EnterManual) => done(),
            (Fixture::ManualDelivered, A::SubmitManual) => done(),
            (Fixture::ManualDelivered, A::ReturnToCamera) => done(),
            (Fixture::ManualDelivered, A::Close) => Accepted(Error, Manual, Some(E::Closed)),

            (Fixture::Closed, A::Close) => Accepted(Scanning, Camera, None),
            (Fixture::Closed, _) => Rejected(ActionError::Closed),
        }
    }

    fn emitted(event: &ScannerEvent) -> Option<Emitted> {
        match event {
            ScannerEvent::StateChanged { to, .. } => Some(Emitted::StateTo(*to)),
            ScannerEvent::ModeChanged { mode } => Some(Emitted::Mode(*mode)),
            ScannerEvent::Scanned { source, .. } => Some(Emitted::Scanned(*source)),
            ScannerEvent::Closed => Some(Emitted::Closed),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_every_state_handles_every_action() {
        let fixtures = [
            Fixture::Fresh,
            Fixture::Scanning,
            Fixture::Error,
            Fixture::ManualFromError,
            Fixture::CameraDelivered,
            Fixture::ManualDelivered,
            Fixture::Closed,
        ];
        let actions = [
            Action::Initialize,
            Action::Retry,
            Action::Switch,
            Action::Decode,
            Action::EnterManual,
            Action::SubmitManual,
            Action::ReturnToCamera,
            Action::Close,
        ];

        for fixture_kind in fixtures {
            for action in actions {
                let (mut controller, platform, recorder) = fixture(fixture_kind).await;
                let state_before = controller.state();
                let mode_before = controller.mode();
                let result = apply(&mut controller, &platform, action).await;
                let events = controller.drain_events();
                let case = format!("{:?} + {:?}", fixture_kind, action);

                match expected(fixture_kind, action) {
                    Outcome::Accepted(state, mode, event) => {
                        assert_eq!(result, Ok(()), "{}", case);
                        assert_eq!(controller.state(), state, "{}", case);
                        assert_eq!(controller.mode(), mode, "{}", case);
                        match event {
                            Some(event) => assert!(
                                events.iter().filter_map(emitted).any(|e| e == event),
                                "{}: expected {:?} in {:?}",
                                case,
                                event,
                                events
                            ),
                            None => assert!(events.is_empty(), "{}: {:?}", case, events),
                        }
                    }
                    Outcome::Rejected(error) => {
                        assert_eq!(result, Err(error), "{}", case);
                        assert_eq!(controller.state(), state_before, "{}", case);
                        assert_eq!(controller.mode(), mode_before, "{}", case);
                        assert!(events.is_empty(), "{}: {:?}", case, events);
                    }
                }

                let stats = platform.stats();
                assert!(stats.max_running_engines <= 1, "{}", case);
                if matches!(action, Action::Close) || matches!(fixture_kind, Fixture::Closed) {
                    assert_eq!(recorder.closes(), 1, "{}", case);
                    assert_eq!(stats.running_engines, 0, "{}", case);
                    assert!(controller.is_closed(), "{}", case);
                }
                if matches!(fixture_kind, Fixture::CameraDelivered | Fixture::ManualDelivered)
                    && !matches!(action, Action::Initialize)
                {
                    assert_eq!(recorder.scans().len(), 1, "{}", case);
                    assert!(controller.is_session_complete(), "{}", case);
                }
            }
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig::default());
        controller.initialize().await.unwrap();

        controller.close().await;
        controller.close().await;

        assert_eq!(recorder.closes(), 1);
        assert_eq!(platform.stats().running_engines, 0);
        assert!(controller.is_closed());
        assert_eq!(
            controller.initialize().await,
            Err(ActionError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_during_permission_request() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig::default());
        let handle = controller.handle();
        platform.set_hook(Arc::new(move |call: MockCall| {
            if call == MockCall::PermissionRequest {
                handle.request_close();
            }
        }));

        assert_eq!(controller.initialize().await, Err(ActionError::Closed));
        assert_eq!(controller.state(), ScannerState::RequestingPermission);
        assert_eq!(recorder.closes(), 1);

        let stats = platform.stats();
        assert_eq!(stats.live_tracks, 0);
        assert_eq!(stats.enumerations, 0);

        let events = controller.drain_events();
        assert_eq!(events.last(), Some(&ScannerEvent::Closed));
    }

    #[tokio::test]
    async fn test_engine_started_after_close_is_stopped() {
        let (mut controller, platform, recorder) = setup(MockPlatformConfig::default());
        let handle = controller.handle();
        platform.set_hook(Arc::new(move |call: MockCall| {
            if call == MockCall::EngineStart {
                handle.request_close();
            }
        }));

        assert_eq!(controller.initialize().await, Err(ActionError::Closed));
        assert_eq!(controller.state(), ScannerState::Starting);
        assert_eq!(recorder.closes(), 1);

        let stats = platform.stats();
        assert_eq!(stats.engine_starts, 1);
        assert_eq!(stats.running_engines, 0);
    }

    #[test]
    fn test_state_names() {
        for state in ScannerState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
        assert!(ScannerState::Error.is_resting());
        assert!(!ScannerState::Starting.is_resting());
    }
}
