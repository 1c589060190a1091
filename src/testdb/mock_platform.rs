//! Simulated camera platform for testing without a browser or camera
//!
//! This module provides mock implementations of the platform traits that
//! simulate a device with configurable cameras, permission outcomes, a
//! viewfinder mount point that appears after a delay, and a decoding engine
//! whose decodes are injected by the test.

use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::core::error::PlatformError;
use crate::device::traits::{
    BarcodeFormat, CameraPlatform, DecodeCallbacks, EngineConfig, EngineState, MediaDeviceInfo,
    MediaStream, RuntimeContext, ScanEngine, VideoConstraints,
};

/// Platform call a hook can intercept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    /// The permission probe stream was requested
    PermissionRequest,
    /// Devices were enumerated
    Enumerate,
    /// An engine was asked to start
    EngineStart,
}

/// Callback invoked when a platform call happens, before it resolves
pub type MockHook = Arc<dyn Fn(MockCall) + Send + Sync>;

/// Configuration for simulated platform behavior
#[derive(Debug, Clone)]
pub struct MockPlatformConfig {
    /// Execution context reported to the capability probe
    pub context: RuntimeContext,
    /// Outcomes of successive permission requests (granted once exhausted)
    pub permission_results: Vec<Result<(), PlatformError>>,
    /// Devices returned by enumeration
    pub devices: Vec<MediaDeviceInfo>,
    /// Make enumeration fail
    pub enumerate_error: Option<PlatformError>,
    /// Element id of the viewfinder mount point
    pub mount_element_id: String,
    /// Failed checks before the mount point appears (`None` = never)
    pub mount_ready_after: Option<u32>,
    /// Make engine construction fail
    pub create_engine_error: Option<PlatformError>,
    /// Outcomes of successive engine starts (success once exhausted)
    pub engine_start_results: Vec<Result<(), PlatformError>>,
    /// Tracks in each granted probe stream
    pub tracks_per_stream: usize,
    /// Animation-frame interval (0 = yield to the runtime only)
    pub frame_interval_ms: u64,
    /// Random extra delay added to each frame, up to this many milliseconds
    pub frame_jitter_ms: u64,
    /// Rendered viewfinder size (width, height) in pixels
    pub viewfinder: (u32, u32),
}

impl Default for MockPlatformConfig {
    fn default() -> Self {
        Self {
            context: RuntimeContext::default(),
            permission_results: Vec::new(),
            devices: vec![
                MediaDeviceInfo::video("cam-back", "Back Camera"),
                MediaDeviceInfo::video("cam-front", "Front Camera"),
            ],
            enumerate_error: None,
            mount_element_id: "qr-reader".to_string(),
            mount_ready_after: Some(0),
            create_engine_error: None,
            engine_start_results: Vec::new(),
            tracks_per_stream: 1,
            frame_interval_ms: 0,
            frame_jitter_ms: 0,
            viewfinder: (640, 480),
        }
    }
}

/// Counters recorded by the simulated platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockStats {
    pub permission_requests: usize,
    pub streams_granted: usize,
    /// Probe tracks acquired and not yet stopped
    pub live_tracks: usize,
    pub last_constraints: Option<VideoConstraints>,
    pub enumerations: usize,
    pub mount_checks: u32,
    pub frames_yielded: u32,
    pub engines_created: usize,
    pub engine_starts: usize,
    pub engine_stops: usize,
    /// Engines currently in the scanning state
    pub running_engines: usize,
    /// Highest number of simultaneously running engines seen
    pub max_running_engines: usize,
    /// Devices passed to successful engine starts, in order
    pub started_devices: Vec<String>,
    /// Scan square of the most recent successful start
    pub last_scan_region: Option<(u32, u32)>,
}

/// Mutable platform state shared with streams and engines
struct MockShared {
    stats: MockStats,
    permission_results: VecDeque<Result<(), PlatformError>>,
    engine_start_results: VecDeque<Result<(), PlatformError>>,
    engines: Vec<Arc<Mutex<MockEngineSlot>>>,
    hook: Option<MockHook>,
}

/// Engine state visible to the platform (for decode injection)
struct MockEngineSlot {
    state: EngineState,
    device_id: Option<String>,
    callbacks: Option<DecodeCallbacks>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated platform implementing [`CameraPlatform`]
#[derive(Clone)]
pub struct MockPlatform {
    config: Arc<MockPlatformConfig>,
    shared: Arc<Mutex<MockShared>>,
}

impl fmt::Debug for MockPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPlatform")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl MockPlatform {
    pub fn new(config: MockPlatformConfig) -> Self {
        let shared = MockShared {
            stats: MockStats::default(),
            permission_results: config.permission_results.iter().cloned().collect(),
            engine_start_results: config.engine_start_results.iter().cloned().collect(),
            engines: Vec::new(),
            hook: None,
        };
        Self {
            config: Arc::new(config),
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    pub fn config(&self) -> &MockPlatformConfig {
        &self.config
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> MockStats {
        lock(&self.shared).stats.clone()
    }

    /// Install a hook called at the start of intercepted platform calls
    pub fn set_hook(&self, hook: MockHook) {
        lock(&self.shared).hook = Some(hook);
    }

    /// Deliver decoded text to every running engine
    ///
    /// Returns `false` when no engine is scanning.
    pub fn emit_decode(&self, text: &str) -> bool {
        let engines = lock(&self.shared).engines.clone();
        let mut delivered = false;
        for slot in engines {
            let slot = lock(&slot);
            if slot.state != EngineState::Scanning {
                continue;
            }
            if let Some(callbacks) = &slot.callbacks {
                (callbacks.on_success)(text.to_string());
                delivered = true;
            }
        }
        delivered
    }

    /// Report a frame without a code to every running engine
    pub fn emit_frame_miss(&self) {
        let engines = lock(&self.shared).engines.clone();
        for slot in engines {
            let slot = lock(&slot);
            if slot.state != EngineState::Scanning {
                continue;
            }
            if let Some(callbacks) = &slot.callbacks {
                (callbacks.on_frame_error)("No MultiFormat Readers were able to detect the code.");
            }
        }
    }

    /// Engine instances that have not been stopped or dropped
    pub fn live_engine_slots(&self) -> usize {
        lock(&self.shared).engines.len()
    }

    /// Device of the most recently started running engine
    pub fn scanning_device(&self) -> Option<String> {
        let engines = lock(&self.shared).engines.clone();
        engines.iter().rev().find_map(|slot| {
            let slot = lock(slot);
            if slot.state == EngineState::Scanning {
                slot.device_id.clone()
            } else {
                None
            }
        })
    }

    fn run_hook(&self, call: MockCall) {
        // Called without holding the lock so the hook may use the platform
        let hook = lock(&self.shared).hook.clone();
        if let Some(hook) = hook {
            hook(call);
        }
    }
}

#[async_trait]
impl CameraPlatform for MockPlatform {
    fn runtime_context(&self) -> RuntimeContext {
        self.config.context.clone()
    }

    async fn request_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, PlatformError> {
        self.run_hook(MockCall::PermissionRequest);
        tokio::task::yield_now().await;

        let mut shared = lock(&self.shared);
        shared.stats.permission_requests += 1;
        shared.stats.last_constraints = Some(constraints.clone());

        shared.permission_results.pop_front().unwrap_or(Ok(()))?;

        let tracks = self.config.tracks_per_stream;
        shared.stats.streams_granted += 1;
        shared.stats.live_tracks += tracks;

        Ok(Box::new(MockStream {
            tracks,
            shared: Arc::clone(&self.shared),
        }))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, PlatformError> {
        self.run_hook(MockCall::Enumerate);
        tokio::task::yield_now().await;

        lock(&self.shared).stats.enumerations += 1;
        match &self.config.enumerate_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.config.devices.clone()),
        }
    }

    fn mount_point_exists(&self, element_id: &str) -> bool {
        let mut shared = lock(&self.shared);
        shared.stats.mount_checks += 1;
        let checks = shared.stats.mount_checks;

        element_id == self.config.mount_element_id
            && self.config.mount_ready_after.is_some_and(|after| checks > after)
    }

    async fn next_animation_frame(&self) {
        lock(&self.shared).stats.frames_yielded += 1;

        let jitter = if self.config.frame_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.frame_jitter_ms)
        } else {
            0
        };
        let delay = self.config.frame_interval_ms + jitter;

        if delay == 0 {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn create_engine(
        &self,
        element_id: &str,
        formats: &[BarcodeFormat],
    ) -> Result<Box<dyn ScanEngine>, PlatformError> {
        if let Some(err) = &self.config.create_engine_error {
            return Err(err.clone());
        }
        if element_id != self.config.mount_element_id {
            return Err(PlatformError::message(&format!(
                "HTML Element with id={} not found",
                element_id
            )));
        }

        let slot = Arc::new(Mutex::new(MockEngineSlot {
            state: EngineState::NotStarted,
            device_id: None,
            callbacks: None,
        }));

        let mut shared = lock(&self.shared);
        shared.stats.engines_created += 1;
        shared.engines.push(Arc::clone(&slot));

        Ok(Box::new(MockEngine {
            formats: formats.to_vec(),
            slot,
            platform: self.clone(),
        }))
    }
}

/// Granted probe stream
struct MockStream {
    tracks: usize,
    shared: Arc<Mutex<MockShared>>,
}

impl MediaStream for MockStream {
    fn live_track_count(&self) -> usize {
        self.tracks
    }

    fn stop_all_tracks(&mut self) {
        let mut shared = lock(&self.shared);
        shared.stats.live_tracks = shared.stats.live_tracks.saturating_sub(self.tracks);
        self.tracks = 0;
    }
}

/// Simulated decoding engine
pub struct MockEngine {
    formats: Vec<BarcodeFormat>,
    slot: Arc<Mutex<MockEngineSlot>>,
    platform: MockPlatform,
}

impl MockEngine {
    pub fn formats(&self) -> &[BarcodeFormat] {
        &self.formats
    }
}

#[async_trait]
impl ScanEngine for MockEngine {
    async fn start(
        &mut self,
        device_id: &str,
        config: &EngineConfig,
        callbacks: DecodeCallbacks,
    ) -> Result<(), PlatformError> {
        self.platform.run_hook(MockCall::EngineStart);
        tokio::task::yield_now().await;

        let mut shared = lock(&self.platform.shared);
        shared.stats.engine_starts += 1;
        shared.engine_start_results.pop_front().unwrap_or(Ok(()))?;

        let mut slot = lock(&self.slot);
        if slot.state.is_running() {
            return Err(PlatformError::message(
                "Cannot start scan, scanner is already scanning",
            ));
        }
        slot.state = EngineState::Scanning;
        slot.device_id = Some(device_id.to_string());
        slot.callbacks = Some(callbacks);

        shared.stats.running_engines += 1;
        shared.stats.max_running_engines = shared
            .stats
            .max_running_engines
            .max(shared.stats.running_engines);
        shared.stats.started_devices.push(device_id.to_string());
        let (width, height) = self.platform.config.viewfinder;
        shared.stats.last_scan_region = Some(config.scan_region(width, height));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlatformError> {
        tokio::task::yield_now().await;

        let mut shared = lock(&self.platform.shared);
        let mut slot = lock(&self.slot);
        if !slot.state.is_running() {
            return Err(PlatformError::message(
                "Cannot stop, scanner is not running or paused.",
            ));
        }

        slot.state = EngineState::Stopped;
        slot.callbacks = None;
        drop(slot);

        shared.engines.retain(|s| !Arc::ptr_eq(s, &self.slot));
        shared.stats.engine_stops += 1;
        shared.stats.running_engines = shared.stats.running_engines.saturating_sub(1);
        Ok(())
    }

    fn state(&self) -> EngineState {
        lock(&self.slot).state
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        // Engines that failed to start are released without a stop
        lock(&self.platform.shared)
            .engines
            .retain(|s| !Arc::ptr_eq(s, &self.slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_permission_queue_then_granted() {
        let platform = MockPlatform::new(MockPlatformConfig {
            permission_results: vec![Err(PlatformError::new("NotAllowedError", "denied"))],
            ..Default::default()
        });
        let constraints = crate::core::config::ScannerSettings::default().probe_constraints();

        assert!(platform.request_video_stream(&constraints).await.is_err());
        let mut stream = platform.request_video_stream(&constraints).await.unwrap();
        assert_eq!(platform.stats().live_tracks, 1);
        stream.stop_all_tracks();
        assert_eq!(platform.stats().live_tracks, 0);
        assert_eq!(platform.stats().permission_requests, 2);
    }

    #[tokio::test]
    async fn test_hook_runs_before_call() {
        let platform = MockPlatform::new(MockPlatformConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        platform.set_hook(Arc::new(move |call: MockCall| {
            if call == MockCall::Enumerate {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        platform.enumerate_devices().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_stop_when_not_running() {
        let platform = MockPlatform::new(MockPlatformConfig::default());
        let mut engine = platform
            .create_engine("qr-reader", &[BarcodeFormat::QrCode])
            .unwrap();
        let err = engine.stop().await.unwrap_err();
        assert!(err.is_not_running());
    }

    #[test]
    fn test_create_engine_requires_mount_element() {
        let platform = MockPlatform::new(MockPlatformConfig::default());
        assert!(platform
            .create_engine("missing", &[BarcodeFormat::QrCode])
            .is_err());
    }

    #[tokio::test]
    async fn test_stopped_engines_release_their_slots() {
        let platform = MockPlatform::new(MockPlatformConfig::default());
        let config = crate::core::config::ScannerSettings::default().engine_config();

        for device in ["cam-back", "cam-front", "cam-back"] {
            let mut engine = platform
                .create_engine("qr-reader", &[BarcodeFormat::QrCode])
                .unwrap();
            engine
                .start(device, &config, DecodeCallbacks {
                    on_success: Box::new(|_: String| {}),
                    on_frame_error: Box::new(|_: &str| {}),
                })
                .await
                .unwrap();
            assert_eq!(platform.live_engine_slots(), 1);
            engine.stop().await.unwrap();
            assert_eq!(platform.live_engine_slots(), 0);
        }

        let stats = platform.stats();
        assert_eq!(stats.engine_stops, 3);
        assert_eq!(stats.last_scan_region, Some((336, 336)));
        assert!(!platform.emit_decode("LATE"));
    }

    #[tokio::test]
    async fn test_failed_start_releases_slot_on_drop() {
        let platform = MockPlatform::new(MockPlatformConfig {
            engine_start_results: vec![Err(PlatformError::message("busy"))],
            ..Default::default()
        });
        let config = crate::core::config::ScannerSettings::default().engine_config();

        let mut engine = platform
            .create_engine("qr-reader", &[BarcodeFormat::QrCode])
            .unwrap();
        assert!(engine
            .start("cam-back", &config, DecodeCallbacks {
                on_success: Box::new(|_: String| {}),
                on_frame_error: Box::new(|_: &str| {}),
            })
            .await
            .is_err());
        assert_eq!(platform.live_engine_slots(), 1);

        drop(engine);
        assert_eq!(platform.live_engine_slots(), 0);
    }

    #[tokio::test]
    async fn test_jittered_frames_are_counted() {
        let platform = MockPlatform::new(MockPlatformConfig {
            frame_interval_ms: 1,
            frame_jitter_ms: 2,
            ..Default::default()
        });
        platform.next_animation_frame().await;
        platform.next_animation_frame().await;
        assert_eq!(platform.stats().frames_yielded, 2);
    }
}
