//! Platform abstraction traits
//!
//! This module defines the boundary between the scanner and the runtime it
//! runs in: the media-device API (permission probe, enumeration, stream
//! release), the view tree that hosts the viewfinder, and the frame-decoding
//! engine. A browser binding, a native camera backend and the simulated
//! platform in [`crate::testdb`] all implement these traits, so the controller
//! never depends on a concrete runtime.
//!
//! # Architecture
//!
//! - `CameraPlatform` - runtime context, media devices, mount points, engines
//! - `MediaStream` - a granted stream whose tracks must be released
//! - `ScanEngine` - one decoding engine instance bound to a mount point
//!
//! All hardware calls are asynchronous. Callers await them strictly one at a
//! time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::core::error::PlatformError;

/// Facts about the execution context checked before touching the camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeContext {
    /// Whether the page/app runs in a secure context (HTTPS or equivalent)
    pub secure_context: bool,
    /// Host name the app is served from
    pub hostname: String,
    /// Whether a media-capture API is exposed at all
    pub media_devices_available: bool,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            secure_context: true,
            hostname: "localhost".to_string(),
            media_devices_available: true,
        }
    }
}

/// Preferred camera direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear-facing ("environment")
    Environment,
    /// Front-facing ("user")
    User,
}

/// Video constraints for a stream request (all values are ideals, not exact)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

/// Kind of a media device entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// One entry of the platform's device list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    /// Opaque identifier, stable for the session
    pub device_id: String,
    /// Human-readable label (empty before permission is granted)
    pub label: String,
    pub kind: MediaDeviceKind,
}

impl MediaDeviceInfo {
    /// Create a video input entry
    pub fn video(device_id: &str, label: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            label: label.to_string(),
            kind: MediaDeviceKind::VideoInput,
        }
    }

    pub fn is_video_input(&self) -> bool {
        self.kind == MediaDeviceKind::VideoInput
    }
}

/// Symbologies the engine may be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    QrCode,
}

/// Engine start configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target decode rate
    pub fps: u32,
    /// Side of the centered scan square relative to the shorter viewfinder edge
    pub qrbox_ratio: f32,
    /// Symbologies to decode
    pub formats: Vec<BarcodeFormat>,
}

/// Smallest scan square the engine accepts, in pixels
pub const MIN_SCAN_REGION: u32 = 50;

impl EngineConfig {
    /// Centered square scan region for a given viewfinder size
    pub fn scan_region(&self, viewfinder_width: u32, viewfinder_height: u32) -> (u32, u32) {
        let shorter = viewfinder_width.min(viewfinder_height) as f32;
        let side = ((shorter * self.qrbox_ratio).round() as u32).max(MIN_SCAN_REGION);
        (side, side)
    }
}

/// Lifecycle state reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Scanning,
    Paused,
    Stopped,
}

impl EngineState {
    /// Whether `stop()` has anything to stop
    pub fn is_running(&self) -> bool {
        matches!(self, EngineState::Scanning | EngineState::Paused)
    }
}

impl Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::NotStarted => "not started",
            EngineState::Scanning => "scanning",
            EngineState::Paused => "paused",
            EngineState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Called with the decoded text of a frame
pub type SuccessCallback = Box<dyn Fn(String) + Send + Sync>;

/// Called for frames in which no code was found
pub type FrameErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Callbacks handed to [`ScanEngine::start`]
pub struct DecodeCallbacks {
    pub on_success: SuccessCallback,
    pub on_frame_error: FrameErrorCallback,
}

/// A granted media stream
pub trait MediaStream: Send {
    /// Number of live hardware tracks
    fn live_track_count(&self) -> usize;

    /// Stop every track, releasing the hardware
    fn stop_all_tracks(&mut self);
}

/// One frame-decoding engine instance bound to a mount point
#[async_trait]
pub trait ScanEngine: Send {
    /// Open `device_id` and begin decoding
    ///
    /// Only the centered square from [`EngineConfig::scan_region`] is decoded.
    async fn start(
        &mut self,
        device_id: &str,
        config: &EngineConfig,
        callbacks: DecodeCallbacks,
    ) -> Result<(), PlatformError>;

    /// Stop decoding and release the camera
    ///
    /// Engines report an error when they are not running.
    async fn stop(&mut self) -> Result<(), PlatformError>;

    fn state(&self) -> EngineState;
}

/// The runtime the scanner is embedded in
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Execution-context facts for the capability probe
    fn runtime_context(&self) -> RuntimeContext;

    /// Request a video stream, surfacing the permission prompt if needed
    async fn request_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, PlatformError>;

    /// List media devices (labels are only populated after permission)
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, PlatformError>;

    /// Whether the element with this id exists in the view tree
    fn mount_point_exists(&self, element_id: &str) -> bool;

    /// Yield until the next animation frame
    async fn next_animation_frame(&self);

    /// Construct an engine rendering into `element_id`, restricted to `formats`
    fn create_engine(
        &self,
        element_id: &str,
        formats: &[BarcodeFormat],
    ) -> Result<Box<dyn ScanEngine>, PlatformError>;
}
