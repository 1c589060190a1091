//! Scan engine adapter
//!
//! Wraps the platform's frame-decoding engine behind a small lifecycle:
//! wait for the mount point, start on a device, stop. The adapter owns at most
//! one engine instance at a time and guarantees that each start delivers at
//! most one decoded result.

use crossbeam_channel::Sender;
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::error::{classify_start_error, ErrorKind, ScanError};
use crate::device::traits::{
    CameraPlatform, DecodeCallbacks, EngineConfig, EngineState, ScanEngine,
};

/// Proof that the viewfinder mount point exists
///
/// Only [`wait_for_mount_point`] creates one, and [`ScanEngineAdapter::start`]
/// requires one, so an engine is never constructed against a missing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    id: String,
}

impl MountPoint {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Poll for the mount point once per animation frame
///
/// The element is checked exactly `max_attempts` times (at least once), with a
/// frame yield between checks. Exhaustion fails with `ui_not_ready`.
pub async fn wait_for_mount_point<P>(
    platform: &P,
    element_id: &str,
    max_attempts: u32,
) -> Result<MountPoint, ScanError>
where
    P: CameraPlatform + ?Sized,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if platform.mount_point_exists(element_id) {
            debug!(
                "Mount point '{}' ready after {} check(s)",
                element_id, attempt
            );
            return Ok(MountPoint {
                id: element_id.to_string(),
            });
        }
        if attempt < max_attempts {
            platform.next_animation_frame().await;
        }
    }

    Err(ScanError::new(
        ErrorKind::UiNotReady,
        format!(
            "Mount point '{}' not found after {} frames",
            element_id, max_attempts
        ),
    ))
}

/// Owner of the single active engine instance
pub struct ScanEngineAdapter {
    config: EngineConfig,
    engine: Option<Box<dyn ScanEngine>>,
    active_device: Option<String>,
    /// Closed once the current session delivered a result or was stopped
    decode_gate: Arc<AtomicBool>,
    starts: u64,
}

impl ScanEngineAdapter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: None,
            active_device: None,
            decode_gate: Arc::new(AtomicBool::new(true)),
            starts: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether an engine instance is currently held
    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    /// Device the active engine was started on
    pub fn active_device(&self) -> Option<&str> {
        self.active_device.as_deref()
    }

    /// State reported by the active engine
    pub fn engine_state(&self) -> EngineState {
        self.engine
            .as_ref()
            .map(|e| e.state())
            .unwrap_or(EngineState::NotStarted)
    }

    /// Number of successful starts
    pub fn start_count(&self) -> u64 {
        self.starts
    }

    /// Start decoding on `device_id`
    ///
    /// Any running instance is stopped first. The first decoded text of this
    /// start is sent to `decodes`; later decodes from the same start are
    /// dropped.
    pub async fn start<P>(
        &mut self,
        platform: &P,
        device_id: &str,
        mount: &MountPoint,
        decodes: Sender<String>,
    ) -> Result<(), ScanError>
    where
        P: CameraPlatform + ?Sized,
    {
        self.stop().await;

        let mut engine = platform
            .create_engine(mount.id(), &self.config.formats)
            .map_err(|e| ScanError::new(ErrorKind::StartFailed, e.describe()))?;

        let gate = Arc::new(AtomicBool::new(false));
        let success_gate = Arc::clone(&gate);
        let callbacks = DecodeCallbacks {
            on_success: Box::new(move |text: String| {
                if success_gate.swap(true, Ordering::SeqCst) {
                    trace!("Dropping decode after session result");
                    return;
                }
                if decodes.send(text).is_err() {
                    debug!("Decode receiver dropped");
                }
            }),
            on_frame_error: Box::new(|message: &str| {
                trace!("No code in frame: {}", message);
            }),
        };

        debug!(
            "Starting engine on '{}' ({} fps, mount '{}')",
            device_id,
            self.config.fps,
            mount.id()
        );

        engine
            .start(device_id, &self.config, callbacks)
            .await
            .map_err(|e| {
                let classified = classify_start_error(&e);
                debug!("Engine start failed: {} -> {}", e, classified.kind);
                classified
            })?;

        self.engine = Some(engine);
        self.active_device = Some(device_id.to_string());
        self.decode_gate = gate;
        self.starts += 1;
        Ok(())
    }

    /// Stop and release the active engine
    ///
    /// Safe to call at any time; an engine that reports it is not running is
    /// not an error.
    pub async fn stop(&mut self) {
        self.decode_gate.store(true, Ordering::SeqCst);
        self.active_device = None;

        let Some(mut engine) = self.engine.take() else {
            return;
        };

        match engine.stop().await {
            Ok(()) => debug!("Engine stopped"),
            Err(e) if e.is_not_running() => trace!("Engine already stopped: {}", e),
            Err(e) => warn!("Engine stop failed: {}", e),
        }
    }
}
