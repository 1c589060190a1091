//! UI Events Module
//!
//! Defines the events the scanner controller emits for UI frontends. They are
//! sent through a channel and consumed by any frontend (the CLI prints them).

use serde::Serialize;
use std::fmt::{self, Display};

use crate::core::error::ErrorKind;
use crate::device::ranking::CameraDevice;
use crate::ui::controller::{InputMode, ScannerState};

/// Where a delivered code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    /// Decoded from a camera frame
    Camera,
    /// Typed by the user
    Manual,
}

impl Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanSource::Camera => write!(f, "camera"),
            ScanSource::Manual => write!(f, "manual"),
        }
    }
}

/// Events emitted by the scanner controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScannerEvent {
    /// The lifecycle state changed
    StateChanged {
        from: ScannerState,
        to: ScannerState,
        /// Active error at the time of the transition
        error: Option<ErrorKind>,
    },

    /// Cameras were enumerated and ranked
    CamerasRanked {
        /// Ranked list, best first
        cameras: Vec<CameraDevice>,
    },

    /// A camera was chosen for the next engine start
    CameraSelected {
        index: usize,
        label: String,
    },

    /// The scanner entered the error state
    ErrorRaised {
        kind: ErrorKind,
        detail: String,
    },

    /// The input mode changed (camera or manual entry)
    ModeChanged { mode: InputMode },

    /// A code was delivered to the application
    Scanned { code: String, source: ScanSource },

    /// The scanner was torn down
    Closed,
}

impl ScannerEvent {
    /// Short one-line description for terminal output
    pub fn summary(&self) -> String {
        match self {
            ScannerEvent::StateChanged { from, to, .. } => format!("{} -> {}", from, to),
            ScannerEvent::CamerasRanked { cameras } => {
                format!("{} camera(s) ranked", cameras.len())
            }
            ScannerEvent::CameraSelected { index, label } => {
                format!("Selected camera #{}: {}", index + 1, label)
            }
            ScannerEvent::ErrorRaised { kind, detail } => format!("Error {}: {}", kind, detail),
            ScannerEvent::ModeChanged { mode } => format!("Input mode: {}", mode),
            ScannerEvent::Scanned { code, source } => format!("Scanned ({}): {}", source, code),
            ScannerEvent::Closed => "Scanner closed".to_string(),
        }
    }
}
