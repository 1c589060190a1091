//! Error types for the QR camera scanner
//!
//! This module defines the closed failure taxonomy the scanner exposes to the
//! UI, the raw platform exception shape it receives from the runtime, and the
//! classification functions that convert one into the other.
//!
//! Raw [`PlatformError`]s never reach the controller's state: they are
//! classified at the boundary where they occur (permission negotiation,
//! enumeration, engine start) into a [`ScanError`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

use crate::ui::controller::ScannerState;

/// Closed set of camera acquisition failures
///
/// Each kind is independently user-actionable: it selects the localized
/// message and the recoveries offered in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The user (or a policy) explicitly refused camera access
    PermissionDenied,
    /// The permission prompt was closed without an explicit choice
    PermissionDismissed,
    /// No video input device is available
    NoCamera,
    /// The camera is held by another application or tab
    CameraInUse,
    /// The runtime exposes no media-capture API
    NotSupported,
    /// The context is not secure and not a local-development host
    HttpsRequired,
    /// The decoding engine failed to start for an unclassified reason
    StartFailed,
    /// The mount point for the viewfinder never appeared
    UiNotReady,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::PermissionDenied,
        ErrorKind::PermissionDismissed,
        ErrorKind::NoCamera,
        ErrorKind::CameraInUse,
        ErrorKind::NotSupported,
        ErrorKind::HttpsRequired,
        ErrorKind::StartFailed,
        ErrorKind::UiNotReady,
        ErrorKind::Unknown,
    ];

    /// Stable snake_case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::PermissionDismissed => "permission_dismissed",
            ErrorKind::NoCamera => "no_camera",
            ErrorKind::CameraInUse => "camera_in_use",
            ErrorKind::NotSupported => "not_supported",
            ErrorKind::HttpsRequired => "https_required",
            ErrorKind::StartFailed => "start_failed",
            ErrorKind::UiNotReady => "ui_not_ready",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether the error panel exposes the raw diagnostics from the debug log
    ///
    /// These are the failures that are hardest to classify automatically.
    pub fn shows_diagnostics(&self) -> bool {
        matches!(self, ErrorKind::UiNotReady | ErrorKind::StartFailed)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified scanner failure: one kind plus a free-text diagnostic detail
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ScanError {
    /// The classified kind
    pub kind: ErrorKind,
    /// Diagnostic detail for support (usually the raw platform error text)
    pub detail: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Raw exception surfaced by the runtime (DOMException-like)
///
/// `name` carries the exception class (`NotAllowedError`, `NotReadableError`,
/// ...) and `message` the free-form text. Some engines only report a message;
/// in that case `name` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformError {
    /// Exception name
    pub name: String,
    /// Exception message
    pub message: String,
}

impl PlatformError {
    /// Create a platform error from a name and a message
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a platform error that only carries a message
    pub fn message(message: &str) -> Self {
        Self::new("", message)
    }

    /// `name: message`, or whichever half is present
    pub fn describe(&self) -> String {
        match (self.name.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.name, self.message),
            (false, true) => self.name.clone(),
            (true, _) => self.message.clone(),
        }
    }

    /// Whether this is the engine complaining that it is not running
    ///
    /// Raised by `stop()` on an engine that never started or already stopped.
    pub fn is_not_running(&self) -> bool {
        let text = self.describe().to_lowercase();
        text.contains("not running")
            || text.contains("not started")
            || text.contains("already stopped")
            || text.contains("scanner is not scanning")
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::error::Error for PlatformError {}

/// Classify a failure from the permission probe or device enumeration
///
/// The `permission_dismissed` distinction relies on the exception message and
/// is a best-effort heuristic; browsers do not agree on the wording.
pub fn classify_permission_error(err: &PlatformError) -> ScanError {
    let detail = err.describe();
    let message = err.message.to_lowercase();

    let kind = match err.name.as_str() {
        "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
            if message.contains("dismiss") {
                ErrorKind::PermissionDismissed
            } else {
                ErrorKind::PermissionDenied
            }
        }
        "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => ErrorKind::NoCamera,
        "NotReadableError" | "TrackStartError" | "AbortError" => ErrorKind::CameraInUse,
        "NotSupportedError" | "TypeError" => ErrorKind::NotSupported,
        _ => ErrorKind::Unknown,
    };

    ScanError::new(kind, detail)
}

/// Classify a failure raised while starting the decoding engine
///
/// The same hardware failures as during the permission probe can surface at
/// this stage, often as bare strings, so the check falls back to the text.
pub fn classify_start_error(err: &PlatformError) -> ScanError {
    let detail = err.describe();
    let text = detail.to_lowercase();

    let kind = if !err.name.is_empty() {
        match classify_permission_error(err).kind {
            ErrorKind::PermissionDenied | ErrorKind::PermissionDismissed => {
                ErrorKind::PermissionDenied
            }
            ErrorKind::NoCamera => ErrorKind::NoCamera,
            ErrorKind::CameraInUse => ErrorKind::CameraInUse,
            _ => classify_start_text(&text),
        }
    } else {
        classify_start_text(&text)
    };

    ScanError::new(kind, detail)
}

fn classify_start_text(text: &str) -> ErrorKind {
    if text.contains("notallowed") || text.contains("permission") {
        ErrorKind::PermissionDenied
    } else if text.contains("notfound")
        || text.contains("no camera")
        || text.contains("requested device not found")
    {
        ErrorKind::NoCamera
    } else if text.contains("notreadable")
        || text.contains("in use")
        || text.contains("could not start video source")
    {
        ErrorKind::CameraInUse
    } else {
        ErrorKind::StartFailed
    }
}

/// Misuse of the controller API
///
/// These are distinct from [`ScanError`]: a camera failure moves the
/// controller into the `error` state, while an `ActionError` rejects a user
/// action that is not valid in the current state and leaves the state as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action is not available in the current state
    #[error("'{action}' is not available while the scanner is {state}")]
    InvalidState {
        /// Action that was attempted
        action: &'static str,
        /// State the controller was in
        state: ScannerState,
    },

    /// Switching cameras needs at least two ranked cameras
    #[error("Switching cameras requires at least 2 cameras, found {found}")]
    NotEnoughCameras { found: usize },

    /// The scanner has been closed or a close was requested
    #[error("The scanner has been closed")]
    Closed,

    /// A result was already delivered for this session
    #[error("A result was already delivered for this scan session")]
    SessionComplete,

    /// The manual code was rejected
    #[error(transparent)]
    ManualEntry(#[from] ManualEntryError),
}

/// Manual-entry validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManualEntryError {
    /// The code was empty after trimming
    #[error("Please enter a code")]
    Empty,
}

/// Result type alias for controller actions
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_classification_by_name() {
        let cases = vec![
            ("NotAllowedError", "Permission denied", ErrorKind::PermissionDenied),
            ("PermissionDeniedError", "", ErrorKind::PermissionDenied),
            ("SecurityError", "blocked by policy", ErrorKind::PermissionDenied),
            ("NotFoundError", "Requested device not found", ErrorKind::NoCamera),
            ("DevicesNotFoundError", "", ErrorKind::NoCamera),
            ("OverconstrainedError", "", ErrorKind::NoCamera),
            ("NotReadableError", "Could not start video source", ErrorKind::CameraInUse),
            ("TrackStartError", "", ErrorKind::CameraInUse),
            ("AbortError", "", ErrorKind::CameraInUse),
            ("NotSupportedError", "", ErrorKind::NotSupported),
            ("TypeError", "getUserMedia is undefined", ErrorKind::NotSupported),
            ("WeirdError", "something", ErrorKind::Unknown),
        ];

        for (name, message, expected) in cases {
            let err = PlatformError::new(name, message);
            assert_eq!(
                classify_permission_error(&err).kind,
                expected,
                "Failed for: {}",
                name
            );
        }
    }

    #[test]
    fn test_permission_dismissed_detected_by_message() {
        let err = PlatformError::new("NotAllowedError", "Permission dismissed");
        let classified = classify_permission_error(&err);
        assert_eq!(classified.kind, ErrorKind::PermissionDismissed);
        assert_eq!(classified.detail, "NotAllowedError: Permission dismissed");

        let err = PlatformError::new("NotAllowedError", "The prompt was DISMISSED by the user");
        assert_eq!(
            classify_permission_error(&err).kind,
            ErrorKind::PermissionDismissed
        );
    }

    #[test]
    fn test_start_classification() {
        let by_name = PlatformError::new("NotReadableError", "Device in use");
        assert_eq!(classify_start_error(&by_name).kind, ErrorKind::CameraInUse);

        let dismissed = PlatformError::new("NotAllowedError", "Permission dismissed");
        assert_eq!(
            classify_start_error(&dismissed).kind,
            ErrorKind::PermissionDenied
        );

        let text_only = PlatformError::message("NotFoundError: Requested device not found");
        assert_eq!(classify_start_error(&text_only).kind, ErrorKind::NoCamera);

        let in_use = PlatformError::message("Could not start video source");
        assert_eq!(classify_start_error(&in_use).kind, ErrorKind::CameraInUse);

        let other = PlatformError::message("Camera streaming not supported by the browser.");
        assert_eq!(classify_start_error(&other).kind, ErrorKind::StartFailed);

        let unknown_name = PlatformError::new("WeirdError", "boom");
        assert_eq!(classify_start_error(&unknown_name).kind, ErrorKind::StartFailed);
    }

    #[test]
    fn test_platform_error_describe() {
        assert_eq!(PlatformError::new("A", "b").describe(), "A: b");
        assert_eq!(PlatformError::new("A", "").describe(), "A");
        assert_eq!(PlatformError::message("only text").describe(), "only text");
        assert_eq!(format!("{}", PlatformError::new("A", "b")), "A: b");
    }

    #[test]
    fn test_not_running_detection() {
        assert!(PlatformError::message("Cannot stop, scanner is not running or paused.")
            .is_not_running());
        assert!(PlatformError::new("StateError", "Scanner not started").is_not_running());
        assert!(!PlatformError::new("NotReadableError", "busy").is_not_running());
    }

    #[test]
    fn test_diagnostics_only_for_hard_failures() {
        for kind in ErrorKind::ALL {
            let expected = matches!(kind, ErrorKind::UiNotReady | ErrorKind::StartFailed);
            assert_eq!(kind.shows_diagnostics(), expected, "Failed for: {}", kind);
        }
    }

    #[test]
    fn test_error_kind_serde_names() {
        let json = serde_json::to_string(&ErrorKind::PermissionDismissed).unwrap();
        assert_eq!(json, "\"permission_dismissed\"");
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
