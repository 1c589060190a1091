//! Scanner status surface
//!
//! A localized, serializable snapshot of everything a frontend renders: the
//! status line, the error panel with its recoveries and diagnostics, and the
//! camera controls.

use serde::Serialize;

use crate::core::debug_log::DebugLog;
use crate::core::error::{ErrorKind, ScanError};
use crate::core::messages::{Label, Messages};
use crate::device::traits::CameraPlatform;
use crate::ui::controller::{InputMode, ScannerController, ScannerState};

/// Recovery offered in the error state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Re-run initialization (counts as a retry)
    Retry,
    /// Switch to typing the code
    ManualEntry,
}

impl Recovery {
    pub fn label(&self, messages: &Messages) -> &'static str {
        match self {
            Recovery::Retry => messages.label(Label::Retry),
            Recovery::ManualEntry => messages.label(Label::ManualEntry),
        }
    }
}

/// Error panel contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPanel {
    pub kind: ErrorKind,
    /// Localized explanation
    pub message: String,
    /// Raw diagnostic detail
    pub detail: String,
    pub recoveries: Vec<Recovery>,
    /// Debug log lines, only for failures that are hard to classify
    pub diagnostics: Option<Vec<String>>,
}

impl ErrorPanel {
    pub fn new(error: &ScanError, messages: &Messages, debug_log: &DebugLog) -> Self {
        let diagnostics = if error.kind.shows_diagnostics() {
            Some(debug_log.render_lines())
        } else {
            None
        };

        Self {
            kind: error.kind,
            message: messages.error_message(error.kind).to_string(),
            detail: error.detail.clone(),
            recoveries: vec![Recovery::Retry, Recovery::ManualEntry],
            diagnostics,
        }
    }
}

/// Snapshot of the scanner for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannerStatus {
    pub title: String,
    pub state: ScannerState,
    pub mode: InputMode,
    /// Localized status line
    pub status_text: String,
    pub error: Option<ErrorPanel>,
    pub selected_camera: Option<String>,
    pub camera_count: usize,
    pub can_switch_camera: bool,
    pub retry_count: u32,
    pub session_complete: bool,
    pub closed: bool,
}

impl ScannerStatus {
    pub fn from_controller<P: CameraPlatform>(controller: &ScannerController<P>) -> Self {
        let messages = controller.messages();
        let state = controller.state();

        let session_complete = controller.is_session_complete();

        let status_text = if session_complete {
            messages.label(Label::ScanComplete)
        } else {
            match controller.mode() {
                InputMode::Manual => messages.label(Label::ManualPrompt),
                InputMode::Camera => messages.status_message(state),
            }
        };

        // No recoveries once manual entry or delivery closed the camera path
        let error = match (state, controller.error()) {
            (ScannerState::Error, Some(error))
                if controller.mode() == InputMode::Camera && !session_complete =>
            {
                Some(ErrorPanel::new(error, messages, controller.debug_log()))
            }
            _ => None,
        };

        Self {
            title: messages.label(Label::Title).to_string(),
            state,
            mode: controller.mode(),
            status_text: status_text.to_string(),
            error,
            selected_camera: controller.selected_camera().map(|c| c.label.clone()),
            camera_count: controller.cameras().len(),
            can_switch_camera: controller.can_switch_camera(),
            retry_count: controller.retry_count(),
            session_complete,
            closed: controller.is_closed(),
        }
    }

    /// Plain-text rendering for terminal frontends
    pub fn render_lines(&self, messages: &Messages) -> Vec<String> {
        let mut lines = vec![
            self.title.clone(),
            format!("  {}", self.status_text),
        ];

        if let Some(camera) = &self.selected_camera {
            lines.push(format!("  Camera: {} ({} found)", camera, self.camera_count));
        }

        if let Some(panel) = &self.error {
            lines.push(format!("  {}", panel.message));
            lines.push(format!("  ({})", panel.detail));
            let recoveries: Vec<&str> = panel
                .recoveries
                .iter()
                .map(|r| r.label(messages))
                .collect();
            lines.push(format!("  [{}]", recoveries.join("] [")));

            if let Some(diagnostics) = &panel.diagnostics {
                lines.push(format!("  {}:", messages.label(Label::ShowDiagnostics)));
                for line in diagnostics {
                    lines.push(format!("    {}", line));
                }
            }
        }

        if self.retry_count > 0 {
            lines.push(format!(
                "  {}: {}",
                messages.label(Label::RetryCount),
                self.retry_count
            ));
        }

        if self.can_switch_camera {
            lines.push(format!("  [{}]", messages.label(Label::SwitchCamera)));
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::error::PlatformError;
    use crate::core::messages::Language;
    use crate::testdb::{MockPlatform, MockPlatformConfig};
    use crate::ui::controller::ScannerCallbacks;

    fn controller(config: MockPlatformConfig) -> ScannerController<MockPlatform> {
        ScannerController::new(
            MockPlatform::new(config),
            &Config::default(),
            ScannerCallbacks::noop(),
        )
    }

    #[tokio::test]
    async fn test_permission_error_has_no_diagnostics() {
        let mut controller = controller(MockPlatformConfig {
            permission_results: vec![Err(PlatformError::new("NotAllowedError", "denied"))],
            ..Default::default()
        });
        controller.initialize().await.unwrap();

        let status = controller.status();
        let panel = status.error.unwrap();
        assert_eq!(panel.kind, ErrorKind::PermissionDenied);
        assert_eq!(panel.recoveries, vec![Recovery::Retry, Recovery::ManualEntry]);
        assert!(panel.diagnostics.is_none());
        assert_eq!(
            panel.message,
            Messages::new(Language::En).error_message(ErrorKind::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn test_start_failure_shows_diagnostics() {
        let mut controller = controller(MockPlatformConfig {
            engine_start_results: vec![Err(PlatformError::message("engine exploded"))],
            ..Default::default()
        });
        controller.initialize().await.unwrap();

        let status = controller.status();
        let diagnostics = status.error.unwrap().diagnostics.unwrap();
        assert!(diagnostics.iter().any(|l| l.contains("engine exploded")));
    }

    #[tokio::test]
    async fn test_scanning_status() {
        let mut controller = controller(MockPlatformConfig::default());
        controller.initialize().await.unwrap();

        let status = controller.status();
        assert!(status.error.is_none());
        assert!(status.can_switch_camera);
        assert_eq!(status.selected_camera.as_deref(), Some("Back Camera"));
        assert_eq!(status.camera_count, 2);

        let lines = status.render_lines(controller.messages());
        assert!(lines.iter().any(|l| l.contains("Switch camera")));
    }

    #[tokio::test]
    async fn test_error_panel_hidden_once_manual_entry_opens() {
        let mut controller = controller(MockPlatformConfig {
            permission_results: vec![Err(PlatformError::new("NotAllowedError", "denied"))],
            ..Default::default()
        });
        controller.initialize().await.unwrap();
        assert!(controller.status().error.is_some());

        controller.enter_manual_entry().await.unwrap();
        let status = controller.status();
        assert_eq!(status.state, ScannerState::Error);
        assert!(status.error.is_none());
        assert_eq!(status.status_text, "Enter the code");

        controller.submit_manual_code("abc").await.unwrap();
        let status = controller.status();
        assert!(status.session_complete);
        assert!(status.error.is_none());
        assert_eq!(status.status_text, "Code received");

        let lines = status.render_lines(controller.messages());
        assert!(!lines.iter().any(|l| l.contains("Retry")));
    }

    #[tokio::test]
    async fn test_camera_decode_shows_completed_status() {
        let platform = MockPlatform::new(MockPlatformConfig::default());
        let mut controller = ScannerController::new(
            platform.clone(),
            &Config::default(),
            ScannerCallbacks::noop(),
        );
        controller.initialize().await.unwrap();
        assert!(platform.emit_decode("ABC"));
        controller.process_decodes().await.unwrap();

        let status = controller.status();
        assert_eq!(status.state, ScannerState::Scanning);
        assert_eq!(status.status_text, "Code received");
        assert!(!status.can_switch_camera);

        assert_eq!(
            Messages::new(Language::Th).label(Label::ScanComplete),
            "ได้รับรหัสแล้ว"
        );
    }

    #[tokio::test]
    async fn test_manual_mode_status_text() {
        let mut controller = controller(MockPlatformConfig::default());
        controller.enter_manual_entry().await.unwrap();

        let status = controller.status();
        assert_eq!(status.mode, InputMode::Manual);
        assert_eq!(status.status_text, "Enter the code");
        assert!(!status.can_switch_camera);
    }
}
