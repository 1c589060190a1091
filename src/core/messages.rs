//! Localized message tables
//!
//! The scanner only knows two languages. Every user-facing string the status
//! surface shows comes from here, keyed by [`ErrorKind`], [`ScannerState`] or
//! [`Label`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::core::error::ErrorKind;
use crate::ui::controller::ScannerState;

/// Supported UI languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Th,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Th => "th",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "th" => Ok(Language::Th),
            other => Err(format!("Unsupported language '{}' (expected en or th)", other)),
        }
    }
}

/// Fixed UI labels (buttons, titles, prompts)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Title,
    Retry,
    ManualEntry,
    SwitchCamera,
    UseCamera,
    Close,
    Submit,
    ManualPrompt,
    ScanComplete,
    ShowDiagnostics,
    EmptyCode,
    RetryCount,
}

/// Message table for one language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Messages {
    language: Language,
}

impl Messages {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// User-facing explanation for an error kind
    pub fn error_message(&self, kind: ErrorKind) -> &'static str {
        match self.language {
            Language::En => match kind {
                ErrorKind::PermissionDenied => {
                    "Camera access was denied. Allow camera access in your browser settings, then tap Retry."
                }
                ErrorKind::PermissionDismissed => {
                    "The camera permission prompt was closed. Tap Retry to be asked again."
                }
                ErrorKind::NoCamera => "No camera was found on this device.",
                ErrorKind::CameraInUse => {
                    "The camera is being used by another app. Close it and tap Retry."
                }
                ErrorKind::NotSupported => "This browser does not support camera access.",
                ErrorKind::HttpsRequired => "Camera access requires a secure (HTTPS) connection.",
                ErrorKind::StartFailed => "The camera could not be started.",
                ErrorKind::UiNotReady => "The scanner view did not finish loading.",
                ErrorKind::Unknown => "An unexpected camera error occurred.",
            },
            Language::Th => match kind {
                ErrorKind::PermissionDenied => {
                    "ไม่ได้รับอนุญาตให้ใช้กล้อง กรุณาอนุญาตการเข้าถึงกล้องในการตั้งค่าเบราว์เซอร์ แล้วกดลองใหม่"
                }
                ErrorKind::PermissionDismissed => {
                    "คำขอสิทธิ์ใช้กล้องถูกปิดไป กดลองใหม่เพื่อขอสิทธิ์อีกครั้ง"
                }
                ErrorKind::NoCamera => "ไม่พบกล้องบนอุปกรณ์นี้",
                ErrorKind::CameraInUse => {
                    "กล้องกำลังถูกใช้งานโดยแอปอื่น กรุณาปิดแอปนั้นแล้วกดลองใหม่"
                }
                ErrorKind::NotSupported => "เบราว์เซอร์นี้ไม่รองรับการใช้งานกล้อง",
                ErrorKind::HttpsRequired => "การใช้งานกล้องต้องใช้การเชื่อมต่อที่ปลอดภัย (HTTPS)",
                ErrorKind::StartFailed => "ไม่สามารถเปิดกล้องได้",
                ErrorKind::UiNotReady => "หน้าจอสแกนยังโหลดไม่เสร็จ",
                ErrorKind::Unknown => "เกิดข้อผิดพลาดที่ไม่คาดคิดกับกล้อง",
            },
        }
    }

    /// Status line for a lifecycle state
    pub fn status_message(&self, state: ScannerState) -> &'static str {
        match self.language {
            Language::En => match state {
                ScannerState::Initializing => "Initializing scanner...",
                ScannerState::RequestingPermission => "Requesting camera permission...",
                ScannerState::SelectingCamera => "Looking for cameras...",
                ScannerState::PreparingUi => "Preparing scanner view...",
                ScannerState::Starting => "Starting camera...",
                ScannerState::Scanning => "Point the camera at a QR code",
                ScannerState::Error => "Camera unavailable",
            },
            Language::Th => match state {
                ScannerState::Initializing => "กำลังเตรียมเครื่องสแกน...",
                ScannerState::RequestingPermission => "กำลังขอสิทธิ์ใช้กล้อง...",
                ScannerState::SelectingCamera => "กำลังค้นหากล้อง...",
                ScannerState::PreparingUi => "กำลังเตรียมหน้าจอสแกน...",
                ScannerState::Starting => "กำลังเปิดกล้อง...",
                ScannerState::Scanning => "หันกล้องไปที่คิวอาร์โค้ด",
                ScannerState::Error => "ไม่สามารถใช้กล้องได้",
            },
        }
    }

    /// Fixed label text
    pub fn label(&self, label: Label) -> &'static str {
        match self.language {
            Language::En => match label {
                Label::Title => "Scan QR code",
                Label::Retry => "Retry",
                Label::ManualEntry => "Enter code manually",
                Label::SwitchCamera => "Switch camera",
                Label::UseCamera => "Use camera",
                Label::Close => "Close",
                Label::Submit => "Submit",
                Label::ManualPrompt => "Enter the code",
                Label::ScanComplete => "Code received",
                Label::ShowDiagnostics => "Show diagnostics",
                Label::EmptyCode => "Please enter a code",
                Label::RetryCount => "Attempts",
            },
            Language::Th => match label {
                Label::Title => "สแกนคิวอาร์โค้ด",
                Label::Retry => "ลองใหม่",
                Label::ManualEntry => "กรอกรหัสเอง",
                Label::SwitchCamera => "สลับกล้อง",
                Label::UseCamera => "ใช้กล้อง",
                Label::Close => "ปิด",
                Label::Submit => "ยืนยัน",
                Label::ManualPrompt => "กรอกรหัส",
                Label::ScanComplete => "ได้รับรหัสแล้ว",
                Label::ShowDiagnostics => "แสดงข้อมูลวินิจฉัย",
                Label::EmptyCode => "กรุณากรอกรหัส",
                Label::RetryCount => "จำนวนครั้งที่ลอง",
            },
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!(" TH ".parse::<Language>().unwrap(), Language::Th);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_every_error_kind_has_a_message_in_both_languages() {
        for language in [Language::En, Language::Th] {
            let messages = Messages::new(language);
            for kind in ErrorKind::ALL {
                assert!(
                    !messages.error_message(kind).is_empty(),
                    "Missing {} message for {}",
                    language,
                    kind
                );
            }
        }
    }

    #[test]
    fn test_languages_differ() {
        let en = Messages::new(Language::En);
        let th = Messages::new(Language::Th);
        assert_ne!(
            en.error_message(ErrorKind::NoCamera),
            th.error_message(ErrorKind::NoCamera)
        );
        assert_ne!(en.label(Label::Retry), th.label(Label::Retry));
        assert_eq!(th.label(Label::Retry), "ลองใหม่");
    }

    #[test]
    fn test_language_serde() {
        let json = serde_json::to_string(&Language::Th).unwrap();
        assert_eq!(json, "\"th\"");
        let parsed: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Language::En);
    }
}
