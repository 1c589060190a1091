//! Camera ranking
//!
//! Scores devices by their labels so the best rear-facing camera is started
//! first. Labels are the only signal available without opening every device,
//! and vendors name them inconsistently, so the scoring is a keyword table.

use serde::{Deserialize, Serialize};

use crate::device::traits::MediaDeviceInfo;

// ============================================================================
// Keyword tables
// ============================================================================

/// Cameras that can never decode a QR code (IR, depth, auxiliary sensors)
const DENYLIST: &[&str] = &[
    "infrared",
    "ir camera",
    "depth",
    "tof",
    "time of flight",
    "time-of-flight",
    "auxiliary",
];

const REAR_KEYWORDS: &[&str] = &[
    "back",
    "rear",
    "environment",
    "main",
    "wide",
    "ultra",
    "primary",
    "camera 0",
    "facing back",
    "0,",
];

const FRONT_KEYWORDS: &[&str] = &["front", "user", "selfie", "face", "facetime", "facing front"];

pub const DENYLIST_SCORE: i32 = -100;
pub const REAR_KEYWORD_SCORE: i32 = 10;
pub const FRONT_KEYWORD_SCORE: i32 = -15;
/// Android logical camera 0 is almost always the main rear module
pub const LOGICAL_CAMERA_ZERO_BOOST: i32 = 20;
/// Score for a label that matched nothing (often an unlabeled device)
pub const NEUTRAL_SCORE: i32 = 5;

// ============================================================================
// Types
// ============================================================================

/// A ranked video input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Opaque platform identifier
    pub device_id: String,
    /// Display label (`Camera N` when the platform gave none)
    pub label: String,
    /// Best guess at whether the camera faces away from the user
    pub is_rear: bool,
    /// Ranking score, higher is better
    pub score: i32,
}

/// Result of scoring one label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelScore {
    pub score: i32,
    pub is_rear: bool,
}

// ============================================================================
// Scoring
// ============================================================================

/// Score a raw device label
pub fn score_label(label: &str) -> LabelScore {
    let label = label.to_lowercase();

    if DENYLIST.iter().any(|k| label.contains(k)) {
        return LabelScore {
            score: DENYLIST_SCORE,
            is_rear: false,
        };
    }

    let mut score = 0;
    let mut matched = false;
    let mut is_rear = true;

    for keyword in REAR_KEYWORDS {
        if label.contains(keyword) {
            score += REAR_KEYWORD_SCORE;
            matched = true;
        }
    }

    for keyword in FRONT_KEYWORDS {
        if label.contains(keyword) {
            score += FRONT_KEYWORD_SCORE;
            matched = true;
            is_rear = false;
        }
    }

    if label.contains("camera2 0") || label.starts_with("camera 0") {
        score += LOGICAL_CAMERA_ZERO_BOOST;
        matched = true;
        is_rear = true;
    }

    if !matched {
        return LabelScore {
            score: NEUTRAL_SCORE,
            is_rear: true,
        };
    }

    LabelScore { score, is_rear }
}

/// Score and sort video inputs, best first
///
/// The sort is stable: devices with equal scores keep their enumeration order.
pub fn rank_cameras(devices: &[MediaDeviceInfo]) -> Vec<CameraDevice> {
    let mut cameras: Vec<CameraDevice> = devices
        .iter()
        .enumerate()
        .map(|(index, device)| {
            let LabelScore { score, is_rear } = score_label(&device.label);
            let label = if device.label.trim().is_empty() {
                format!("Camera {}", index + 1)
            } else {
                device.label.clone()
            };
            CameraDevice {
                device_id: device.device_id.clone(),
                label,
                is_rear,
                score,
            }
        })
        .collect();

    cameras.sort_by(|a, b| b.score.cmp(&a.score));
    cameras
}
