//! Camera platform module
//!
//! This module wraps the host's media and scanning primitives behind traits
//! and implements the acquisition steps that talk to them.
//!
//! # Submodules
//!
//! - `traits` - Platform and engine abstraction traits
//! - `capability` - Secure-context and media-API checks
//! - `permission` - Permission probe with track cleanup
//! - `enumerator` - Video input enumeration
//! - `ranking` - Label-based camera ranking
//! - `engine` - Mount-point wait and scan engine lifecycle
//!
//! # Architecture
//!
//! Everything here is generic over `CameraPlatform`, so the controller runs
//! unchanged against a browser binding or the simulated platform in `testdb`.

pub mod capability;
pub mod engine;
pub mod enumerator;
pub mod permission;
pub mod ranking;
pub mod traits;

// Re-export commonly used types for convenience
pub use capability::{check_capabilities, is_local_development_host};
pub use engine::{wait_for_mount_point, MountPoint, ScanEngineAdapter};
pub use enumerator::list_cameras;
pub use permission::request_permission;
pub use ranking::{rank_cameras, score_label, CameraDevice, LabelScore};
pub use traits::{
    BarcodeFormat, CameraPlatform, DecodeCallbacks, EngineConfig, EngineState, FacingMode,
    MediaDeviceInfo, MediaDeviceKind, MediaStream, RuntimeContext, ScanEngine, VideoConstraints,
};
