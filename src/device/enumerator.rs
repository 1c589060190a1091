//! Camera enumeration
//!
//! Lists video inputs after permission has been granted. Most platforms only
//! populate labels once access is granted, so this is never called first.

use log::debug;

use crate::core::error::{classify_permission_error, ScanError};
use crate::device::traits::{CameraPlatform, MediaDeviceInfo};

/// List the video input devices
///
/// An empty list is not an error here; the controller turns it into
/// `no_camera`.
pub async fn list_cameras<P>(platform: &P) -> Result<Vec<MediaDeviceInfo>, ScanError>
where
    P: CameraPlatform + ?Sized,
{
    let devices = platform
        .enumerate_devices()
        .await
        .map_err(|e| classify_permission_error(&e))?;

    let total = devices.len();
    let cameras: Vec<MediaDeviceInfo> = devices
        .into_iter()
        .filter(MediaDeviceInfo::is_video_input)
        .collect();

    debug!(
        "Enumerated {} device(s), {} video input(s)",
        total,
        cameras.len()
    );

    Ok(cameras)
}
