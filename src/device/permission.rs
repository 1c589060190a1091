//! Permission negotiation
//!
//! Camera access is requested once through a throwaway probe stream. The probe
//! only exists to surface the permission prompt and confirm access; its
//! tracks are released before this module returns and it is never used for
//! scanning.

use log::debug;

use crate::core::error::{classify_permission_error, ScanError};
use crate::device::traits::{CameraPlatform, VideoConstraints};

/// Request camera access with a probe stream and release it immediately
///
/// Failures are classified into the scanner taxonomy; the raw platform error
/// survives only as the detail string.
pub async fn request_permission<P>(
    platform: &P,
    constraints: &VideoConstraints,
) -> Result<(), ScanError>
where
    P: CameraPlatform + ?Sized,
{
    debug!(
        "Requesting probe stream ({:?}, ideal {}x{})",
        constraints.facing_mode, constraints.ideal_width, constraints.ideal_height
    );

    match platform.request_video_stream(constraints).await {
        Ok(mut stream) => {
            let tracks = stream.live_track_count();
            stream.stop_all_tracks();
            debug!("Permission granted, released {} probe track(s)", tracks);
            Ok(())
        }
        Err(err) => {
            let classified = classify_permission_error(&err);
            debug!("Permission probe failed: {} -> {}", err, classified.kind);
            Err(classified)
        }
    }
}
