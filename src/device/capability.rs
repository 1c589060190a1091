//! Camera capability probe
//!
//! A synchronous, side-effect-free check run once per initialization, before
//! any hardware is touched.

use crate::core::error::{ErrorKind, ScanError};
use crate::device::traits::RuntimeContext;

/// Hosts treated as local development even without a secure context
const LOCAL_DEVELOPMENT_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// Whether a host name refers to the local machine
pub fn is_local_development_host(hostname: &str) -> bool {
    let host = hostname.trim().to_lowercase();
    LOCAL_DEVELOPMENT_HOSTS.contains(&host.as_str()) || host.ends_with(".localhost")
}

/// Check that the runtime can use a camera at all
///
/// Fails with `https_required` in an insecure, non-local context and with
/// `not_supported` when no media-capture API is exposed.
pub fn check_capabilities(context: &RuntimeContext) -> Result<(), ScanError> {
    if !context.secure_context && !is_local_development_host(&context.hostname) {
        return Err(ScanError::new(
            ErrorKind::HttpsRequired,
            format!("Insecure context on host '{}'", context.hostname),
        ));
    }

    if !context.media_devices_available {
        return Err(ScanError::new(
            ErrorKind::NotSupported,
            "No media device API available",
        ));
    }

    Ok(())
}
