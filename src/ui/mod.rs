//! UI Support Module
//!
//! This module provides the infrastructure a frontend needs to present the
//! scanner: the controller that owns the acquisition state machine, the events
//! it emits, and a localized status snapshot. It is UI-framework agnostic; the
//! CLI in this crate is one frontend, a web or native view is another.
//!
//! # Architecture
//!
//! - [`controller`] - Scanner state machine with async actions and teardown
//! - [`events`] - Serializable events for observing transitions
//! - [`status`] - Render-ready snapshot with error panel and recoveries
//!
//! # Threading Model
//!
//! The controller is driven from a single task. Platform callbacks never touch
//! controller state directly:
//!
//! 1. **Decode Channel** - Engine callbacks push decoded text into a channel
//!    that the controller drains in [`ScannerController::process_decodes`]
//! 2. **Event Channel** - Transitions are emitted as [`ScannerEvent`]s that the
//!    UI polls without blocking
//! 3. **Close Handle** - [`ScannerHandle::request_close`] flips an atomic flag
//!    checked after every await point
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use qr_camera_scanner::core::config::Config;
//! use qr_camera_scanner::testdb::{MockPlatform, MockPlatformConfig};
//! use qr_camera_scanner::ui::{ScannerCallbacks, ScannerController};
//!
//! # async fn demo() -> qr_camera_scanner::core::error::Result<()> {
//! let platform = MockPlatform::new(MockPlatformConfig::default());
//! let callbacks = ScannerCallbacks::new(|code| println!("scanned {}", code), || {});
//! let mut controller = ScannerController::new(platform.clone(), &Config::default(), callbacks);
//!
//! controller.initialize().await?;
//! platform.emit_decode("HELLO");
//! controller.process_decodes().await?;
//!
//! for event in controller.drain_events() {
//!     println!("{}", event.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod events;
pub mod status;

// Re-export commonly used types
pub use controller::{InputMode, ScannerCallbacks, ScannerController, ScannerHandle, ScannerState};
pub use events::{ScanSource, ScannerEvent};
pub use status::{ErrorPanel, Recovery, ScannerStatus};
