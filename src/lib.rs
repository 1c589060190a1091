//! QR Camera Scanner Library
//!
//! Camera-based QR acquisition: runtime capability checks, permission
//! negotiation, camera enumeration and ranking, decoding-engine lifecycle,
//! a manual-entry fallback, localized error reporting and a bounded
//! diagnostic log.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error taxonomy, localized messages, debug log
//!   and manual entry
//! - [`device`] - Platform traits and the acquisition steps built on them
//!   (capability, permission, enumeration, ranking, engine lifecycle)
//! - [`ui`] - The scanner controller state machine, its events and the
//!   status snapshot frontends render
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Simulated platform, scenario library and runner
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use qr_camera_scanner::core::config::Config;
//! use qr_camera_scanner::testdb::{MockPlatform, MockPlatformConfig};
//! use qr_camera_scanner::ui::{ScannerCallbacks, ScannerController, ScannerState};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::load_default()?;
//! let platform = MockPlatform::new(MockPlatformConfig::default());
//!
//! let callbacks = ScannerCallbacks::new(
//!     |code| println!("Scanned: {}", code),
//!     || println!("Scanner closed"),
//! );
//! let mut controller = ScannerController::new(platform.clone(), &config, callbacks);
//!
//! controller.initialize().await?;
//! if controller.state() == ScannerState::Error {
//!     // Offer Retry or manual entry
//!     controller.enter_manual_entry().await?;
//!     controller.submit_manual_code("vip001").await?;
//! }
//! controller.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing Without a Camera
//!
//! ```rust,no_run
//! use qr_camera_scanner::testdb::TestRunner;
//!
//! # async fn demo() {
//! let mut runner = TestRunner::new();
//! let summary = runner.run_quick().await;
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! qr_camera_scanner::testdb::print_available_scenarios();
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod device;
pub mod testdb;
pub mod ui;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
