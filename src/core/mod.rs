//! Core functionality module
//!
//! This module contains the pieces of the scanner that do not touch the
//! camera platform: configuration, errors, localized text, the diagnostic
//! log and manual code entry.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error taxonomy, classification, and result aliases
//! - `messages` - Localized error, status, and button text
//! - `debug_log` - Bounded diagnostic log shown for hard failures
//! - `manual_entry` - Typed-code fallback

pub mod config;
pub mod debug_log;
pub mod error;
pub mod manual_entry;
pub mod messages;
