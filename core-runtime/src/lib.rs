//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the media core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one. It establishes the logging
//! conventions, the fail-fast configuration builder and the broadcast channel
//! the playback engine and download manager publish on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
