//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the media core and platform-specific
//! implementations. Each trait represents a capability the core requires but
//! that is implemented differently per platform (desktop, iOS, Android, web).
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaBackend`](playback::MediaBackend) - Opens media sessions for a URI
//! - [`MediaSession`](playback::MediaSession) - Play/pause/seek/volume/status for one asset
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Durable key-value storage
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Reachability and change notifications
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Wall-clock source for record timestamps
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | iOS      | host-provided       | 📋 Planned |
//! | Android  | host-provided       | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing (see `core_runtime::config::CoreConfigBuilder::build`).
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and include actionable context (the key,
//! the URI scheme, the database path).
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync`: the progress ticker and transfer tasks
//! run on the tokio runtime and hold them across threads.

pub mod error;
pub mod network;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use playback::{MediaBackend, MediaKind, MediaRequest, MediaSession, MediaSessionId, MediaStatus};
pub use storage::SettingsStore;
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
