//! # Playback Module
//!
//! Single-session playback engine with a multi-subscriber progress channel.
//!
//! ## Overview
//!
//! This module handles:
//! - Loading a [`Track`](core_library::Track) into the host media backend
//! - Transport commands (play, pause, stop, seek, volume)
//! - Periodic progress sampling fanned out to every subscriber
//! - Lifecycle callbacks and `CoreEvent::Playback` emission

pub mod engine;
pub mod error;
pub mod events;
pub mod progress;
pub mod types;

pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvents;
pub use progress::{ProgressBroadcaster, ProgressSubscription};
pub use types::{PlaybackState, Progress};
