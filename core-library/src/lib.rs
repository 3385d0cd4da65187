//! # Track Model
//!
//! Immutable description of playable content shared by the playback engine
//! and the download manager. Tracks are produced by catalog/search
//! collaborators; the core only reads them.

pub mod error;
pub mod models;

pub use error::{LibraryError, Result};
pub use models::{Track, TrackKind};
