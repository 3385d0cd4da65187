//! Media session bridge traits.
//!
//! The playback engine never decodes or renders media itself. It asks a
//! [`MediaBackend`] (selected when the engine is constructed) to load one
//! asset at a time and drives the returned [`MediaSession`] through its
//! lifecycle. Hosts provide native backends (AVPlayer, ExoPlayer, an HTML
//! media element); `bridge-desktop` ships a clock-driven backend.

use crate::error::Result;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Kind of asset carried by a [`MediaRequest`]. Backends may route video to a
/// surface instead of an audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Identifier assigned to every session a backend creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaSessionId(Uuid);

impl MediaSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MediaSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a backend needs to open a session.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    /// Resolvable URI (`https://`, `file://`, or host-defined schemes).
    pub uri: String,
    pub kind: MediaKind,
    /// Duration advertised by the catalog; backends prefer their own probe.
    pub duration_hint: Option<Duration>,
    /// Normalized `0.0..=1.0` volume applied before the first frame.
    pub initial_volume: f32,
    /// Now-playing metadata surfaced to OS media controls.
    pub metadata: HashMap<String, String>,
}

impl MediaRequest {
    pub fn new(uri: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            uri: uri.into(),
            kind,
            duration_hint: None,
            initial_volume: 1.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_duration_hint(mut self, duration: Duration) -> Self {
        self.duration_hint = Some(duration);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Point-in-time status sampled from a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStatus {
    pub position: Duration,
    /// `None` until the backend knows the asset length.
    pub duration: Option<Duration>,
    pub is_playing: bool,
    /// Set on the first sample after playback reached the end of the asset.
    pub did_just_finish: bool,
}

/// Strategy that opens media sessions.
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// One-time platform setup (audio session category, background modes).
    async fn configure(&self) -> Result<()>;

    /// Open a session for `request`. The session starts paused at position zero.
    async fn load(&self, request: MediaRequest) -> Result<Box<dyn MediaSession>>;
}

/// A single loaded asset.
#[async_trait::async_trait]
pub trait MediaSession: Send {
    fn id(&self) -> MediaSessionId;

    /// Begin or resume playback.
    async fn play(&mut self) -> Result<()>;

    /// Pause without releasing the session.
    async fn pause(&mut self) -> Result<()>;

    /// Seek to an absolute position. Out-of-range positions are clamped.
    async fn seek(&mut self, position: Duration) -> Result<()>;

    /// Volume is normalized to `0.0..=1.0`.
    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Sample the session. Errors indicate an unrecoverable media fault.
    async fn status(&mut self) -> Result<MediaStatus>;

    /// Release native resources. The session must not be used afterwards.
    async fn unload(&mut self) -> Result<()>;
}
