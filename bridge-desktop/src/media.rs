//! Clock-driven media backend
//!
//! Desktop builds without a native audio/video pipeline still need a backend
//! that behaves like one: sessions advance their position while playing, stop
//! at the end of the asset and report `did_just_finish` exactly once. Position
//! is derived from the tokio clock, so paused-time tests drive it
//! deterministically.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{MediaBackend, MediaKind, MediaRequest, MediaSession, MediaSessionId, MediaStatus},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const DEFAULT_SCHEMES: &[&str] = &["http", "https", "file"];

/// Backend whose sessions model playback from elapsed time.
pub struct ClockedMediaBackend {
    schemes: Vec<String>,
    configured: AtomicBool,
}

impl ClockedMediaBackend {
    pub fn new() -> Self {
        Self {
            schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            configured: AtomicBool::new(false),
        }
    }

    /// Accept an additional URI scheme (e.g. a host-specific `asset`).
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.schemes.push(scheme.into());
        self
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    fn validate(&self, uri: &str) -> Result<()> {
        if uri.trim().is_empty() {
            return Err(BridgeError::InvalidSource("empty media uri".to_string()));
        }

        let scheme = uri
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| BridgeError::InvalidSource(format!("uri has no scheme: {}", uri)))?;

        if self.schemes.iter().any(|s| s.eq_ignore_ascii_case(&scheme)) {
            Ok(())
        } else {
            Err(BridgeError::InvalidSource(format!(
                "unsupported scheme '{}'",
                scheme
            )))
        }
    }
}

impl Default for ClockedMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaBackend for ClockedMediaBackend {
    fn name(&self) -> &str {
        "clocked"
    }

    async fn configure(&self) -> Result<()> {
        if !self.configured.swap(true, Ordering::SeqCst) {
            info!(backend = self.name(), "Media backend configured");
        }
        Ok(())
    }

    async fn load(&self, request: MediaRequest) -> Result<Box<dyn MediaSession>> {
        self.validate(&request.uri)?;

        let session = ClockedSession {
            id: MediaSessionId::new(),
            kind: request.kind,
            duration: request.duration_hint.filter(|d| !d.is_zero()),
            volume: request.initial_volume.clamp(0.0, 1.0),
            offset: Duration::ZERO,
            started_at: None,
            finished_reported: false,
            unloaded: false,
        };
        debug!(session = %session.id, kind = ?session.kind, "Loaded clocked session");

        Ok(Box::new(session))
    }
}

struct ClockedSession {
    id: MediaSessionId,
    kind: MediaKind,
    duration: Option<Duration>,
    volume: f32,
    /// Position accumulated up to `started_at` (or the frozen position while paused).
    offset: Duration,
    started_at: Option<Instant>,
    finished_reported: bool,
    unloaded: bool,
}

impl ClockedSession {
    fn ensure_loaded(&self) -> Result<()> {
        if self.unloaded {
            Err(BridgeError::OperationFailed(format!(
                "session {} already unloaded",
                self.id
            )))
        } else {
            Ok(())
        }
    }

    fn position(&self) -> Duration {
        let raw = match self.started_at {
            Some(started) => self.offset + started.elapsed(),
            None => self.offset,
        };
        match self.duration {
            Some(duration) => raw.min(duration),
            None => raw,
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.duration, Some(duration) if self.position() >= duration)
    }
}

#[async_trait]
impl MediaSession for ClockedSession {
    fn id(&self) -> MediaSessionId {
        self.id
    }

    async fn play(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.offset = self.position();
        self.started_at = None;
        Ok(())
    }

    async fn seek(&mut self, position: Duration) -> Result<()> {
        self.ensure_loaded()?;
        self.offset = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        if !self.at_end() {
            self.finished_reported = false;
        }
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_loaded()?;
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    async fn status(&mut self) -> Result<MediaStatus> {
        self.ensure_loaded()?;

        let mut did_just_finish = false;
        if self.started_at.is_some() && self.at_end() {
            self.offset = self.position();
            self.started_at = None;
            if !self.finished_reported {
                self.finished_reported = true;
                did_just_finish = true;
            }
        }

        Ok(MediaStatus {
            position: self.position(),
            duration: self.duration,
            is_playing: self.started_at.is_some(),
            did_just_finish,
        })
    }

    async fn unload(&mut self) -> Result<()> {
        self.started_at = None;
        self.unloaded = true;
        debug!(session = %self.id, "Unloaded clocked session");
        Ok(())
    }
}
