//! Lifecycle callback set installed with `PlaybackEngine::set_events`.

use std::fmt;
use std::sync::Arc;

use core_library::Track;

use crate::error::PlaybackError;
use crate::types::PlaybackState;

type TrackCallback = Arc<dyn Fn(&Track) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&PlaybackError) + Send + Sync>;
type StateCallback = Arc<dyn Fn(PlaybackState) + Send + Sync>;

/// Handler set for engine lifecycle transitions.
///
/// Callbacks run synchronously on the engine's task; they must not block.
/// Installing a new set replaces every handler, including the ones the new
/// set leaves empty.
///
/// ```ignore
/// engine.set_events(
///     PlaybackEvents::new()
///         .on_track_start(|track| println!("now playing {}", track.title))
///         .on_state_change(|state| println!("state: {}", state)),
/// );
/// ```
#[derive(Clone, Default)]
pub struct PlaybackEvents {
    track_start: Option<TrackCallback>,
    track_end: Option<TrackCallback>,
    error: Option<ErrorCallback>,
    state_change: Option<StateCallback>,
}

impl PlaybackEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_track_start(mut self, f: impl Fn(&Track) + Send + Sync + 'static) -> Self {
        self.track_start = Some(Arc::new(f));
        self
    }

    /// Fired once when a track plays through to its natural end.
    pub fn on_track_end(mut self, f: impl Fn(&Track) + Send + Sync + 'static) -> Self {
        self.track_end = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&PlaybackError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn on_state_change(mut self, f: impl Fn(PlaybackState) + Send + Sync + 'static) -> Self {
        self.state_change = Some(Arc::new(f));
        self
    }

    pub(crate) fn track_started(&self, track: &Track) {
        if let Some(f) = &self.track_start {
            f(track);
        }
    }

    pub(crate) fn track_ended(&self, track: &Track) {
        if let Some(f) = &self.track_end {
            f(track);
        }
    }

    pub(crate) fn errored(&self, error: &PlaybackError) {
        if let Some(f) = &self.error {
            f(error);
        }
    }

    pub(crate) fn state_changed(&self, state: PlaybackState) {
        if let Some(f) = &self.state_change {
            f(state);
        }
    }
}

impl fmt::Debug for PlaybackEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEvents")
            .field("on_track_start", &self.track_start.is_some())
            .field("on_track_end", &self.track_end.is_some())
            .field("on_error", &self.error.is_some())
            .field("on_state_change", &self.state_change.is_some())
            .finish()
    }
}
