//! # Playback Engine
//!
//! Owns at most one media session and drives it through
//! `idle → loading → playing ⇄ paused → stopped`.
//!
//! Every command serializes on the session slot. A load tears the previous
//! session down (ticker aborted, media unloaded) before the next one is
//! opened, and each session carries a generation number that its progress
//! ticker checks on every sample. A ticker that outlives its session
//! therefore never delivers progress for the session that replaced it.
//!
//! State, current track and volume live in a snapshot behind a synchronous
//! lock so hosts can read them from callbacks and UI threads without awaiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bridge_traits::error::BridgeError;
use bridge_traits::playback::{MediaBackend, MediaKind, MediaRequest, MediaSession};
use core_library::Track;
use core_runtime::config::PlaybackSettings;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_uri;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvents;
use crate::progress::{ProgressBroadcaster, ProgressSubscription};
use crate::types::{PlaybackState, Progress};

/// Single-session playback engine. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    backend: Arc<dyn MediaBackend>,
    event_bus: EventBus,
    progress_interval: Duration,
    configured: OnceCell<()>,
    session: Mutex<Option<ActiveSession>>,
    snapshot: RwLock<Snapshot>,
    handlers: RwLock<Arc<PlaybackEvents>>,
    progress: ProgressBroadcaster,
    generation: AtomicU64,
}

struct Snapshot {
    state: PlaybackState,
    track: Option<Track>,
    volume: f32,
}

struct ActiveSession {
    generation: u64,
    track: Track,
    media: Box<dyn MediaSession>,
    ticker: JoinHandle<()>,
    /// End-of-track already reported for this pass
    finished: bool,
    last: Progress,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn MediaBackend>, settings: &PlaybackSettings, event_bus: EventBus) -> Self {
        let volume = if settings.initial_volume.is_finite() {
            settings.initial_volume.clamp(0.0, 1.0)
        } else {
            1.0
        };

        Self {
            inner: Arc::new(EngineInner {
                backend,
                event_bus,
                progress_interval: settings.progress_interval(),
                configured: OnceCell::new(),
                session: Mutex::new(None),
                snapshot: RwLock::new(Snapshot {
                    state: PlaybackState::Idle,
                    track: None,
                    volume,
                }),
                handlers: RwLock::new(Arc::new(PlaybackEvents::default())),
                progress: ProgressBroadcaster::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Runs the backend's one-time setup. Concurrent and repeated calls
    /// share a single successful run; a failed run may be retried.
    #[instrument(skip(self), fields(backend = self.inner.backend.name()))]
    pub async fn configure(&self) -> Result<()> {
        self.inner
            .configured
            .get_or_try_init(|| async {
                info!("Configuring media backend");
                self.inner
                    .backend
                    .configure()
                    .await
                    .map_err(|e| PlaybackError::ConfigurationFailed(e.to_string()))
            })
            .await
            .map(|_| ())
    }

    /// Replaces any current session with one for `track` and starts playing.
    ///
    /// On failure the engine is left `stopped` with no current track and
    /// `on_error` has been invoked.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn load_and_play(&self, track: Track) -> Result<()> {
        let inner = &self.inner;
        let mut slot = inner.session.lock().await;

        inner.release_active(&mut slot).await;
        inner.transition(PlaybackState::Loading, Some(track.clone()));

        let opened = match self.configure().await {
            Ok(()) => inner.open(&track).await,
            Err(err) => Err(err),
        };

        match opened {
            Ok(media) => {
                let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let ticker = inner.spawn_ticker(generation);
                *slot = Some(ActiveSession {
                    generation,
                    track: track.clone(),
                    media,
                    ticker,
                    finished: false,
                    last: Progress::new(0, track.duration().map_or(0, |d| d.as_millis() as u64)),
                });

                inner.transition(PlaybackState::Playing, Some(track.clone()));
                inner.emit(PlaybackEvent::Started {
                    track_id: track.id.clone(),
                    title: track.title.clone(),
                });
                inner.handlers().track_started(&track);
                info!("Playback started");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load track");
                inner.fail(&track.id, None, &err);
                Err(err)
            }
        }
    }

    /// Resumes a paused or stopped session. No-op without a session.
    ///
    /// A session that already reached its end restarts from the beginning.
    #[instrument(skip(self))]
    pub async fn play(&self) -> Result<()> {
        let inner = &self.inner;
        let mut slot = inner.session.lock().await;
        let Some(active) = slot.as_mut() else {
            debug!("play ignored: no session");
            return Ok(());
        };
        if !inner.state().can_resume() {
            return Ok(());
        }

        if active.finished {
            if let Err(err) = active.media.seek(Duration::ZERO).await {
                return Err(inner.command_failed(active, err));
            }
            active.finished = false;
            active.last.position_ms = 0;
        }
        if let Err(err) = active.media.play().await {
            return Err(inner.command_failed(active, err));
        }

        inner.transition(PlaybackState::Playing, Some(active.track.clone()));
        inner.emit(PlaybackEvent::Resumed {
            track_id: active.track.id.clone(),
            position_ms: active.last.position_ms,
        });
        Ok(())
    }

    /// Pauses a playing session. No-op in any other state.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let inner = &self.inner;
        let mut slot = inner.session.lock().await;
        let Some(active) = slot.as_mut() else {
            return Ok(());
        };
        if inner.state() != PlaybackState::Playing {
            return Ok(());
        }

        if let Err(err) = active.media.pause().await {
            return Err(inner.command_failed(active, err));
        }

        inner.transition(PlaybackState::Paused, Some(active.track.clone()));
        inner.emit(PlaybackEvent::Paused {
            track_id: active.track.id.clone(),
            position_ms: active.last.position_ms,
        });
        Ok(())
    }

    /// Pauses and rewinds to zero, keeping the session loaded.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        let mut slot = inner.session.lock().await;
        let Some(active) = slot.as_mut() else {
            return Ok(());
        };

        let rewound = match active.media.pause().await {
            Ok(()) => active.media.seek(Duration::ZERO).await,
            Err(err) => Err(err),
        };
        if let Err(err) = rewound {
            return Err(inner.command_failed(active, err));
        }
        active.finished = false;
        active.last.position_ms = 0;

        inner.transition(PlaybackState::Stopped, Some(active.track.clone()));
        inner.emit(PlaybackEvent::Stopped {
            track_id: active.track.id.clone(),
        });
        Ok(())
    }

    /// Seeks the current session. The playing/paused state is unchanged.
    #[instrument(skip(self))]
    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        let inner = &self.inner;
        let mut slot = inner.session.lock().await;
        let Some(active) = slot.as_mut() else {
            return Ok(());
        };

        if let Err(err) = active.media.seek(Duration::from_millis(position_ms)).await {
            return Err(inner.command_failed(active, err));
        }
        active.finished = false;
        active.last.position_ms = match active.last.duration_ms {
            0 => position_ms,
            duration => position_ms.min(duration),
        };

        inner.emit(PlaybackEvent::Seeked {
            track_id: active.track.id.clone(),
            position_ms: active.last.position_ms,
        });
        Ok(())
    }

    /// Sets the volume, clamped to `0.0..=1.0`. Non-finite values are ignored.
    #[instrument(skip(self))]
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        if !volume.is_finite() {
            debug!("Ignoring non-finite volume");
            return Ok(());
        }
        let volume = volume.clamp(0.0, 1.0);
        let inner = &self.inner;
        inner.snapshot.write().volume = volume;

        let mut slot = inner.session.lock().await;
        if let Some(active) = slot.as_mut() {
            if let Err(err) = active.media.set_volume(volume).await {
                return Err(inner.command_failed(active, err));
            }
        }

        inner.emit(PlaybackEvent::VolumeChanged { volume });
        Ok(())
    }

    /// Releases the session and returns to `idle`. Idempotent.
    #[instrument(skip(self))]
    pub async fn unload(&self) {
        let inner = &self.inner;
        let mut slot = inner.session.lock().await;
        let track_id = slot.as_ref().map(|active| active.track.id.clone());

        inner.release_active(&mut slot).await;
        if track_id.is_none() && inner.state() == PlaybackState::Idle {
            return;
        }

        inner.transition(PlaybackState::Idle, None);
        inner.emit(PlaybackEvent::Unloaded { track_id });
    }

    /// Replaces the whole lifecycle handler set.
    pub fn set_events(&self, events: PlaybackEvents) {
        *self.inner.handlers.write() = Arc::new(events);
    }

    pub fn subscribe_progress(&self, callback: impl Fn(Progress) + Send + Sync + 'static) -> ProgressSubscription {
        self.inner.progress.subscribe(callback)
    }

    pub fn get_current_track(&self) -> Option<Track> {
        self.inner.snapshot.read().track.clone()
    }

    /// `true` only while the state is `playing`.
    pub fn get_is_playing(&self) -> bool {
        self.inner.state() == PlaybackState::Playing
    }

    pub fn get_volume(&self) -> f32 {
        self.inner.snapshot.read().volume
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state()
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.read();
        f.debug_struct("PlaybackEngine")
            .field("backend", &self.inner.backend.name())
            .field("state", &snapshot.state)
            .field("track", &snapshot.track.as_ref().map(|t| t.id.as_str()))
            .field("volume", &snapshot.volume)
            .finish()
    }
}

impl EngineInner {
    fn state(&self) -> PlaybackState {
        self.snapshot.read().state
    }

    fn handlers(&self) -> Arc<PlaybackEvents> {
        Arc::clone(&self.handlers.read())
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.event_bus.emit(CoreEvent::Playback(event));
    }

    /// Updates the snapshot; handlers and the bus only hear actual changes.
    fn transition(&self, state: PlaybackState, track: Option<Track>) {
        let track_id = track.as_ref().map(|t| t.id.clone());
        let changed = {
            let mut snapshot = self.snapshot.write();
            let changed = snapshot.state != state;
            snapshot.state = state;
            snapshot.track = track;
            changed
        };

        if changed {
            debug!(state = %state, "Playback state changed");
            self.emit(PlaybackEvent::StateChanged {
                track_id,
                state: state.as_str().to_string(),
            });
            self.handlers().state_changed(state);
        }
    }

    fn fail(&self, track_id: &str, retained: Option<Track>, err: &PlaybackError) {
        self.transition(PlaybackState::Stopped, retained);
        self.emit(PlaybackEvent::Error {
            track_id: Some(track_id.to_string()),
            message: err.to_string(),
            recoverable: err.is_transient(),
        });
        self.handlers().errored(err);
    }

    /// A session command failed: the session is kept but the engine stops.
    fn command_failed(&self, active: &ActiveSession, err: BridgeError) -> PlaybackError {
        let err = PlaybackError::from(err);
        warn!(track_id = %active.track.id, error = %err, "Media command failed");
        self.fail(&active.track.id, Some(active.track.clone()), &err);
        err
    }

    async fn open(&self, track: &Track) -> Result<Box<dyn MediaSession>> {
        let uri = track.require_media_uri()?;
        let kind = if track.plays_video() {
            MediaKind::Video
        } else {
            MediaKind::Audio
        };
        let volume = self.snapshot.read().volume;

        let mut request = MediaRequest::new(uri, kind)
            .with_volume(volume)
            .with_metadata("title", track.title.clone())
            .with_metadata("artist", track.artist.clone());
        if let Some(duration) = track.duration() {
            request = request.with_duration_hint(duration);
        }

        debug!(uri = %redact_uri(uri), backend = self.backend.name(), "Opening media session");
        let mut media = self.backend.load(request).await?;

        if let Err(err) = media.play().await {
            if let Err(unload_err) = media.unload().await {
                debug!(error = %unload_err, "Unload after failed start also failed");
            }
            return Err(err.into());
        }
        Ok(media)
    }

    async fn release_active(&self, slot: &mut Option<ActiveSession>) {
        if let Some(active) = slot.take() {
            active.ticker.abort();
            self.release(active).await;
        }
    }

    /// Invalidates the session's generation and unloads its media. The
    /// ticker is not touched.
    async fn release(&self, mut active: ActiveSession) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = active.media.unload().await {
            warn!(track_id = %active.track.id, error = %err, "Failed to unload media session");
        }
        debug!(track_id = %active.track.id, session = %active.media.id(), "Media session released");
    }

    fn spawn_ticker(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let engine: Weak<EngineInner> = Arc::downgrade(self);
        let period = self.progress_interval;

        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                if !inner.sample(generation).await {
                    break;
                }
            }
        })
    }

    /// One progress tick. Returns `false` once the ticker should exit.
    async fn sample(&self, generation: u64) -> bool {
        let mut slot = self.session.lock().await;
        let active = match slot.as_mut() {
            Some(active) if active.generation == generation => active,
            _ => return false,
        };

        match active.media.status().await {
            Ok(status) => {
                let progress = Progress::from(&status);
                active.last = progress;
                self.progress.publish(progress);

                if status.did_just_finish && !active.finished {
                    active.finished = true;
                    let track = active.track.clone();
                    info!(track_id = %track.id, "Track finished");
                    self.transition(PlaybackState::Stopped, Some(track.clone()));
                    self.emit(PlaybackEvent::Completed {
                        track_id: track.id.clone(),
                    });
                    self.handlers().track_ended(&track);
                }
                true
            }
            Err(err) => {
                let err = PlaybackError::MediaFault(err.to_string());
                if let Some(active) = slot.take() {
                    warn!(track_id = %active.track.id, error = %err, "Media session faulted");
                    let track_id = active.track.id.clone();
                    self.release(active).await;
                    self.fail(&track_id, None, &err);
                }
                false
            }
        }
    }
}
