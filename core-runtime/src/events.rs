//! # Event Bus System
//!
//! Event-driven fan-out for the media core using `tokio::sync::broadcast`.
//! The playback engine and the download manager publish typed events here so
//! any number of UI surfaces (mini-player, now-playing screen, downloads list)
//! can observe them independently.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ PlaybackEngine  ├──────────>│           ├──────────────>│ Mini-player│
//! └─────────────────┘           │ EventBus  │               └────────────┘
//!                               │ (broadcast│
//! ┌─────────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │ DownloadManager ├──────────>│           ├──────────────>│ Downloads  │
//! └─────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Download(DownloadEvent::Queued {
//!         id: "t1".to_string(),
//!         title: "Intro".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Download queued");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Download progress is emitted on every tick, so slow consumers
//!   should treat this as non-fatal and re-read state from the manager.
//! - **`RecvError::Closed`**: every sender was dropped (service shutdown).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Download(DownloadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Download(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Download(DownloadEvent::Suspended { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::ConnectivityChanged { online: false }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Download id or track id the event concerns, if any.
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(e) => e.track_id(),
            CoreEvent::Download(e) => e.id(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Lifecycle transitions of the playback engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Engine state changed (`idle`, `loading`, `playing`, `paused`, `stopped`).
    StateChanged {
        track_id: Option<String>,
        state: String,
    },
    /// A new session started playing.
    Started { track_id: String, title: String },
    Paused { track_id: String, position_ms: u64 },
    Resumed { track_id: String, position_ms: u64 },
    /// Paused and rewound to the start; the session is kept.
    Stopped { track_id: String },
    Seeked { track_id: String, position_ms: u64 },
    /// Track finished playing naturally.
    Completed { track_id: String },
    VolumeChanged { volume: f32 },
    /// Session released.
    Unloaded { track_id: Option<String> },
    Error {
        track_id: Option<String>,
        message: String,
        /// Whether retrying the same track may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Seeked { .. } => "Playback position changed",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::Unloaded { .. } => "Playback session released",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    fn track_id(&self) -> Option<&str> {
        match self {
            PlaybackEvent::Started { track_id, .. }
            | PlaybackEvent::Paused { track_id, .. }
            | PlaybackEvent::Resumed { track_id, .. }
            | PlaybackEvent::Stopped { track_id }
            | PlaybackEvent::Seeked { track_id, .. }
            | PlaybackEvent::Completed { track_id } => Some(track_id),
            PlaybackEvent::StateChanged { track_id, .. }
            | PlaybackEvent::Unloaded { track_id }
            | PlaybackEvent::Error { track_id, .. } => track_id.as_deref(),
            PlaybackEvent::VolumeChanged { .. } => None,
        }
    }
}

// ============================================================================
// Download Events
// ============================================================================

/// Download queue transitions. Emitted after the mutation has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Queued { id: String, title: String },
    /// The item took the active slot.
    Started { id: String, progress: f64 },
    Progress { id: String, progress: f64 },
    Paused { id: String, progress: f64 },
    Resumed { id: String, progress: f64 },
    /// Active transfer stopped because the device went offline; it resumes
    /// automatically once connectivity returns.
    Suspended { id: String, progress: f64 },
    Completed { id: String, local_uri: String },
    Failed { id: String, message: String },
    Canceled { id: String },
    Removed { id: String },
    /// Every item was removed and durable storage wiped.
    Cleared,
    ConnectivityChanged { online: bool },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Queued { .. } => "Download queued",
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download progress",
            DownloadEvent::Paused { .. } => "Download paused",
            DownloadEvent::Resumed { .. } => "Download resumed",
            DownloadEvent::Suspended { .. } => "Download suspended while offline",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Failed { .. } => "Download failed",
            DownloadEvent::Canceled { .. } => "Download canceled",
            DownloadEvent::Removed { .. } => "Download removed",
            DownloadEvent::Cleared => "Downloads cleared",
            DownloadEvent::ConnectivityChanged { .. } => "Connectivity changed",
        }
    }

    fn id(&self) -> Option<&str> {
        match self {
            DownloadEvent::Queued { id, .. }
            | DownloadEvent::Started { id, .. }
            | DownloadEvent::Progress { id, .. }
            | DownloadEvent::Paused { id, .. }
            | DownloadEvent::Resumed { id, .. }
            | DownloadEvent::Suspended { id, .. }
            | DownloadEvent::Completed { id, .. }
            | DownloadEvent::Failed { id, .. }
            | DownloadEvent::Canceled { id }
            | DownloadEvent::Removed { id } => Some(id),
            DownloadEvent::Cleared | DownloadEvent::ConnectivityChanged { .. } => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clone it to share a producer handle; each `subscribe()` creates an
/// independent receiver that sees every event emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let downloads_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Download(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
