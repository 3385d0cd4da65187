//! # Progress Broadcaster
//!
//! Fan-out of progress samples to any number of subscribers. Each subscriber
//! sees the same sample sequence from the point it subscribed. Delivery
//! snapshots the subscriber list, so callbacks may subscribe or unsubscribe
//! from within a delivery without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::types::Progress;

type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, ProgressCallback)>>,
}

/// Multi-subscriber progress channel owned by the playback engine.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    registry: Arc<Registry>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` and returns the handle that removes it.
    pub fn subscribe(&self, callback: impl Fn(Progress) + Send + Sync + 'static) -> ProgressSubscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .subscribers
            .lock()
            .push((id, Arc::new(callback)));

        ProgressSubscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `progress` to every current subscriber.
    pub fn publish(&self, progress: Progress) {
        let snapshot: Vec<ProgressCallback> = self
            .registry
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(progress);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().len()
    }
}

impl std::fmt::Debug for ProgressBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`ProgressBroadcaster::subscribe`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct ProgressSubscription {
    id: u64,
    registry: Weak<Registry>,
}

impl ProgressSubscription {
    /// Removes only this subscription. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.subscribers.lock().iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}
