//! # Download Queue Manager
//!
//! Serializes requested downloads through a single active slot.
//!
//! All bookkeeping (item map, FIFO queue, active slot, reachability) lives in
//! one [`DownloadState`] behind a synchronous mutex that is never held across
//! an await. Every public operation follows the same sequence:
//!
//! 1. lock, mutate, and schedule the next transfer if the slot is free
//! 2. bump the revision and append the resulting `DownloadEvent`s to the
//!    outbox, then unlock
//! 3. flush: persist the newest map and publish the outbox in revision order
//!
//! Flushes are serialized, so the bus observes events in commit order and
//! the store never goes back to an older map.
//!
//! Each activation gets a fresh generation number and cancellation token.
//! Transfer updates are applied only while the slot still holds that
//! generation, so a transfer stopped by pause, cancel or remove can never
//! move the item again.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bridge_traits::{Clock, NetworkMonitor, SystemClock};
use core_library::Track;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::store::{DownloadMap, DownloadStore};
use crate::transfer::{TransferRequest, TransferSource, TransferUpdate};
use crate::types::{DownloadItem, DownloadStatus, MAX_PARTIAL_PROGRESS};

/// Handle to the download queue. Clones share the same queue.
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<ManagerInner>,
}

pub struct DownloadManagerBuilder {
    store: DownloadStore,
    source: Arc<dyn TransferSource>,
    event_bus: Option<EventBus>,
    clock: Option<Arc<dyn Clock>>,
    resume_on_start: bool,
}

struct ManagerInner {
    store: DownloadStore,
    source: Arc<dyn TransferSource>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    state: Mutex<DownloadState>,
    /// Highest revision written to the store; held for the whole flush
    persisted: tokio::sync::Mutex<u64>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

struct DownloadState {
    items: DownloadMap,
    queue: VecDeque<String>,
    active: Option<ActiveTransfer>,
    online: bool,
    revision: u64,
    /// Event batches committed but not yet published, oldest first
    outbox: Vec<Vec<DownloadEvent>>,
    last_created_at: i64,
}

struct ActiveTransfer {
    id: String,
    generation: u64,
    token: CancellationToken,
}

impl DownloadManagerBuilder {
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Start the head of the restored queue as soon as the manager opens
    /// (default: true).
    pub fn resume_on_start(mut self, enable: bool) -> Self {
        self.resume_on_start = enable;
        self
    }

    /// Restores the persisted map and rebuilds the queue. A map that cannot
    /// be read is logged and replaced by an empty one.
    pub async fn open(self) -> DownloadManager {
        let restored = match self.store.load().await {
            Ok(map) => map,
            Err(err) => {
                warn!(key = self.store.key(), error = %err, "Failed to restore downloads; starting empty");
                DownloadMap::new()
            }
        };
        let state = DownloadState::restore(restored);
        info!(
            items = state.items.len(),
            queued = state.queue.len(),
            "Download manager opened"
        );

        let inner = Arc::new(ManagerInner {
            store: self.store,
            source: self.source,
            event_bus: self.event_bus.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            state: Mutex::new(state),
            persisted: tokio::sync::Mutex::new(0),
            generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        });

        if self.resume_on_start {
            inner
                .mutate(|inner, state, now, events| inner.schedule(state, now, events))
                .await;
        }

        DownloadManager { inner }
    }
}

impl DownloadManager {
    pub fn builder(store: DownloadStore, source: Arc<dyn TransferSource>) -> DownloadManagerBuilder {
        DownloadManagerBuilder {
            store,
            source,
            event_bus: None,
            clock: None,
            resume_on_start: true,
        }
    }

    /// Queues `track` for download.
    ///
    /// A completed item is left untouched. Any other existing item is
    /// overwritten as `queued` with zero progress, restarting it if it holds
    /// the active slot.
    #[instrument(skip(self, track), fields(id = %track.id))]
    pub async fn request_download(&self, track: Track) -> Result<()> {
        track.validate()?;

        self.inner
            .mutate(move |inner, state, now, events| {
                let id = track.id.clone();
                let existing = state
                    .items
                    .get(&id)
                    .map(|item| (item.is_completed(), item.created_at));

                // Queue order and creation order must agree for `restore`:
                // an id re-entering the queue is stamped as new.
                let created_at = match existing {
                    Some((true, _)) => {
                        debug!("Already downloaded");
                        return;
                    }
                    Some((false, created_at)) if state.is_queued(&id) => created_at,
                    _ => state.next_created_at(now),
                };

                if state.stop_active_if(&id) {
                    debug!("Restarting active download");
                }
                events.push(DownloadEvent::Queued {
                    id: id.clone(),
                    title: track.title.clone(),
                });
                state
                    .items
                    .insert(id.clone(), DownloadItem::queued(track, created_at, now));
                state.enqueue(&id);
                inner.schedule(state, now, events);
            })
            .await;
        Ok(())
    }

    /// Pauses the active download. No-op for any other item.
    #[instrument(skip(self))]
    pub async fn pause_download(&self, id: &str) {
        self.inner
            .mutate(|inner, state, now, events| {
                if !state.stop_active_if(id) {
                    return;
                }
                if let Some(item) = state.items.get_mut(id) {
                    item.set_status(DownloadStatus::Paused, now);
                    events.push(DownloadEvent::Paused {
                        id: id.to_string(),
                        progress: item.progress,
                    });
                }
                inner.schedule(state, now, events);
            })
            .await;
    }

    /// Re-queues a paused download; it continues from its recorded progress.
    #[instrument(skip(self))]
    pub async fn resume_download(&self, id: &str) {
        self.inner
            .mutate(|inner, state, now, events| {
                let Some(item) = state.items.get_mut(id) else {
                    return;
                };
                if item.status != DownloadStatus::Paused {
                    return;
                }
                item.set_status(DownloadStatus::Queued, now);
                events.push(DownloadEvent::Resumed {
                    id: id.to_string(),
                    progress: item.progress,
                });
                state.enqueue(id);
                inner.schedule(state, now, events);
            })
            .await;
    }

    /// Cancels a download and resets its progress. Completed items are kept.
    #[instrument(skip(self))]
    pub async fn cancel_download(&self, id: &str) {
        self.inner
            .mutate(|inner, state, now, events| {
                let cancellable = state.items.get(id).is_some_and(|item| {
                    !matches!(item.status, DownloadStatus::Completed | DownloadStatus::Canceled)
                });
                if !cancellable {
                    return;
                }

                state.stop_active_if(id);
                state.dequeue(id);
                if let Some(item) = state.items.get_mut(id) {
                    item.cancel(now);
                }
                events.push(DownloadEvent::Canceled { id: id.to_string() });
                inner.schedule(state, now, events);
            })
            .await;
    }

    /// Deletes the item entirely, stopping its transfer.
    #[instrument(skip(self))]
    pub async fn remove_download(&self, id: &str) {
        self.inner
            .mutate(|inner, state, now, events| {
                state.stop_active_if(id);
                state.dequeue(id);
                if state.items.remove(id).is_none() {
                    return;
                }
                events.push(DownloadEvent::Removed { id: id.to_string() });
                inner.schedule(state, now, events);
            })
            .await;
    }

    /// Stops every transfer and wipes memory and durable storage.
    #[instrument(skip(self))]
    pub async fn clear_all_downloads(&self) {
        self.inner
            .mutate(|_, state, _, events| {
                if let Some(active) = state.active.take() {
                    active.token.cancel();
                }
                state.items.clear();
                state.queue.clear();
                events.push(DownloadEvent::Cleared);
            })
            .await;
        info!("All downloads cleared");
    }

    /// Feeds reachability into the manager. Going offline suspends the
    /// active transfer back to `queued`; coming online resumes scheduling.
    pub async fn set_online(&self, online: bool) {
        self.inner.set_online(online).await;
    }

    /// Follows `monitor` until shutdown. `Indeterminate` reports are ignored.
    pub fn watch_network(&self, monitor: Arc<dyn NetworkMonitor>) -> JoinHandle<()> {
        let manager = Arc::downgrade(&self.inner);
        let token = self.inner.shutdown.child_token();

        tokio::spawn(async move {
            match monitor.get_network_info().await {
                Ok(info) => {
                    if let (Some(online), Some(inner)) = (info.reachable(), manager.upgrade()) {
                        inner.set_online(online).await;
                    }
                }
                Err(err) => warn!(error = %err, "Failed to read initial network status"),
            }

            let mut changes = match monitor.subscribe_changes().await {
                Ok(changes) => changes,
                Err(err) => {
                    warn!(error = %err, "Network change stream unavailable");
                    return;
                }
            };

            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => None,
                    info = changes.next() => info,
                };
                let Some(info) = next else {
                    break;
                };
                let Some(online) = info.reachable() else {
                    debug!("Ignoring indeterminate network status");
                    continue;
                };
                let Some(inner) = manager.upgrade() else {
                    break;
                };
                inner.set_online(online).await;
            }
            debug!("Network watcher stopped");
        })
    }

    /// Cancels every transfer and watcher. Persisted state is left as is so
    /// the next process resumes where this one stopped.
    pub fn shutdown(&self) {
        info!("Download manager shutting down");
        self.inner.shutdown.cancel();
    }

    pub fn get_is_downloaded(&self, id: &str) -> bool {
        self.inner
            .state
            .lock()
            .items
            .get(id)
            .is_some_and(DownloadItem::is_completed)
    }

    pub fn get_download(&self, id: &str) -> Option<DownloadItem> {
        self.inner.state.lock().items.get(id).cloned()
    }

    /// All items ordered by creation.
    pub fn downloads(&self) -> Vec<DownloadItem> {
        let mut items: Vec<DownloadItem> = self.inner.state.lock().items.values().cloned().collect();
        items.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        items
    }

    /// Queued ids in activation order, the active id included.
    pub fn queue(&self) -> Vec<String> {
        self.inner.state.lock().queue.iter().cloned().collect()
    }

    pub fn active_id(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|active| active.id.clone())
    }

    pub fn is_online(&self) -> bool {
        self.inner.state.lock().online
    }
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("DownloadManager")
            .field("items", &state.items.len())
            .field("queue", &state.queue)
            .field("active", &state.active.as_ref().map(|a| a.id.as_str()))
            .field("online", &state.online)
            .finish()
    }
}

impl ManagerInner {
    /// Runs `op` under the state lock. If it produced any events the change
    /// is committed and flushed before returning.
    async fn mutate<R>(
        self: &Arc<Self>,
        op: impl FnOnce(&Arc<Self>, &mut DownloadState, i64, &mut Vec<DownloadEvent>) -> R,
    ) -> R {
        let (result, committed) = {
            let mut state = self.state.lock();
            let now = self.clock.unix_timestamp_millis();
            let mut events = Vec::new();
            let result = op(self, &mut *state, now, &mut events);
            let committed = !events.is_empty();
            if committed {
                state.commit(events);
            }
            (result, committed)
        };

        if committed {
            self.flush().await;
        }
        result
    }

    /// Writes the current map and publishes every pending batch. A flush
    /// that finds the outbox empty was covered by an earlier one.
    async fn flush(&self) {
        let mut written = self.persisted.lock().await;
        let (revision, items, outbox) = {
            let mut state = self.state.lock();
            if state.outbox.is_empty() {
                return;
            }
            (
                state.revision,
                state.items.clone(),
                std::mem::take(&mut state.outbox),
            )
        };

        // An empty map is stored as an absent key
        let saved = if items.is_empty() {
            self.store.clear().await
        } else {
            self.store.save(&items).await
        };
        match saved {
            Ok(()) => *written = revision,
            Err(err) => warn!(
                revision,
                persisted = *written,
                error = %err,
                "Failed to persist downloads"
            ),
        }

        for event in outbox.into_iter().flatten() {
            let _ = self.event_bus.emit(CoreEvent::Download(event));
        }
    }

    async fn set_online(self: &Arc<Self>, online: bool) {
        self.mutate(|inner, state, now, events| {
            if state.online == online {
                return;
            }
            state.online = online;
            events.push(DownloadEvent::ConnectivityChanged { online });

            if online {
                info!("Connectivity restored; resuming downloads");
                inner.schedule(state, now, events);
            } else if let Some(active) = state.active.take() {
                active.token.cancel();
                if let Some(item) = state.items.get_mut(&active.id) {
                    item.set_status(DownloadStatus::Queued, now);
                    info!(id = %active.id, progress = item.progress, "Offline; download suspended");
                    events.push(DownloadEvent::Suspended {
                        id: active.id.clone(),
                        progress: item.progress,
                    });
                }
            }
        })
        .await;
    }

    /// Activates the first queued item if the slot is free and the device
    /// is online.
    fn schedule(self: &Arc<Self>, state: &mut DownloadState, now: i64, events: &mut Vec<DownloadEvent>) {
        if state.active.is_some() || !state.online || self.shutdown.is_cancelled() {
            return;
        }

        let DownloadState { items, queue, .. } = &mut *state;
        queue.retain(|id| items.contains_key(id));
        let next = queue
            .iter()
            .find(|id| items.get(*id).is_some_and(|item| item.status == DownloadStatus::Queued))
            .cloned();

        if let Some(id) = next {
            self.activate(state, &id, now, events);
        }
    }

    fn activate(self: &Arc<Self>, state: &mut DownloadState, id: &str, now: i64, events: &mut Vec<DownloadEvent>) {
        let Some(item) = state.items.get_mut(id) else {
            return;
        };
        item.set_status(DownloadStatus::Downloading, now);
        let progress = item.progress;
        let request = TransferRequest {
            track: item.track.clone(),
            resume_from: progress,
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.shutdown.child_token();
        state.active = Some(ActiveTransfer {
            id: id.to_string(),
            generation,
            token: token.clone(),
        });

        debug!(id, generation, progress, "Download activated");
        events.push(DownloadEvent::Started {
            id: id.to_string(),
            progress,
        });

        tokio::spawn(run_transfer(
            Arc::downgrade(self),
            Arc::clone(&self.source),
            id.to_string(),
            generation,
            token,
            request,
        ));
    }

    /// Applies one transfer update. Returns `false` once the transfer should
    /// stop.
    async fn apply(self: &Arc<Self>, id: &str, generation: u64, update: TransferUpdate) -> bool {
        self.mutate(move |inner, state, now, events| {
            if !state.is_current(id, generation) {
                return false;
            }

            match update {
                TransferUpdate::Received { received, total } => {
                    let fraction = if total == 0 {
                        0.0
                    } else {
                        received as f64 / total as f64
                    };
                    if fraction >= 1.0 {
                        inner.finish(state, id, None, now, events);
                        return false;
                    }
                    let Some(item) = state.items.get_mut(id) else {
                        return false;
                    };
                    item.progress = fraction.clamp(0.0, MAX_PARTIAL_PROGRESS);
                    item.updated_at = now;
                    events.push(DownloadEvent::Progress {
                        id: id.to_string(),
                        progress: item.progress,
                    });
                    true
                }
                TransferUpdate::Finished { local_uri } => {
                    inner.finish(state, id, Some(local_uri), now, events);
                    false
                }
                TransferUpdate::Failed { message } => {
                    inner.fail(state, id, message, now, events);
                    false
                }
            }
        })
        .await
    }

    fn finish(
        self: &Arc<Self>,
        state: &mut DownloadState,
        id: &str,
        local_uri: Option<String>,
        now: i64,
        events: &mut Vec<DownloadEvent>,
    ) {
        let Some(item) = state.items.get_mut(id) else {
            return;
        };
        let Some(local_uri) = local_uri.or_else(|| item.track.media_uri().map(str::to_string)) else {
            self.fail(state, id, format!("track {} has no media uri", id), now, events);
            return;
        };

        item.complete(local_uri.clone(), now);
        state.release(id);
        info!(id, "Download completed");
        events.push(DownloadEvent::Completed {
            id: id.to_string(),
            local_uri,
        });
        self.schedule(state, now, events);
    }

    fn fail(
        self: &Arc<Self>,
        state: &mut DownloadState,
        id: &str,
        message: String,
        now: i64,
        events: &mut Vec<DownloadEvent>,
    ) {
        if let Some(item) = state.items.get_mut(id) {
            item.fail(message.clone(), now);
        }
        state.release(id);
        warn!(id, error = %message, "Download failed");
        events.push(DownloadEvent::Failed {
            id: id.to_string(),
            message,
        });
        self.schedule(state, now, events);
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl DownloadState {
    /// Interrupted downloads come back as `queued` with their progress; the
    /// queue is rebuilt from pending items in creation order.
    fn restore(mut items: DownloadMap) -> Self {
        for item in items.values_mut() {
            if item.status == DownloadStatus::Downloading {
                item.status = DownloadStatus::Queued;
            }
        }

        let mut pending: Vec<&DownloadItem> =
            items.values().filter(|item| item.status.is_pending()).collect();
        pending.sort_by(|a, b| {
            (a.created_at, a.updated_at, &a.id).cmp(&(b.created_at, b.updated_at, &b.id))
        });
        let queue: VecDeque<String> = pending.iter().map(|item| item.id.clone()).collect();
        let last_created_at = items.values().map(|item| item.created_at).max().unwrap_or(0);

        Self {
            items,
            queue,
            active: None,
            online: true,
            revision: 0,
            outbox: Vec::new(),
            last_created_at,
        }
    }

    fn commit(&mut self, events: Vec<DownloadEvent>) {
        self.revision += 1;
        self.outbox.push(events);
    }

    fn is_current(&self, id: &str, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.id == id && active.generation == generation)
    }

    /// Cancels the active transfer if it belongs to `id`.
    fn stop_active_if(&mut self, id: &str) -> bool {
        if !self.active.as_ref().is_some_and(|active| active.id == id) {
            return false;
        }
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
        true
    }

    /// Frees the slot and drops `id` from the queue after a terminal update.
    fn release(&mut self, id: &str) {
        self.stop_active_if(id);
        self.dequeue(id);
    }

    fn enqueue(&mut self, id: &str) {
        if !self.is_queued(id) {
            self.queue.push_back(id.to_string());
        }
    }

    fn is_queued(&self, id: &str) -> bool {
        self.queue.iter().any(|queued| queued == id)
    }

    fn dequeue(&mut self, id: &str) {
        self.queue.retain(|queued| queued != id);
    }

    /// Strictly increasing creation stamps keep `downloads()` in request order.
    fn next_created_at(&mut self, now: i64) -> i64 {
        let created_at = now.max(self.last_created_at + 1);
        self.last_created_at = created_at;
        created_at
    }
}

async fn run_transfer(
    manager: Weak<ManagerInner>,
    source: Arc<dyn TransferSource>,
    id: String,
    generation: u64,
    token: CancellationToken,
    request: TransferRequest,
) {
    let opened = tokio::select! {
        _ = token.cancelled() => return,
        opened = source.open(request) => opened,
    };

    let mut transfer = match opened {
        Ok(transfer) => transfer,
        Err(err) => {
            if let Some(inner) = manager.upgrade() {
                inner
                    .apply(&id, generation, TransferUpdate::Failed { message: err.to_string() })
                    .await;
            }
            return;
        }
    };

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => None,
            update = transfer.next() => Some(update),
        };
        let Some(update) = next else {
            transfer.cancel().await;
            debug!(id = %id, generation, "Transfer cancelled");
            return;
        };

        let Some(inner) = manager.upgrade() else {
            return;
        };
        let update = update.unwrap_or_else(|| TransferUpdate::Failed {
            message: "transfer ended before completion".to_string(),
        });
        if !inner.apply(&id, generation, update).await {
            return;
        }
    }
}
