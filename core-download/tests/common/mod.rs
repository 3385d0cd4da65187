//! Shared fixtures for download manager tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    FixedClock, NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkType, SettingsStore,
};
use core_download::{DownloadItem, DownloadManager, DownloadStatus, DownloadStore, SimulatedTransferSource};
use core_library::{Track, TrackKind};
use core_runtime::events::EventBus;
use mockall::mock;
use tokio::sync::mpsc;

pub const TICK: Duration = Duration::from_millis(100);

/// Process-local settings store with no real IO, so paused-time tests stay
/// deterministic.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.put_raw(key, value);
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.values.lock().unwrap().contains_key(key))
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.values.lock().unwrap().keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

/// Memory store whose writes take `delay` of (paused) time.
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

#[async_trait]
impl SettingsStore for SlowStore {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_string(key, value).await
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        self.inner.get_string(key).await
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        self.inner.has_key(key).await
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        self.inner.list_keys().await
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.inner.clear_all().await
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl SettingsStore for Store {
        async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()>;
        async fn get_string(&self, key: &str) -> BridgeResult<Option<String>>;
        async fn delete(&self, key: &str) -> BridgeResult<()>;
        async fn has_key(&self, key: &str) -> BridgeResult<bool>;
        async fn list_keys(&self) -> BridgeResult<Vec<String>>;
        async fn clear_all(&self) -> BridgeResult<()>;
    }
}

/// Store that reads as empty and rejects every write.
pub fn failing_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_get_string().returning(|_| Ok(None));
    store
        .expect_set_string()
        .returning(|_, _| Err(BridgeError::DatabaseError("disk full".into())));
    store
        .expect_delete()
        .returning(|_| Err(BridgeError::DatabaseError("disk full".into())));
    store
}

/// Monitor fed from a channel.
pub struct ScriptedMonitor {
    initial: NetworkInfo,
    changes: Mutex<Option<mpsc::UnboundedReceiver<NetworkInfo>>>,
}

impl ScriptedMonitor {
    pub fn new(initial: NetworkInfo) -> (Arc<Self>, mpsc::UnboundedSender<NetworkInfo>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(Self {
            initial,
            changes: Mutex::new(Some(rx)),
        });
        (monitor, tx)
    }
}

struct ChannelStream(mpsc::UnboundedReceiver<NetworkInfo>);

#[async_trait]
impl NetworkChangeStream for ChannelStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.0.recv().await
    }
}

#[async_trait]
impl NetworkMonitor for ScriptedMonitor {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(self.initial.clone())
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        let rx = self
            .changes
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("already subscribed".into()))?;
        Ok(Box::new(ChannelStream(rx)))
    }
}

pub fn wifi() -> NetworkInfo {
    NetworkInfo::connected(NetworkType::WiFi)
}

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Episode {}", id), "Host", TrackKind::Podcast)
        .with_audio_url(format!("https://cdn.test/{}.mp3", id))
        .with_duration_secs(600)
}

pub struct Harness {
    pub manager: DownloadManager,
    pub settings: Arc<MemoryStore>,
    pub bus: EventBus,
    pub clock: Arc<FixedClock>,
}

/// Manager over a fresh memory store with `steps` ticks per download.
pub async fn harness(steps: u32) -> Harness {
    harness_with(Arc::new(MemoryStore::default()), steps, true).await
}

pub async fn harness_with(settings: Arc<MemoryStore>, steps: u32, resume_on_start: bool) -> Harness {
    let bus = EventBus::new(1024);
    let clock = Arc::new(FixedClock::at_millis(1_700_000_000_000));
    let manager = DownloadManager::builder(
        DownloadStore::with_default_key(settings.clone()),
        Arc::new(SimulatedTransferSource::new(TICK, steps)),
    )
    .event_bus(bus.clone())
    .clock(clock.clone())
    .resume_on_start(resume_on_start)
    .open()
    .await;

    Harness {
        manager,
        settings,
        bus,
        clock,
    }
}

/// `completed ⇔ progress == 1 ⇔ local_uri set`, and at most one item
/// downloading.
pub fn assert_invariants(items: &[DownloadItem]) {
    for item in items {
        let completed = item.status == DownloadStatus::Completed;
        assert_eq!(completed, item.progress == 1.0, "progress invariant for {}", item.id);
        assert_eq!(completed, item.local_uri.is_some(), "local uri invariant for {}", item.id);
    }
    let downloading = items
        .iter()
        .filter(|item| item.status == DownloadStatus::Downloading)
        .count();
    assert!(downloading <= 1, "{} items downloading at once", downloading);
}

pub fn status_of(manager: &DownloadManager, id: &str) -> Option<DownloadStatus> {
    manager.get_download(id).map(|item| item.status)
}

pub fn progress_of(manager: &DownloadManager, id: &str) -> f64 {
    manager.get_download(id).map_or(0.0, |item| item.progress)
}
