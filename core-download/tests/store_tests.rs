mod common;

use std::sync::Arc;

use bridge_desktop::SqliteSettingsStore;
use bridge_traits::SettingsStore;
use common::{track, MemoryStore};
use core_download::{DownloadItem, DownloadMap, DownloadStatus, DownloadStore};

fn sample_map() -> DownloadMap {
    let mut done = DownloadItem::queued(track("done"), 1, 1);
    done.status = DownloadStatus::Completed;
    done.progress = 1.0;
    done.local_uri = Some("file:///media/done.mp3".into());
    done.updated_at = 9;

    let mut partial = DownloadItem::queued(track("partial"), 2, 2);
    partial.status = DownloadStatus::Paused;
    partial.progress = 0.25;

    let mut broken = DownloadItem::queued(track("broken"), 3, 3);
    broken.status = DownloadStatus::Error;
    broken.error = Some("connection reset".into());

    [done, partial, broken]
        .into_iter()
        .map(|item| (item.id.clone(), item))
        .collect()
}

#[tokio::test]
async fn restore_of_persist_is_identity_on_sqlite() {
    let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
    let store = DownloadStore::with_default_key(settings);
    let map = sample_map();

    store.save(&map).await.unwrap();
    assert_eq!(store.load().await.unwrap(), map);
}

#[tokio::test]
async fn absent_key_loads_empty_and_clear_removes_only_that_key() {
    let settings = Arc::new(MemoryStore::default());
    settings.set_string("theme", "dark").await.unwrap();
    let store = DownloadStore::new(settings.clone(), "downloads.test");

    assert!(store.load().await.unwrap().is_empty());

    store.save(&sample_map()).await.unwrap();
    assert!(settings.has_key("downloads.test").await.unwrap());

    store.clear().await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
    assert_eq!(settings.get_string("theme").await.unwrap().as_deref(), Some("dark"));
}

#[tokio::test]
async fn persisted_json_is_keyed_by_track_id() {
    let settings = Arc::new(MemoryStore::default());
    let store = DownloadStore::new(settings.clone(), "downloads.test");
    store.save(&sample_map()).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&settings.raw("downloads.test").unwrap()).unwrap();
    assert_eq!(raw["partial"]["status"], "paused");
    assert_eq!(raw["done"]["localUri"], "file:///media/done.mp3");
    assert_eq!(raw["broken"]["error"], "connection reset");
}
