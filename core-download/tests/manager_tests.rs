//! Download queue behavior under paused tokio time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::NetworkInfo;
use common::*;
use core_download::{DownloadManager, DownloadStatus, DownloadStore, SimulatedTransferSource};
use core_library::{Track, TrackKind};
use core_runtime::config::DEFAULT_DOWNLOADS_KEY;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn requests_run_one_at_a_time_in_fifo_order() {
    let h = harness(4).await;
    for id in ["a", "b", "c"] {
        h.manager.request_download(track(id)).await.unwrap();
    }

    assert_eq!(h.manager.active_id().as_deref(), Some("a"));
    assert_eq!(h.manager.queue(), vec!["a", "b", "c"]);
    assert_eq!(status_of(&h.manager, "b"), Some(DownloadStatus::Queued));
    assert_invariants(&h.manager.downloads());

    sleep(ms(450)).await;
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Completed));
    assert_eq!(h.manager.active_id().as_deref(), Some("b"));
    assert_eq!(status_of(&h.manager, "c"), Some(DownloadStatus::Queued));
    assert_invariants(&h.manager.downloads());

    sleep(ms(800)).await;
    assert!(["a", "b", "c"].iter().all(|id| h.manager.get_is_downloaded(id)));
    assert!(h.manager.active_id().is_none());
    assert!(h.manager.queue().is_empty());
    assert_invariants(&h.manager.downloads());
}

#[tokio::test(start_paused = true)]
async fn completion_sets_local_uri_from_track() {
    let h = harness(2).await;
    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;

    let item = h.manager.get_download("a").unwrap();
    assert_eq!(item.status, DownloadStatus::Completed);
    assert_eq!(item.progress, 1.0);
    assert_eq!(item.local_uri.as_deref(), Some("https://cdn.test/a.mp3"));
    assert!(h.manager.get_is_downloaded("a"));
    assert!(!h.manager.get_is_downloaded("missing"));
}

#[tokio::test(start_paused = true)]
async fn progress_advances_one_step_per_tick() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();

    sleep(ms(350)).await;
    assert!((progress_of(&h.manager, "a") - 0.3).abs() < 1e-9);
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Downloading));
}

#[tokio::test(start_paused = true)]
async fn downloads_are_listed_in_request_order() {
    let h = harness(100).await;
    for id in ["z", "m", "a"] {
        h.manager.request_download(track(id)).await.unwrap();
    }

    let ids: Vec<String> = h.manager.downloads().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["z", "m", "a"]);
}

// ============================================================================
// Request semantics
// ============================================================================

#[tokio::test(start_paused = true)]
async fn re_requesting_a_completed_track_is_a_no_op() {
    let h = harness(2).await;
    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;
    let before = h.manager.get_download("a").unwrap();

    let mut rx = h.bus.subscribe();
    h.clock.advance_millis(5_000);
    h.manager.request_download(track("a")).await.unwrap();

    assert_eq!(h.manager.get_download("a").unwrap(), before);
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn re_requesting_the_active_track_restarts_it() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(450)).await;
    assert!(progress_of(&h.manager, "a") > 0.3);

    h.manager.request_download(track("a")).await.unwrap();
    assert_eq!(progress_of(&h.manager, "a"), 0.0);
    assert_eq!(h.manager.active_id().as_deref(), Some("a"));
    assert_eq!(h.manager.queue(), vec!["a"]);

    sleep(ms(150)).await;
    assert!((progress_of(&h.manager, "a") - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn track_without_id_is_rejected() {
    let h = harness(10).await;
    let nameless = Track::new("", "Nameless", "Nobody", TrackKind::Song)
        .with_audio_url("https://cdn.test/x.mp3");

    assert!(h.manager.request_download(nameless).await.is_err());
    assert!(h.manager.downloads().is_empty());
}

#[tokio::test(start_paused = true)]
async fn track_without_remote_uri_fails_and_frees_the_slot() {
    let h = harness(2).await;
    let bare = Track::new("bare", "Bare", "Host", TrackKind::Song);
    h.manager.request_download(bare).await.unwrap();
    h.manager.request_download(track("b")).await.unwrap();

    sleep(ms(10)).await;
    let failed = h.manager.get_download("bare").unwrap();
    assert_eq!(failed.status, DownloadStatus::Error);
    assert!(failed.error.is_some());
    assert!(failed.local_uri.is_none());
    assert_eq!(h.manager.active_id().as_deref(), Some("b"));
    assert!(!h.manager.queue().contains(&"bare".to_string()));

    // A fresh request retries the terminal item
    h.manager
        .request_download(track("bare"))
        .await
        .unwrap();
    assert_eq!(status_of(&h.manager, "bare"), Some(DownloadStatus::Queued));
}

// ============================================================================
// Pause / resume / cancel / remove
// ============================================================================

#[tokio::test(start_paused = true)]
async fn pause_then_resume_continues_from_recorded_progress() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(450)).await;

    h.manager.pause_download("a").await;
    let paused = progress_of(&h.manager, "a");
    assert!((paused - 0.4).abs() < 1e-9);
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Paused));
    assert!(h.manager.active_id().is_none());

    sleep(ms(1_000)).await;
    assert_eq!(progress_of(&h.manager, "a"), paused);

    h.manager.resume_download("a").await;
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Downloading));
    sleep(ms(150)).await;
    assert!((progress_of(&h.manager, "a") - 0.5).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn pausing_the_active_item_starts_the_next() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    h.manager.request_download(track("b")).await.unwrap();
    sleep(ms(250)).await;

    h.manager.pause_download("a").await;

    assert_eq!(h.manager.active_id().as_deref(), Some("b"));
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Paused));
    assert_invariants(&h.manager.downloads());
}

#[tokio::test(start_paused = true)]
async fn invalid_operations_are_no_ops() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    h.manager.request_download(track("b")).await.unwrap();

    h.manager.pause_download("b").await;
    h.manager.resume_download("a").await;
    h.manager.resume_download("unknown").await;
    h.manager.cancel_download("unknown").await;
    h.manager.remove_download("unknown").await;

    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Downloading));
    assert_eq!(status_of(&h.manager, "b"), Some(DownloadStatus::Queued));
    assert_eq!(h.manager.queue(), vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn cancel_resets_progress_and_starts_the_next_item() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    h.manager.request_download(track("b")).await.unwrap();
    sleep(ms(250)).await;

    h.manager.cancel_download("a").await;

    let canceled = h.manager.get_download("a").unwrap();
    assert_eq!(canceled.status, DownloadStatus::Canceled);
    assert_eq!(canceled.progress, 0.0);
    assert_eq!(h.manager.active_id().as_deref(), Some("b"));
    assert_eq!(h.manager.queue(), vec!["b"]);

    // The cancelled transfer never moves the item again
    sleep(ms(500)).await;
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Canceled));
    assert_eq!(progress_of(&h.manager, "a"), 0.0);
}

#[tokio::test(start_paused = true)]
async fn cancel_keeps_completed_items() {
    let h = harness(2).await;
    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;

    h.manager.cancel_download("a").await;
    assert!(h.manager.get_is_downloaded("a"));
}

#[tokio::test(start_paused = true)]
async fn remove_deletes_the_item_and_frees_the_slot() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    h.manager.request_download(track("b")).await.unwrap();

    h.manager.remove_download("a").await;

    assert!(h.manager.get_download("a").is_none());
    assert_eq!(h.manager.active_id().as_deref(), Some("b"));
    sleep(ms(500)).await;
    assert!(h.manager.get_download("a").is_none());
}

#[tokio::test(start_paused = true)]
async fn clear_all_wipes_memory_and_storage() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    h.manager.request_download(track("b")).await.unwrap();
    sleep(ms(150)).await;
    assert!(h.settings.raw(DEFAULT_DOWNLOADS_KEY).is_some());

    h.manager.clear_all_downloads().await;

    assert!(h.manager.downloads().is_empty());
    assert!(h.manager.queue().is_empty());
    assert!(h.manager.active_id().is_none());
    assert!(h.settings.raw(DEFAULT_DOWNLOADS_KEY).is_none());

    sleep(ms(500)).await;
    assert!(h.settings.raw(DEFAULT_DOWNLOADS_KEY).is_none());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn restart_resumes_interrupted_download_from_last_progress() {
    let settings = Arc::new(MemoryStore::default());
    let first = harness_with(settings.clone(), 10, true).await;
    first.manager.request_download(track("a")).await.unwrap();
    first.manager.request_download(track("b")).await.unwrap();
    sleep(ms(350)).await;
    first.manager.shutdown();

    let second = harness_with(settings.clone(), 10, false).await;
    let restored = second.manager.get_download("a").unwrap();
    assert_eq!(restored.status, DownloadStatus::Queued);
    assert!((restored.progress - 0.3).abs() < 1e-9);
    assert_eq!(second.manager.queue(), vec!["a", "b"]);
    assert!(second.manager.active_id().is_none());
    drop(second);

    let third = harness_with(settings, 10, true).await;
    assert_eq!(third.manager.active_id().as_deref(), Some("a"));
    sleep(ms(150)).await;
    assert!((progress_of(&third.manager, "a") - 0.4).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn paused_items_survive_restart_as_paused() {
    let settings = Arc::new(MemoryStore::default());
    let first = harness_with(settings.clone(), 10, true).await;
    first.manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;
    first.manager.pause_download("a").await;
    first.manager.shutdown();

    let second = harness_with(settings, 10, true).await;
    assert_eq!(status_of(&second.manager, "a"), Some(DownloadStatus::Paused));
    assert!(second.manager.active_id().is_none());

    second.manager.resume_download("a").await;
    sleep(ms(150)).await;
    assert!((progress_of(&second.manager, "a") - 0.3).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn re_requested_item_keeps_its_queue_position_across_restart() {
    let settings = Arc::new(MemoryStore::default());
    let first = harness_with(settings.clone(), 10, true).await;
    for id in ["a", "b", "c"] {
        first.manager.request_download(track(id)).await.unwrap();
    }
    first.manager.cancel_download("b").await;
    first.manager.request_download(track("b")).await.unwrap();

    let before = first.manager.queue();
    assert_eq!(before, vec!["a", "c", "b"]);
    first.manager.shutdown();

    let second = harness_with(settings, 10, false).await;
    assert_eq!(second.manager.queue(), before);
    let ids: Vec<String> = second.manager.downloads().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["a", "c", "b"]);
}

#[tokio::test(start_paused = true)]
async fn unreadable_persisted_map_starts_empty() {
    let settings = Arc::new(MemoryStore::default());
    settings.put_raw(DEFAULT_DOWNLOADS_KEY, "{not json");

    let h = harness_with(settings, 10, true).await;
    assert!(h.manager.downloads().is_empty());

    h.manager.request_download(track("a")).await.unwrap();
    assert_eq!(h.manager.active_id().as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn persistence_faults_do_not_stop_the_queue() {
    let manager = DownloadManager::builder(
        DownloadStore::with_default_key(Arc::new(failing_store())),
        Arc::new(SimulatedTransferSource::new(TICK, 2)),
    )
    .open()
    .await;

    manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;
    assert!(manager.get_is_downloaded("a"));

    manager.clear_all_downloads().await;
    assert!(manager.downloads().is_empty());
}

// ============================================================================
// Connectivity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn going_offline_suspends_and_coming_back_resumes() {
    let h = harness(10).await;
    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;

    h.manager.set_online(false).await;
    assert!(!h.manager.is_online());
    assert!(h.manager.active_id().is_none());
    assert_eq!(status_of(&h.manager, "a"), Some(DownloadStatus::Queued));
    let suspended = progress_of(&h.manager, "a");

    // New requests wait while offline
    h.manager.request_download(track("b")).await.unwrap();
    sleep(ms(1_000)).await;
    assert_eq!(progress_of(&h.manager, "a"), suspended);
    assert!(h.manager.active_id().is_none());

    h.manager.set_online(true).await;
    assert_eq!(h.manager.active_id().as_deref(), Some("a"));
    sleep(ms(150)).await;
    assert!(progress_of(&h.manager, "a") > suspended);
}

#[tokio::test(start_paused = true)]
async fn network_watcher_follows_the_monitor() {
    let h = harness(10).await;
    let (monitor, changes) = ScriptedMonitor::new(wifi());
    let watcher = h.manager.watch_network(monitor);

    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(50)).await;
    assert!(h.manager.is_online());

    changes.send(NetworkInfo::disconnected()).unwrap();
    sleep(ms(10)).await;
    assert!(!h.manager.is_online());

    let mut indeterminate = wifi();
    indeterminate.status = bridge_traits::NetworkStatus::Indeterminate;
    changes.send(indeterminate).unwrap();
    sleep(ms(10)).await;
    assert!(!h.manager.is_online());

    changes.send(wifi()).unwrap();
    sleep(ms(10)).await;
    assert!(h.manager.is_online());
    assert_eq!(h.manager.active_id().as_deref(), Some("a"));

    h.manager.shutdown();
    watcher.await.unwrap();
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test(start_paused = true)]
async fn lifecycle_is_published_on_the_bus() {
    let h = harness(2).await;
    let mut rx = h.bus.subscribe();

    h.manager.request_download(track("a")).await.unwrap();
    sleep(ms(250)).await;

    let mut events = Vec::new();
    while let Ok(CoreEvent::Download(event)) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            DownloadEvent::Queued {
                id: "a".into(),
                title: "Episode a".into(),
            },
            DownloadEvent::Started {
                id: "a".into(),
                progress: 0.0,
            },
            DownloadEvent::Progress {
                id: "a".into(),
                progress: 0.5,
            },
            DownloadEvent::Completed {
                id: "a".into(),
                local_uri: "https://cdn.test/a.mp3".into(),
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn events_committed_during_a_slow_write_keep_commit_order() {
    let settings = Arc::new(SlowStore {
        inner: MemoryStore::default(),
        delay: ms(50),
    });
    let bus = EventBus::new(64);
    let manager = DownloadManager::builder(
        DownloadStore::with_default_key(settings.clone()),
        Arc::new(SimulatedTransferSource::new(TICK, 10)),
    )
    .event_bus(bus.clone())
    .open()
    .await;

    manager.request_download(track("a")).await.unwrap();
    let mut rx = bus.subscribe();

    // The first tick lands at +100ms and its write is still in flight at +120ms
    sleep(ms(70)).await;
    manager.pause_download("a").await;

    let mut events = Vec::new();
    while let Ok(CoreEvent::Download(event)) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            DownloadEvent::Progress {
                id: "a".into(),
                progress: 0.1,
            },
            DownloadEvent::Paused {
                id: "a".into(),
                progress: 0.1,
            },
        ]
    );

    let persisted = DownloadStore::with_default_key(settings).load().await.unwrap();
    assert_eq!(persisted["a"].status, DownloadStatus::Paused);
}
