use std::path::PathBuf;
use std::time::Duration;

use core_library::{Track, TrackKind};
use core_playback::PlaybackState;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, DownloadEvent, PlaybackEvent};
use core_service::{CoreError, CoreService};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::{sleep, timeout, Instant};

fn temp_db() -> PathBuf {
    std::env::temp_dir()
        .join(format!("media-core-{}", uuid::Uuid::new_v4()))
        .join("settings.db")
}

fn config(path: &PathBuf) -> CoreConfig {
    CoreConfig::builder()
        .database_path(path.clone())
        .download_tick_interval_ms(10)
        .download_steps(3)
        .build()
        .unwrap()
}

fn episode(id: &str) -> Track {
    Track::new(id, format!("Episode {}", id), "Host", TrackKind::Podcast)
        .with_audio_url(format!("https://cdn.test/{}.mp3", id))
        .with_duration_secs(120)
}

async fn wait_until_downloaded(service: &CoreService, id: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !service.downloads().get_is_downloaded(id) {
        assert!(Instant::now() < deadline, "download of {} never completed", id);
        sleep(Duration::from_millis(10)).await;
    }
}

/// Completion events are emitted after the snapshot is persisted.
async fn wait_for_completion(events: &mut Receiver<CoreEvent>, id: &str) {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(CoreEvent::Download(DownloadEvent::Completed { id: done, .. })) if done == id => {
                    return
                }
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        }
    };
    timeout(Duration::from_secs(5), wait)
        .await
        .expect("download never completed");
}

#[tokio::test]
async fn bootstrap_wires_playback_and_downloads_to_one_bus() {
    let path = temp_db();
    let service = CoreService::bootstrap(config(&path)).await.unwrap();
    let mut events = service.events().subscribe();

    service.downloads().request_download(episode("e1")).await.unwrap();
    wait_until_downloaded(&service, "e1").await;

    service.playback().load_and_play(episode("e1")).await.unwrap();
    assert_eq!(service.playback().state(), PlaybackState::Playing);

    let mut saw_download = false;
    let mut saw_playback = false;
    while let Ok(Ok(event)) = timeout(Duration::from_millis(200), events.recv()).await {
        match event {
            CoreEvent::Download(DownloadEvent::Completed { id, .. }) if id == "e1" => {
                saw_download = true
            }
            CoreEvent::Playback(PlaybackEvent::Started { track_id, .. }) if track_id == "e1" => {
                saw_playback = true
            }
            _ => {}
        }
        if saw_download && saw_playback {
            break;
        }
    }
    assert!(saw_download, "no download completion on the bus");
    assert!(saw_playback, "no playback start on the bus");

    service.shutdown().await;
    assert_eq!(service.playback().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn completed_downloads_survive_a_restart() {
    let path = temp_db();
    {
        let service = CoreService::bootstrap(config(&path)).await.unwrap();
        let mut events = service.events().subscribe();
        service.downloads().request_download(episode("keep")).await.unwrap();
        wait_for_completion(&mut events, "keep").await;
        service.shutdown().await;
    }

    let service = CoreService::bootstrap(config(&path)).await.unwrap();
    assert!(service.downloads().get_is_downloaded("keep"));
    let item = service.downloads().get_download("keep").unwrap();
    assert_eq!(item.progress, 1.0);
    assert!(item.local_uri.is_some());
    service.shutdown().await;
}

#[tokio::test]
async fn bootstrap_without_storage_reports_missing_capability() {
    let mut config = config(&temp_db());
    config.database_path = None;

    match CoreService::bootstrap(config).await {
        Err(CoreError::CapabilityMissing { capability, .. }) => {
            assert_eq!(capability, "SettingsStore")
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("bootstrap succeeded without a settings store"),
    }
}

#[tokio::test]
async fn bootstrap_rejects_invalid_settings() {
    let mut config = config(&temp_db());
    config.event_buffer_size = 0;

    assert!(matches!(
        CoreService::bootstrap(config).await,
        Err(CoreError::Config(_))
    ));
}
