//! Core service façade and bootstrap helpers.
//!
//! [`CoreService::bootstrap`] turns a validated [`CoreConfig`] into a running
//! playback engine and download manager that share one event bus. Desktop
//! builds enable the `desktop-shims` feature so a `database_path` is enough to
//! get a SQLite-backed settings store; other hosts inject their own.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::SettingsStore;
use core_download::{DownloadManager, DownloadStore, SimulatedTransferSource, TransferSource};
use core_playback::PlaybackEngine;
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    events: EventBus,
    playback: PlaybackEngine,
    downloads: DownloadManager,
}

impl CoreService {
    /// Bootstrap with the simulated transfer source configured by
    /// `config.downloads`.
    #[instrument(skip(config))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let source = Arc::new(SimulatedTransferSource::from_settings(&config.downloads));
        Self::bootstrap_with_transfer_source(config, source).await
    }

    /// Bootstrap with a host-provided transfer source.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CapabilityMissing`] when no settings store can be
    ///   resolved
    /// - [`CoreError::Config`] when the configuration fails validation
    /// - [`CoreError::InitializationFailed`] when the default store cannot
    ///   be opened
    #[instrument(skip(config, source))]
    pub async fn bootstrap_with_transfer_source(
        config: CoreConfig,
        source: Arc<dyn TransferSource>,
    ) -> Result<Self> {
        config.validate()?;

        let settings = resolve_settings_store(&config).await?;
        let events = EventBus::new(config.event_buffer_size);

        let playback = PlaybackEngine::new(
            config.media_backend.clone(),
            &config.playback,
            events.clone(),
        );

        let store = DownloadStore::new(settings, config.downloads.storage_key.clone());
        let downloads = DownloadManager::builder(store, source)
            .event_bus(events.clone())
            .clock(config.clock.clone())
            .resume_on_start(config.features.resume_downloads_on_start)
            .open()
            .await;

        if config.features.enable_network_awareness {
            if let Some(monitor) = config.network_monitor.clone() {
                downloads.watch_network(monitor);
            }
        }

        info!(
            backend = config.media_backend.name(),
            restored = downloads.downloads().len(),
            "Core service ready"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                events,
                playback,
                downloads,
            }),
        })
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.inner.playback
    }

    pub fn downloads(&self) -> &DownloadManager {
        &self.inner.downloads
    }

    /// Bus carrying playback and download events.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Release the media session and stop download work. Persisted
    /// downloads stay on disk for the next bootstrap.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.inner.playback.unload().await;
        self.inner.downloads.shutdown();
        info!("Core service shut down");
    }
}

async fn resolve_settings_store(config: &CoreConfig) -> Result<Arc<dyn SettingsStore>> {
    if let Some(store) = &config.settings_store {
        return Ok(store.clone());
    }
    match &config.database_path {
        Some(path) => open_default_store(path).await,
        None => Err(settings_store_missing()),
    }
}

#[cfg(feature = "desktop-shims")]
async fn open_default_store(path: &std::path::Path) -> Result<Arc<dyn SettingsStore>> {
    let store = bridge_desktop::SqliteSettingsStore::new(path.to_path_buf())
        .await
        .map_err(|e| {
            CoreError::InitializationFailed(format!(
                "Failed to open settings database at {}: {}",
                path.display(),
                e
            ))
        })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn open_default_store(_path: &std::path::Path) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing())
}

fn settings_store_missing() -> CoreError {
    CoreError::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "No settings store injected and the SQLite default is unavailable. \
                  Enable 'desktop-shims' or inject a SettingsStore."
            .to_string(),
    }
}
