//! # Core Configuration Module
//!
//! Configuration for the media core, assembled with [`CoreConfigBuilder`].
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - durable storage for the download map. Either inject one
//!   or set a `database_path` so the service can open the desktop SQLite store.
//! - `MediaBackend` - media session strategy used by the playback engine.
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - reachability source (required when
//!   `enable_network_awareness` is set)
//! - `Clock` - wall-clock source for download timestamps (default: system clock)
//!
//! When the `desktop-shims` feature is enabled the clock-driven desktop media
//! backend is injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/media-core.db")
//!     .progress_interval_ms(250)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! `build()` fails fast with actionable messages:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Neither a settings store nor a database path
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing storage");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, MediaBackend, NetworkMonitor, SettingsStore, SystemClock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Storage key owned by the download manager.
pub const DEFAULT_DOWNLOADS_KEY: &str = "media_core.downloads.v1";

const MAX_INTERVAL_MS: u64 = 60_000;
const MAX_STEPS: u32 = 10_000;

/// Core configuration. Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// SQLite file for the desktop default settings store
    pub database_path: Option<PathBuf>,

    /// Injected durable storage; takes precedence over `database_path`
    pub settings_store: Option<Arc<dyn SettingsStore>>,

    /// Media session strategy
    pub media_backend: Arc<dyn MediaBackend>,

    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    pub clock: Arc<dyn Clock>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub playback: PlaybackSettings,

    pub downloads: DownloadSettings,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .field("media_backend", &self.media_backend.name())
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("playback", &self.playback)
            .field("downloads", &self.downloads)
            .field("features", &self.features)
            .finish()
    }
}

/// Playback engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Progress sampling cadence in milliseconds
    pub progress_interval_ms: u64,
    /// Volume applied before the first `set_volume` call, `0.0..=1.0`
    pub initial_volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            initial_volume: 1.0,
        }
    }
}

impl PlaybackSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == 0 || self.progress_interval_ms > MAX_INTERVAL_MS {
            return Err(Error::Config(format!(
                "Progress interval must be between 1ms and {}ms, got {}ms",
                MAX_INTERVAL_MS, self.progress_interval_ms
            )));
        }
        if !self.initial_volume.is_finite() || !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::Config(format!(
                "Initial volume must be within 0.0..=1.0, got {}",
                self.initial_volume
            )));
        }
        Ok(())
    }
}

/// Download manager tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Cadence of the simulated transfer in milliseconds
    pub tick_interval_ms: u64,
    /// Number of ticks a simulated transfer needs to complete
    pub steps_to_complete: u32,
    /// Key under which the download map is persisted
    pub storage_key: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 300,
            steps_to_complete: 100,
            storage_key: DEFAULT_DOWNLOADS_KEY.to_string(),
        }
    }
}

impl DownloadSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_INTERVAL_MS {
            return Err(Error::Config(format!(
                "Download tick interval must be between 1ms and {}ms, got {}ms",
                MAX_INTERVAL_MS, self.tick_interval_ms
            )));
        }
        if self.steps_to_complete == 0 || self.steps_to_complete > MAX_STEPS {
            return Err(Error::Config(format!(
                "Download steps must be between 1 and {}, got {}",
                MAX_STEPS, self.steps_to_complete
            )));
        }
        if self.storage_key.trim().is_empty() {
            return Err(Error::Config(
                "Download storage key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Suspend downloads while offline (requires NetworkMonitor)
    pub enable_network_awareness: bool,

    /// Start the restored download queue as soon as the manager opens
    pub resume_downloads_on_start: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_network_awareness: false,
            resume_downloads_on_start: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - A storage source is available
    /// - Playback and download settings are within range
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        match (&self.settings_store, &self.database_path) {
            (None, None) => return Err(settings_store_missing_error()),
            (None, Some(path)) if path.as_os_str().is_empty() => {
                return Err(Error::Config("Database path cannot be empty".to_string()))
            }
            _ => {}
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.playback.validate()?;
        self.downloads.validate()?;

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn settings_store_missing_error() -> Error {
    Error::capability_missing(
        "SettingsStore",
        "Durable storage is required to persist downloads. \
         Desktop: set database_path to use the SQLite settings store. \
         Mobile: inject platform-native settings (UserDefaults/DataStore).",
    )
}

#[cfg(not(feature = "desktop-shims"))]
fn media_backend_missing_error() -> Error {
    Error::capability_missing(
        "MediaBackend",
        "A MediaBackend is required for playback. \
         Desktop: enable the 'desktop-shims' feature to use the clock-driven backend. \
         Mobile: inject the native player (AVPlayer, ExoPlayer).",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_backend() -> Result<Arc<dyn MediaBackend>> {
    use bridge_desktop::ClockedMediaBackend;

    let backend: Arc<dyn MediaBackend> = Arc::new(ClockedMediaBackend::new());
    Ok(backend)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_backend() -> Result<Arc<dyn MediaBackend>> {
    Err(media_backend_missing_error())
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    media_backend: Option<Arc<dyn MediaBackend>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    playback: PlaybackSettings,
    downloads: DownloadSettings,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// SQLite file used when no settings store is injected.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn media_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.media_backend = Some(backend);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn playback_settings(mut self, settings: PlaybackSettings) -> Self {
        self.playback = settings;
        self
    }

    pub fn progress_interval_ms(mut self, interval_ms: u64) -> Self {
        self.playback.progress_interval_ms = interval_ms;
        self
    }

    pub fn initial_volume(mut self, volume: f32) -> Self {
        self.playback.initial_volume = volume;
        self
    }

    pub fn download_settings(mut self, settings: DownloadSettings) -> Self {
        self.downloads = settings;
        self
    }

    pub fn download_tick_interval_ms(mut self, interval_ms: u64) -> Self {
        self.downloads.tick_interval_ms = interval_ms;
        self
    }

    pub fn download_steps(mut self, steps: u32) -> Self {
        self.downloads.steps_to_complete = steps;
        self
    }

    pub fn downloads_storage_key(mut self, key: impl Into<String>) -> Self {
        self.downloads.storage_key = key.into();
        self
    }

    pub fn enable_network_awareness(mut self, enable: bool) -> Self {
        self.features.enable_network_awareness = enable;
        self
    }

    pub fn resume_downloads_on_start(mut self, enable: bool) -> Self {
        self.features.resume_downloads_on_start = enable;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when neither a settings store nor a
    ///   database path is set, or no media backend is available
    /// - [`Error::Config`] when a setting is out of range or a feature flag
    ///   needs a bridge that was not provided
    pub fn build(self) -> Result<CoreConfig> {
        let media_backend = match self.media_backend {
            Some(backend) => backend,
            None => provide_default_media_backend()?,
        };

        let config = CoreConfig {
            database_path: self.database_path,
            settings_store: self.settings_store,
            media_backend,
            network_monitor: self.network_monitor,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            playback: self.playback,
            downloads: self.downloads,
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}
