//! Persistent store adapter for the download map.
//!
//! The whole map lives under one namespaced key of the platform
//! [`SettingsStore`] as a JSON object keyed by track id.

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge_traits::SettingsStore;
use core_runtime::config::DEFAULT_DOWNLOADS_KEY;
use tracing::debug;

use crate::error::Result;
use crate::types::DownloadItem;

pub type DownloadMap = BTreeMap<String, DownloadItem>;

#[derive(Clone)]
pub struct DownloadStore {
    settings: Arc<dyn SettingsStore>,
    key: String,
}

impl DownloadStore {
    pub fn new(settings: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            settings,
            key: key.into(),
        }
    }

    pub fn with_default_key(settings: Arc<dyn SettingsStore>) -> Self {
        Self::new(settings, DEFAULT_DOWNLOADS_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the persisted map; an absent key is an empty map.
    pub async fn load(&self) -> Result<DownloadMap> {
        match self.settings.get_string(&self.key).await? {
            Some(json) => {
                let map: DownloadMap = serde_json::from_str(&json)?;
                debug!(key = %self.key, items = map.len(), "Loaded download map");
                Ok(map)
            }
            None => Ok(DownloadMap::new()),
        }
    }

    pub async fn save(&self, items: &DownloadMap) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.settings.set_string(&self.key, &json).await?;
        Ok(())
    }

    /// Deletes the key. Other keys of the settings store are untouched.
    pub async fn clear(&self) -> Result<()> {
        self.settings.delete(&self.key).await?;
        Ok(())
    }
}

impl std::fmt::Debug for DownloadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStore").field("key", &self.key).finish()
    }
}
