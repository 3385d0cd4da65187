//! Durable Storage Abstraction
//!
//! Key-value persistence used by the core for state that must survive a
//! process restart (the download map in particular).

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite (see `bridge-desktop`)
/// - Web: localStorage / IndexedDB
///
/// Values are opaque strings; callers that need structure serialize to JSON
/// themselves. A `set_string` followed by `get_string` for the same key must
/// observe the written value once the write future resolves.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("downloads", "{}").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any existing value for `key`
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}
