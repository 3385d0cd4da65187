//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SettingsStore` using a SQLite-backed key-value table (`sqlx`)
//! - `MediaBackend` driven by the tokio clock (no native decoder required)
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ClockedMediaBackend, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let path = SqliteSettingsStore::default_path("my-player").unwrap();
//!     let store = SqliteSettingsStore::new(path).await.unwrap();
//!     let backend = ClockedMediaBackend::new();
//!
//!     // Hand both to CoreConfig::builder()
//! }
//! ```

mod media;
mod network;
mod settings;

pub use media::ClockedMediaBackend;
pub use network::DesktopNetworkMonitor;
pub use settings::SqliteSettingsStore;
