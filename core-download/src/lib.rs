//! # Download Module
//!
//! Offline download queue with a single active transfer.
//!
//! ## Overview
//!
//! This module handles:
//! - FIFO scheduling of requested tracks through one active slot
//! - Pause, resume, cancel and removal of individual downloads
//! - Persisting the download map through the platform `SettingsStore`
//! - Suspending and resuming transfers as connectivity changes
//!
//! ## Usage
//!
//! ```ignore
//! use core_download::{DownloadManager, DownloadStore, SimulatedTransferSource};
//!
//! let manager = DownloadManager::builder(
//!     DownloadStore::with_default_key(settings),
//!     Arc::new(SimulatedTransferSource::default()),
//! )
//! .event_bus(bus.clone())
//! .open()
//! .await;
//!
//! manager.request_download(track).await?;
//! ```

pub mod error;
pub mod manager;
pub mod store;
pub mod transfer;
pub mod types;

pub use error::{DownloadError, Result};
pub use manager::{DownloadManager, DownloadManagerBuilder};
pub use store::{DownloadMap, DownloadStore};
pub use transfer::{SimulatedTransferSource, Transfer, TransferRequest, TransferSource, TransferUpdate};
pub use types::{DownloadItem, DownloadStatus};
