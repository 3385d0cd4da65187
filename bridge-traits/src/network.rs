//! Network Reachability Abstraction
//!
//! Lets the download manager suspend transfers while the device is offline and
//! resume them once connectivity returns.

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
    /// Reachability could not be determined; consumers keep their last known value.
    Indeterminate,
}

/// Snapshot of the device's connectivity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

impl NetworkInfo {
    pub fn connected(network_type: NetworkType) -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: Some(network_type),
            is_metered: matches!(network_type, NetworkType::Cellular),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }

    /// Reachability as a boolean, `None` when indeterminate.
    pub fn reachable(&self) -> Option<bool> {
        match self.status {
            NetworkStatus::Connected => Some(true),
            NetworkStatus::Disconnected => Some(false),
            NetworkStatus::Indeterminate => None,
        }
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: periodic reachability probe (see `bridge-desktop`)
/// - **iOS**: Network framework, Reachability
/// - **Android**: ConnectivityManager
/// - **Web**: `navigator.onLine` + `online`/`offline` events
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn can_download(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected().await
/// }
/// ```
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    async fn is_connected(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                ..
            })
        )
    }

    /// Subscribe to network status changes
    ///
    /// Implementations emit an update whenever the status changes.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of network status changes
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next network info update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NetworkInfo>;
}
