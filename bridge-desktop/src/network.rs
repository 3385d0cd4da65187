//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Desktop network monitor.
///
/// Reachability is probed with a TCP connect to a well-known endpoint. The
/// desktop cannot tell WiFi from Ethernet without OS-specific APIs, so a
/// successful probe reports [`NetworkType::Other`].
#[derive(Clone)]
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    poll_interval: Duration,
    cached_info: Arc<Mutex<Option<NetworkInfo>>>,
}

impl DesktopNetworkMonitor {
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cached_info: Arc::new(Mutex::new(None)),
        }
    }

    /// Probe a different `host:port` (e.g. the media CDN).
    pub fn with_probe_addr(mut self, addr: impl Into<String>) -> Self {
        self.probe_addr = addr.into();
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Cadence of the change stream's polling loop.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Last probed state, if any probe has completed.
    pub async fn last_known(&self) -> Option<NetworkInfo> {
        self.cached_info.lock().await.clone()
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;
        let info = match status {
            NetworkStatus::Connected => NetworkInfo::connected(NetworkType::Other),
            _ => NetworkInfo::disconnected(),
        };

        *self.cached_info.lock().await = Some(info.clone());
        debug!(status = ?status, probe = %self.probe_addr, "Network info updated");

        Ok(info)
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        let last_status = self.last_known().await.map(|info| info.status);
        Ok(Box::new(DesktopNetworkChangeStream {
            monitor: self.clone(),
            last_status,
        }))
    }
}

/// Polls the probe and yields only status transitions.
struct DesktopNetworkChangeStream {
    monitor: DesktopNetworkMonitor,
    last_status: Option<NetworkStatus>,
}

#[async_trait]
impl NetworkChangeStream for DesktopNetworkChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            tokio::time::sleep(self.monitor.poll_interval).await;

            if let Ok(info) = self.monitor.get_network_info().await {
                if self.last_status != Some(info.status) {
                    self.last_status = Some(info.status);
                    return Some(info);
                }
            }
        }
    }
}
