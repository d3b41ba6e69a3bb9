//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus},
};
use std::time::Duration;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "www.dropbox.com:443";

/// Desktop network monitor implementation
///
/// Reachability is inferred from a TCP connect probe against the web
/// authorization host. Platform APIs (netlink, SystemConfiguration, WinAPI)
/// would be more precise but need extra dependencies.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_ADDR, Duration::from_secs(5))
    }

    /// Create a monitor probing `addr` (`host:port`) with the given timeout
    pub fn with_probe(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            probe_addr: addr.into(),
            probe_timeout: timeout,
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) => NetworkStatus::Disconnected,
            // Timed out: something may be filtering the probe
            Err(_) => NetworkStatus::Indeterminate,
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
        debug!(status = ?status, probe = %self.probe_addr, "Network probe finished");
        Ok(NetworkInfo { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_probe_is_not_connected() {
        // Port 9 on localhost is closed on any sane test host
        let monitor = DesktopNetworkMonitor::with_probe("127.0.0.1:9", Duration::from_secs(1));
        let info = monitor.get_network_info().await.unwrap();

        assert_ne!(info.status, NetworkStatus::Connected);
        assert!(!monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_local_listener_is_connected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let monitor = DesktopNetworkMonitor::with_probe(addr.to_string(), Duration::from_secs(1));
        let info = monitor.get_network_info().await.unwrap();

        assert_eq!(info.status, NetworkStatus::Connected);
        assert!(monitor.is_connected().await);
    }
}
