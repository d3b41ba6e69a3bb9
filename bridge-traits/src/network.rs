//! Network Monitoring Abstraction
//!
//! Provides network connectivity status.

use async_trait::async_trait;

use crate::error::Result;

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
}

/// Network monitor trait
///
/// Used before starting an authorization flow: when the device is offline
/// the user is offered a retry instead of being sent to a page that cannot
/// load.
///
/// # Platform Support
///
/// - **Desktop**: connectivity probe
/// - **iOS**: Network framework, Reachability
/// - **Android**: ConnectivityManager
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    async fn is_connected(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    struct FixedMonitor(NetworkStatus);

    #[async_trait]
    impl NetworkMonitor for FixedMonitor {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            Ok(NetworkInfo { status: self.0 })
        }
    }

    struct BrokenMonitor;

    #[async_trait]
    impl NetworkMonitor for BrokenMonitor {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            Err(BridgeError::NotAvailable("no reachability API".to_string()))
        }
    }

    #[tokio::test]
    async fn test_is_connected_follows_status() {
        assert!(FixedMonitor(NetworkStatus::Connected).is_connected().await);
        assert!(!FixedMonitor(NetworkStatus::Disconnected).is_connected().await);
        assert!(!FixedMonitor(NetworkStatus::Indeterminate).is_connected().await);
    }

    #[tokio::test]
    async fn test_monitor_failure_counts_as_offline() {
        assert!(!BrokenMonitor.is_connected().await);
    }
}
