//! Network monitor port (driven/secondary port)

use serde::{Deserialize, Serialize};

/// Reachability of the backup server and the kind of link in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    /// The server cannot be reached
    Unavailable,
    /// Reachable over a metered link (cellular, tethering)
    Metered,
    /// Reachable over an unmetered link (Wi-Fi, ethernet)
    Unmetered,
}

/// Port trait for checking connectivity before a pass
#[async_trait::async_trait]
pub trait INetworkMonitor: Send + Sync {
    async fn status(&self) -> NetworkStatus;
}

/// Monitor that always reports the same status
///
/// Used when no probing is wanted, and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedNetworkMonitor(pub NetworkStatus);

#[async_trait::async_trait]
impl INetworkMonitor for FixedNetworkMonitor {
    async fn status(&self) -> NetworkStatus {
        self.0
    }
}
