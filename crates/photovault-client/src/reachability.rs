//! Server reachability probe
//!
//! [`ReachabilityMonitor`] answers the engine's network precondition by
//! calling `/health`. There is no portable way to ask the OS whether the
//! link is metered, so that part comes from configuration.

use std::sync::Arc;

use tracing::debug;

use photovault_core::ports::{INetworkMonitor, IPhotoApi, NetworkStatus};

/// Network monitor that probes the server's health endpoint
pub struct ReachabilityMonitor {
    api: Arc<dyn IPhotoApi>,
    metered: bool,
}

impl ReachabilityMonitor {
    pub fn new(api: Arc<dyn IPhotoApi>, metered: bool) -> Self {
        Self { api, metered }
    }
}

#[async_trait::async_trait]
impl INetworkMonitor for ReachabilityMonitor {
    async fn status(&self) -> NetworkStatus {
        match self.api.health().await {
            Ok(health) => {
                debug!(status = %health.status, "Server reachable");
                if self.metered {
                    NetworkStatus::Metered
                } else {
                    NetworkStatus::Unmetered
                }
            }
            Err(e) => {
                debug!(error = %e, "Server unreachable");
                NetworkStatus::Unavailable
            }
        }
    }
}
