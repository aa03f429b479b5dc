//! ReachabilityMonitor against a live and a dead server

use std::sync::Arc;

use photovault_client::{PhotoApiClient, ReachabilityMonitor};
use photovault_core::ports::{INetworkMonitor, NetworkStatus};

use crate::common::{mount_health, setup};

#[tokio::test]
async fn test_healthy_server_is_unmetered_by_default() {
    let (server, client) = setup().await;
    mount_health(&server, "healthy").await;

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert!(health.storage_available);

    let monitor = ReachabilityMonitor::new(Arc::new(client), false);
    assert_eq!(monitor.status().await, NetworkStatus::Unmetered);
}

#[tokio::test]
async fn test_degraded_server_is_still_reachable_and_metered_flag_applies() {
    let (server, client) = setup().await;
    mount_health(&server, "degraded").await;

    let monitor = ReachabilityMonitor::new(Arc::new(client), true);
    assert_eq!(monitor.status().await, NetworkStatus::Metered);
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let client = PhotoApiClient::new("http://127.0.0.1:1").unwrap();
    let monitor = ReachabilityMonitor::new(Arc::new(client), false);
    assert_eq!(monitor.status().await, NetworkStatus::Unavailable);
}
