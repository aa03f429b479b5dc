//! Bounded background sync
//!
//! A [`BackgroundSyncJob`] runs the regular pass over at most `limit` items
//! under a cancellation token, the way an OS background-refresh slot would:
//! when the slot expires the token fires, the in-flight item is dropped and
//! whatever was already recorded in the ledger stays recorded.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::{SyncEngine, SyncSummary};

/// One bounded, cancellable sync pass
pub struct BackgroundSyncJob {
    engine: Arc<SyncEngine>,
    limit: usize,
    cancel: CancellationToken,
}

impl BackgroundSyncJob {
    pub fn new(engine: Arc<SyncEngine>, limit: usize) -> Self {
        Self {
            engine,
            limit,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned token instead of a private one
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the job when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn run(&self) -> SyncSummary {
        info!(limit = self.limit, "Background sync starting");
        let summary = self.engine.run_background(self.limit, &self.cancel).await;
        info!(
            uploaded = summary.uploaded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Background sync finished"
        );
        summary
    }

    /// Runs with a time budget; the token fires when the budget runs out
    pub async fn run_with_budget(&self, budget: Duration) -> SyncSummary {
        let token = self.cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            warn!(budget_secs = budget.as_secs(), "Background budget expired, cancelling");
            token.cancel();
        });

        let summary = self.run().await;
        timer.abort();
        summary
    }
}
