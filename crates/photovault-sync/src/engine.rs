//! Backup sync engine
//!
//! The [`SyncEngine`] diffs the local photo library against the upload
//! ledger and uploads what is missing, one item at a time.
//!
//! ## Pass Flow
//!
//! 1. **Gate**: check the network; stop in `waiting_for_network` or
//!    `waiting_for_wifi` without uploading anything
//! 2. **Diff**: enumerate the library (or resolve notifier ids) and drop
//!    every asset the ledger already knows
//! 3. **Upload**: for each remaining asset export, checksum, skip if the
//!    checksum is known, otherwise upload and record the result
//!
//! Per-item failures are counted and the batch continues. Only an
//! enumeration failure moves the engine to `error`.
//!
//! ## Concurrency
//!
//! At most one pass runs at a time. Manual triggers while a pass is in
//! flight are no-ops; resume and library changes wait their turn.
//!
//! ## Retry Logic
//!
//! Transient upload errors (network loss, 5xx, 429) are retried with
//! exponential backoff starting at the configured base delay.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use photovault_core::checksum::compute_checksum;
use photovault_core::config::Config;
use photovault_core::domain::{
    newtypes::LocalAssetId, Photo, PhotoResult, SyncState, SyncStatus, UploadOutcome,
};
use photovault_core::ports::{
    ExportedAsset, INetworkMonitor, IPhotoApi, IPhotoLibrary, LibraryChange, LocalAsset,
    NetworkStatus,
};

use crate::ledger::UploadLedger;

// ============================================================================
// T201: Engine configuration
// ============================================================================

/// Tuning knobs for the sync engine
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Refuse to upload over metered links
    pub wifi_only: bool,
    /// React to library change notifications
    pub auto_sync: bool,
    /// Attempts per upload, including the first
    pub upload_retries: u32,
    /// First backoff delay; doubles on every retry
    pub retry_base_delay: Duration,
    /// Size of the recent outcomes ring buffer
    pub recent_outcomes_capacity: usize,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            wifi_only: false,
            auto_sync: true,
            upload_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            recent_outcomes_capacity: 50,
        }
    }
}

impl SyncEngineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wifi_only: config.client.wifi_only,
            auto_sync: config.client.auto_sync,
            upload_retries: config.sync.upload_retries,
            recent_outcomes_capacity: config.sync.recent_outcomes_capacity,
            ..Self::default()
        }
    }
}

// ============================================================================
// T202: SyncSummary
// ============================================================================

/// Summary of one completed (or interrupted) pass
///
/// `uploaded` counts every item that ended backed up, duplicates included;
/// `skipped` is the duplicate subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Size of the upload set after the ledger diff (and any cap)
    pub total: usize,
    /// True if a cancellation token stopped the pass early
    pub cancelled: bool,
    /// One message per failed item, plus any enumeration error
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl SyncSummary {
    fn finish(mut self, started: Instant) -> Self {
        self.duration_ms = started.elapsed().as_millis() as u64;
        self
    }
}

// ============================================================================
// T203: Recent outcomes ring buffer
// ============================================================================

/// Fixed-capacity list of the latest outcomes, newest first
#[derive(Debug, Clone)]
pub struct RecentOutcomes {
    capacity: usize,
    items: VecDeque<UploadOutcome>,
}

impl RecentOutcomes {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Adds an outcome, evicting the oldest when full
    pub fn push(&mut self, outcome: UploadOutcome) {
        self.items.push_front(outcome);
        self.items.truncate(self.capacity);
    }

    pub fn snapshot(&self) -> Vec<UploadOutcome> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// ============================================================================
// T204: Retry logic
// ============================================================================

/// Runs `f` up to `attempts` times while it fails with a transient error
///
/// Backoff schedule: `base`, `2 * base`, `4 * base`, ...
pub(crate) async fn with_retry<F, Fut, T>(
    operation: &str,
    attempts: u32,
    base_delay: Duration,
    f: F,
) -> PhotoResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = PhotoResult<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < attempts && err.is_transient() => {
                let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt - 1));
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// T205: SyncEngine
// ============================================================================

/// Which assets a pass considers
enum PassScope {
    /// Every asset in the library
    Full,
    /// Only these ids, as reported by a change notifier
    Added(Vec<LocalAssetId>),
}

impl PassScope {
    fn label(&self) -> &'static str {
        match self {
            PassScope::Full => "full",
            PassScope::Added(_) => "added",
        }
    }
}

/// Client-side backup engine
///
/// Shared behind an `Arc`; every method takes `&self`.
pub struct SyncEngine {
    library: Arc<dyn IPhotoLibrary>,
    api: Arc<dyn IPhotoApi>,
    network: Arc<dyn INetworkMonitor>,
    ledger: Arc<UploadLedger>,
    config: SyncEngineConfig,
    state: watch::Sender<SyncState>,
    /// Held for the whole duration of a pass
    pass_guard: Mutex<()>,
    paused: AtomicBool,
    /// Bumped by every pause; a pass stops once it differs from its start value
    pause_epoch: AtomicU64,
    recent: Mutex<RecentOutcomes>,
}

impl SyncEngine {
    pub fn new(
        library: Arc<dyn IPhotoLibrary>,
        api: Arc<dyn IPhotoApi>,
        network: Arc<dyn INetworkMonitor>,
        ledger: Arc<UploadLedger>,
        config: SyncEngineConfig,
    ) -> Self {
        let (state, _) = watch::channel(SyncState {
            auto_sync_enabled: config.auto_sync,
            ..SyncState::default()
        });

        Self {
            library,
            api,
            network,
            ledger,
            recent: Mutex::new(RecentOutcomes::new(config.recent_outcomes_capacity)),
            config,
            state,
            pass_guard: Mutex::new(()),
            paused: AtomicBool::new(false),
            pause_epoch: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Current state snapshot
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Latest outcomes, newest first
    pub async fn recent_outcomes(&self) -> Vec<UploadOutcome> {
        self.recent.lock().await.snapshot()
    }

    pub fn ledger(&self) -> &Arc<UploadLedger> {
        &self.ledger
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Assets not yet recorded in the ledger
    pub async fn pending(&self) -> PhotoResult<Vec<LocalAsset>> {
        let assets = self.library.enumerate().await?;
        let done = self.ledger.uploaded_ids().await;
        Ok(assets.into_iter().filter(|a| !done.contains(&a.id)).collect())
    }

    // ------------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------------

    /// Runs a full pass unless one is already in flight or the engine is paused
    ///
    /// Returns `None` when the trigger was ignored.
    pub async fn trigger(&self) -> Option<SyncSummary> {
        if self.is_paused() {
            info!("Sync is paused, ignoring trigger");
            return None;
        }
        let Ok(_guard) = self.pass_guard.try_lock() else {
            debug!("Sync pass already in flight, ignoring trigger");
            return None;
        };
        Some(
            self.run_pass(PassScope::Full, None, &CancellationToken::new())
                .await,
        )
    }

    /// Suppresses the start of the next item; the in-flight item completes
    pub fn pause(&self) {
        self.pause_epoch.fetch_add(1, Ordering::AcqRel);
        self.paused.store(true, Ordering::Release);
        self.state.send_modify(|s| s.status = SyncStatus::Paused);
        info!("Sync paused");
    }

    /// Leaves `paused`, waits for the paused pass to wind down, then runs a
    /// full pass
    ///
    /// Returns `None` if the engine was not paused.
    pub async fn resume(&self) -> Option<SyncSummary> {
        if !self.paused.swap(false, Ordering::AcqRel) {
            return None;
        }
        // The paused pass still stops at its next item boundary
        self.state.send_modify(|s| s.status = SyncStatus::Syncing);
        info!("Sync resumed");

        let _guard = self.pass_guard.lock().await;
        Some(
            self.run_pass(PassScope::Full, None, &CancellationToken::new())
                .await,
        )
    }

    pub fn set_auto_sync(&self, enabled: bool) {
        self.state.send_modify(|s| s.auto_sync_enabled = enabled);
        info!(enabled, "Auto sync toggled");
    }

    pub fn is_auto_sync_enabled(&self) -> bool {
        self.state.borrow().auto_sync_enabled
    }

    /// Uploads newly added assets reported by a change notifier
    ///
    /// Ignored while auto sync is off or the engine is paused. Waits for any
    /// pass in flight instead of running concurrently.
    pub async fn handle_library_change(&self, change: LibraryChange) -> Option<SyncSummary> {
        if !self.is_auto_sync_enabled() {
            debug!(added = change.added.len(), "Auto sync disabled, ignoring change");
            return None;
        }

        let mut seen = HashSet::new();
        let ids: Vec<LocalAssetId> = change
            .added
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if ids.is_empty() {
            return None;
        }

        let _guard = self.pass_guard.lock().await;
        if self.is_paused() {
            debug!(added = ids.len(), "Sync is paused, ignoring change");
            return None;
        }
        Some(
            self.run_pass(PassScope::Added(ids), None, &CancellationToken::new())
                .await,
        )
    }

    /// Runs a pass over at most `limit` items, observing `cancel`
    ///
    /// Items already recorded stay recorded when the pass is cancelled.
    pub async fn run_background(&self, limit: usize, cancel: &CancellationToken) -> SyncSummary {
        let started = Instant::now();
        let _guard = tokio::select! {
            guard = self.pass_guard.lock() => guard,
            _ = cancel.cancelled() => {
                return SyncSummary { cancelled: true, ..SyncSummary::default() }.finish(started);
            }
        };

        if self.is_paused() {
            info!("Sync is paused, skipping background pass");
            return SyncSummary::default().finish(started);
        }
        self.run_pass(PassScope::Full, Some(limit), cancel).await
    }

    /// Forgets the ledger and the recent outcomes
    pub async fn clear_history(&self) -> PhotoResult<()> {
        self.ledger.clear().await?;
        self.recent.lock().await.clear();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pass internals
    // ------------------------------------------------------------------------

    /// Must be called with `pass_guard` held
    #[tracing::instrument(skip_all, fields(scope = scope.label(), limit = ?limit))]
    async fn run_pass(
        &self,
        scope: PassScope,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> SyncSummary {
        let started = Instant::now();
        let epoch = self.pause_epoch.load(Ordering::Acquire);
        let mut summary = SyncSummary::default();

        if let Some(waiting) = self.network_gate().await {
            info!(status = %waiting, "Network precondition not met, not uploading");
            self.state.send_modify(|s| {
                s.status = waiting;
                s.current_item_id = None;
            });
            return summary.finish(started);
        }

        self.state.send_modify(SyncState::begin_pass);

        let upload_set = tokio::select! {
            result = self.collect_upload_set(&scope) => result,
            _ = cancel.cancelled() => {
                summary.cancelled = true;
                self.finish_pass(epoch);
                return summary.finish(started);
            }
        };

        let mut assets = match upload_set {
            Ok(assets) => assets,
            Err(e) => {
                error!(error = %e, code = e.code(), "Library enumeration failed");
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.status = SyncStatus::Error(message.clone());
                    s.current_item_id = None;
                });
                summary.errors.push(message);
                return summary.finish(started);
            }
        };

        if let Some(limit) = limit {
            assets.truncate(limit);
        }
        summary.total = assets.len();
        self.state.send_modify(|s| {
            s.total_count = summary.total;
            s.pending_count = summary.total;
        });
        info!(total = summary.total, "Upload set computed");

        for asset in assets {
            if self.pause_requested_since(epoch) {
                info!("Paused, not starting next item");
                break;
            }
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            self.state
                .send_modify(|s| s.current_item_id = Some(asset.id.clone()));

            let outcome = tokio::select! {
                outcome = self.process_item(&asset) => outcome,
                _ = cancel.cancelled() => {
                    info!(asset = %asset.id, "Cancelled mid-item, dropping it");
                    summary.cancelled = true;
                    break;
                }
            };
            self.apply_outcome(&mut summary, outcome).await;
        }

        self.finish_pass(epoch);

        let summary = summary.finish(started);
        info!(
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            failed = summary.failed,
            total = summary.total,
            cancelled = summary.cancelled,
            duration_ms = summary.duration_ms,
            "Sync pass finished"
        );
        summary
    }

    async fn network_gate(&self) -> Option<SyncStatus> {
        match self.network.status().await {
            NetworkStatus::Unavailable => Some(SyncStatus::WaitingForNetwork),
            NetworkStatus::Metered if self.config.wifi_only => Some(SyncStatus::WaitingForWifi),
            NetworkStatus::Metered | NetworkStatus::Unmetered => None,
        }
    }

    async fn collect_upload_set(&self, scope: &PassScope) -> PhotoResult<Vec<LocalAsset>> {
        let assets = match scope {
            PassScope::Full => self.library.enumerate().await?,
            PassScope::Added(ids) => self.library.resolve(ids).await?,
        };
        let done = self.ledger.uploaded_ids().await;
        Ok(assets.into_iter().filter(|a| !done.contains(&a.id)).collect())
    }

    fn pause_requested_since(&self, epoch: u64) -> bool {
        self.is_paused() || self.pause_epoch.load(Ordering::Acquire) != epoch
    }

    fn finish_pass(&self, epoch: u64) {
        let paused = self.is_paused();
        let resumed = !paused && self.pause_epoch.load(Ordering::Acquire) != epoch;
        self.state.send_modify(|s| {
            s.current_item_id = None;
            if paused {
                s.status = SyncStatus::Paused;
            } else if resumed {
                // A resume is waiting to run its own pass
                s.status = SyncStatus::Syncing;
            } else {
                s.status = SyncStatus::Idle;
                s.pending_count = 0;
            }
        });
    }

    async fn apply_outcome(&self, summary: &mut SyncSummary, outcome: UploadOutcome) {
        match &outcome {
            UploadOutcome::Success { .. } => summary.uploaded += 1,
            UploadOutcome::Skipped { .. } => {
                summary.uploaded += 1;
                summary.skipped += 1;
            }
            UploadOutcome::Failed { asset_id, error, .. } => {
                summary.failed += 1;
                summary.errors.push(format!("{asset_id}: {error}"));
            }
        }

        self.state.send_modify(|s| {
            match &outcome {
                UploadOutcome::Success { .. } => s.uploaded_count += 1,
                UploadOutcome::Skipped { .. } => {
                    s.uploaded_count += 1;
                    s.skipped_count += 1;
                }
                UploadOutcome::Failed { .. } => s.failed_count += 1,
            }
            s.pending_count = s.pending_count.saturating_sub(1);
        });

        self.recent.lock().await.push(outcome);
    }

    #[tracing::instrument(skip_all, fields(asset = %asset.id))]
    async fn process_item(&self, asset: &LocalAsset) -> UploadOutcome {
        let at = Utc::now();
        match self.upload_asset(asset).await {
            Ok(Some(photo)) => {
                debug!(photo_id = %photo.id, "Uploaded");
                UploadOutcome::Success {
                    asset_id: asset.id.clone(),
                    photo,
                    at,
                }
            }
            Ok(None) => UploadOutcome::Skipped {
                asset_id: asset.id.clone(),
                at,
            },
            Err(e) => {
                warn!(error = %e, code = e.code(), "Upload failed");
                UploadOutcome::Failed {
                    asset_id: asset.id.clone(),
                    error: e.to_string(),
                    at,
                }
            }
        }
    }

    /// Returns `Ok(None)` when the asset was classified as already backed up
    async fn upload_asset(&self, asset: &LocalAsset) -> PhotoResult<Option<Photo>> {
        let ExportedAsset {
            filename,
            mime_type,
            data,
        } = self.library.export(asset).await?;
        let checksum = compute_checksum(&data);

        if self.ledger.has_checksum(&checksum).await {
            debug!(checksum = %checksum, "Content already backed up, skipping upload");
            self.ledger.record(asset.id.clone(), None, checksum).await?;
            return Ok(None);
        }

        let result = with_retry(
            "upload",
            self.config.upload_retries,
            self.config.retry_base_delay,
            || self.api.upload(&filename, &mime_type, data.clone()),
        )
        .await;

        match result {
            Ok(photo) => {
                self.ledger
                    .record(asset.id.clone(), Some(photo.id), checksum)
                    .await?;
                Ok(Some(photo))
            }
            Err(e) if e.is_duplicate() => {
                debug!(error = %e, "Server already holds this content");
                self.ledger.record(asset.id.clone(), None, checksum).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
