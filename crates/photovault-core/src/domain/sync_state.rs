//! Client sync state and per-item outcomes
//!
//! [`SyncState`] is ephemeral: it lives in memory, is mutated only by the
//! sync engine, and is recomputed from the ledger and library on restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::LocalAssetId;
use super::photo::Photo;

/// Status of the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No pass in flight
    Idle,
    /// A pass is uploading
    Syncing,
    /// The user paused; only resume leaves this state
    Paused,
    /// The server is unreachable
    WaitingForNetwork,
    /// Uploads are restricted to unmetered links and the link is metered
    WaitingForWifi,
    /// Enumeration-level failure
    Error(String),
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SyncStatus::Paused)
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Idle
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Paused => write!(f, "paused"),
            SyncStatus::WaitingForNetwork => write!(f, "waiting for network"),
            SyncStatus::WaitingForWifi => write!(f, "waiting for wifi"),
            SyncStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Observable progress of the current (or last) pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SyncStatus,
    pub pending_count: usize,
    /// Items that ended backed up (success or skipped)
    pub uploaded_count: usize,
    /// Subset of `uploaded_count` that ended as a duplicate skip
    pub skipped_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    pub current_item_id: Option<LocalAssetId>,
    pub auto_sync_enabled: bool,
}

impl SyncState {
    /// Resets counters for a new pass and enters `Syncing`
    pub fn begin_pass(&mut self) {
        self.status = SyncStatus::Syncing;
        self.pending_count = 0;
        self.uploaded_count = 0;
        self.skipped_count = 0;
        self.failed_count = 0;
        self.total_count = 0;
        self.current_item_id = None;
    }

    /// Fraction of the pass that has been processed, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.uploaded_count + self.failed_count) as f64 / self.total_count as f64
    }
}

/// Classified result of processing one item
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Stored on the server
    Success {
        asset_id: LocalAssetId,
        photo: Photo,
        at: DateTime<Utc>,
    },
    /// Already backed up (known checksum or server duplicate)
    Skipped {
        asset_id: LocalAssetId,
        at: DateTime<Utc>,
    },
    /// Failed; the batch continued
    Failed {
        asset_id: LocalAssetId,
        error: String,
        at: DateTime<Utc>,
    },
}

impl UploadOutcome {
    pub fn asset_id(&self) -> &LocalAssetId {
        match self {
            UploadOutcome::Success { asset_id, .. }
            | UploadOutcome::Skipped { asset_id, .. }
            | UploadOutcome::Failed { asset_id, .. } => asset_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UploadOutcome::Failed { .. })
    }

    /// Short label used by the CLI
    pub fn label(&self) -> &'static str {
        match self {
            UploadOutcome::Success { .. } => "uploaded",
            UploadOutcome::Skipped { .. } => "skipped",
            UploadOutcome::Failed { .. } => "failed",
        }
    }
}
