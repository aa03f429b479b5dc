//! PhotoVault Sync - Client-side backup engine
//!
//! Provides:
//! - A durable upload ledger so each local asset is uploaded at most once
//! - A single-pass sync engine with pause/resume and observable state
//! - A bounded, cancellable background variant
//! - Folder-backed photo library and change notifier adapters
//!
//! ## Modules
//!
//! - [`ledger`] - JSON-backed record of what has been backed up
//! - [`engine`] - Diff-and-upload passes over the local library
//! - [`background`] - Bounded passes under an external cancellation token
//! - [`dispatcher`] - Serializes library change notifications into the engine
//! - [`library`] - Directory tree presented as a photo library
//! - [`watcher`] - `notify`-based change notifier for that tree

pub mod background;
pub mod dispatcher;
pub mod engine;
pub mod ledger;
pub mod library;
pub mod watcher;

use std::path::PathBuf;

use thiserror::Error;

use photovault_core::domain::PhotoError;

pub use background::BackgroundSyncJob;
pub use dispatcher::ChangeDispatcher;
pub use engine::{RecentOutcomes, SyncEngine, SyncEngineConfig, SyncSummary};
pub use ledger::UploadLedger;
pub use library::FolderPhotoLibrary;
pub use watcher::FolderChangeNotifier;

/// Errors that can occur inside the sync adapters
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The ledger file exists but cannot be parsed
    #[error("Ledger at {path} is corrupt: {reason}")]
    LedgerCorrupt {
        /// Location of the ledger file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Encoding the ledger failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The OS file watcher could not be set up
    #[error("Watch error: {0}")]
    Watch(String),

    /// A domain-level error propagated from a port
    #[error(transparent)]
    Photo(#[from] PhotoError),
}

impl From<SyncError> for PhotoError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Photo(inner) => inner,
            SyncError::IoError(io) => PhotoError::from(io),
            other => PhotoError::Storage(other.to_string()),
        }
    }
}
