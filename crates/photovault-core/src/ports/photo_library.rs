//! Photo library port (driven/secondary port)
//!
//! Access to the device's local photo library: enumerate assets and export
//! their bytes. Implementations decide what an asset id means.

use chrono::{DateTime, Utc};

use crate::domain::{errors::PhotoResult, newtypes::LocalAssetId};

/// An asset as listed by the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub id: LocalAssetId,
    /// Filename to report to the server
    pub filename: String,
    /// Creation time as known to the library
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw bytes exported for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedAsset {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Port trait for the local photo library
#[async_trait::async_trait]
pub trait IPhotoLibrary: Send + Sync {
    /// Lists every photo asset, newest first, in a stable order
    ///
    /// # Errors
    ///
    /// [`PhotoError::AccessDenied`](crate::domain::PhotoError::AccessDenied)
    /// when the library cannot be read at all.
    async fn enumerate(&self) -> PhotoResult<Vec<LocalAsset>>;

    /// Resolves specific ids (e.g. ones reported by a change notifier)
    ///
    /// Ids that no longer exist are omitted.
    async fn resolve(&self, ids: &[LocalAssetId]) -> PhotoResult<Vec<LocalAsset>>;

    /// Exports the raw bytes and MIME type of an asset
    async fn export(&self, asset: &LocalAsset) -> PhotoResult<ExportedAsset>;
}
