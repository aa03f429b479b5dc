//! Photo API port (driven/secondary port)
//!
//! The slice of the server API the sync engine needs. The reqwest-based
//! implementation lives in `photovault-client`.

use crate::domain::{
    errors::PhotoResult,
    photo::{HealthStatus, Photo},
};

/// Port trait for uploading to the backup server
#[async_trait::async_trait]
pub trait IPhotoApi: Send + Sync {
    /// Uploads one file and returns the canonical record
    ///
    /// # Errors
    ///
    /// [`PhotoError::Duplicate`](crate::domain::PhotoError::Duplicate) when
    /// the server already holds this content.
    async fn upload(&self, filename: &str, mime_type: &str, data: Vec<u8>) -> PhotoResult<Photo>;

    /// Queries server liveness
    async fn health(&self) -> PhotoResult<HealthStatus>;
}
