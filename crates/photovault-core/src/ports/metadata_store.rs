//! Metadata store port (driven/secondary port)
//!
//! Durable CRUD over [`PhotoRecord`]s. The storage engine depends only on
//! this trait; the JSON and SQLite backends live in `photovault-store`.
//!
//! ## Contract
//!
//! - `save` is an upsert keyed by `id`.
//! - `save` must enforce checksum uniqueness at the storage layer and report
//!   a violation as [`PhotoError::Duplicate`] carrying the id of the record
//!   that already holds the checksum. Two concurrent ingests of identical
//!   content race on this check and only one may win.
//! - `load_all` returns records in insertion order. Listing relies on this
//!   order to break sort ties.

use crate::domain::{
    errors::{PhotoError, PhotoResult},
    newtypes::{Checksum, PhotoId},
    photo::PhotoRecord,
};

/// Port trait for photo metadata persistence
#[async_trait::async_trait]
pub trait IMetadataStore: Send + Sync {
    /// Returns every record in insertion order
    async fn load_all(&self) -> PhotoResult<Vec<PhotoRecord>>;

    /// Looks up one record
    async fn get(&self, id: &PhotoId) -> PhotoResult<Option<PhotoRecord>>;

    /// Inserts or replaces a record
    ///
    /// # Errors
    ///
    /// [`PhotoError::Duplicate`] when another record already has the checksum.
    async fn save(&self, record: &PhotoRecord) -> PhotoResult<()>;

    /// Removes a record, returning whether it existed
    async fn delete(&self, id: &PhotoId) -> PhotoResult<bool>;

    /// Finds the record holding `checksum`, if any
    ///
    /// The default scans [`load_all`](IMetadataStore::load_all); backends
    /// with an index should override it.
    async fn find_by_checksum(&self, checksum: &Checksum) -> PhotoResult<Option<PhotoRecord>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|r| &r.checksum == checksum))
    }

    /// Number of stored records
    async fn count(&self) -> PhotoResult<u64> {
        Ok(self.load_all().await?.len() as u64)
    }
}

/// Builds the duplicate error a backend returns on a checksum collision
pub fn checksum_conflict(existing: &PhotoRecord) -> PhotoError {
    PhotoError::duplicate(existing.id)
}
