//! PhotoVault Store - Photo metadata persistence
//!
//! Two interchangeable backends for the `IMetadataStore` port:
//! - [`JsonMetadataStore`] - one pretty-printed JSON array, rewritten atomically
//!   on every mutation and serialized through a single async mutex
//! - [`SqliteMetadataStore`] - relational storage with a `UNIQUE` checksum
//!   column and a cascading `exif_data` side table
//!
//! ## Architecture
//!
//! This crate is a driven (secondary) adapter in the hexagonal architecture.
//! Internally it reports [`StoreError`]; at the port boundary every error is
//! converted into `PhotoError`, with checksum collisions surfacing as
//! `PhotoError::Duplicate`.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use photovault_store::{DatabasePool, SqliteMetadataStore};
//!
//! # async fn example() -> Result<(), photovault_store::StoreError> {
//! let pool = DatabasePool::new(Path::new("/app/data/photovault.db")).await?;
//! let store = SqliteMetadataStore::new(pool.pool().clone());
//! // Use store as IMetadataStore...
//! # Ok(())
//! # }
//! ```

pub mod json;
pub mod pool;
pub mod sqlite;

pub use json::JsonMetadataStore;
pub use pool::DatabasePool;
pub use sqlite::SqliteMetadataStore;

use photovault_core::domain::PhotoError;

/// Errors that can occur inside a metadata backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Reading or writing the metadata file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

impl From<StoreError> for PhotoError {
    fn from(e: StoreError) -> Self {
        PhotoError::Storage(e.to_string())
    }
}
