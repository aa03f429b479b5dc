//! Domain entities
//!
//! - Newtypes for identifiers and checksums
//! - Photo records (server) and ledger entries (client)
//! - Sync state and per-item outcomes
//! - Listing query and pagination
//! - The shared error taxonomy

pub mod errors;
pub mod ledger;
pub mod newtypes;
pub mod photo;
pub mod query;
pub mod sync_state;

pub use errors::{PhotoError, PhotoResult};
pub use ledger::UploadLedgerEntry;
pub use newtypes::*;
pub use photo::{ExifData, HealthStatus, Photo, PhotoRecord};
pub use query::{ListParams, ListQuery, Paginated, Pagination, SortField, SortOrder};
pub use sync_state::{SyncState, SyncStatus, UploadOutcome};
