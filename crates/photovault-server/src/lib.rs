//! PhotoVault Server - photo ingestion engine and HTTP API
//!
//! - [`storage::PhotoStorageEngine`] validates, deduplicates and stores
//!   originals, renders thumbnails and keeps files and metadata consistent
//! - [`imaging::ImageAnalyzer`] extracts dimensions and EXIF and renders
//!   JPEG thumbnails
//! - [`api`] exposes the engine over axum under `/api/v1`
//!
//! The `photovaultd` binary wires these together with one of the
//! `photovault-store` metadata backends.

pub mod api;
pub mod imaging;
pub mod storage;

pub use api::{create_router, AppState};
pub use imaging::ImageAnalyzer;
pub use storage::{PhotoStorageEngine, ReconcileReport};
