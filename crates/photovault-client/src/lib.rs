//! PhotoVault Client - HTTP client for the storage server
//!
//! Provides:
//! - [`PhotoApiClient`] - typed access to every `/api/v1` endpoint, and the
//!   [`IPhotoApi`](photovault_core::ports::IPhotoApi) port used by the sync engine
//! - [`ReachabilityMonitor`] - an
//!   [`INetworkMonitor`](photovault_core::ports::INetworkMonitor) that probes `/health`
//!
//! ## Error mapping
//!
//! HTTP statuses are mapped back into
//! [`PhotoError`](photovault_core::domain::PhotoError) in one place
//! ([`error`]), mirroring the server's mapping:
//!
//! | Status | Error |
//! |---|---|
//! | 400 | `InvalidRequest` |
//! | 403 | `AccessDenied` |
//! | 404 | `NotFound` |
//! | 409 | `Duplicate` (existing id parsed from the reason) |
//! | connect / timeout | `NetworkUnavailable` |
//! | anything else | `Server { status, reason }` |

pub mod client;
pub mod error;
pub mod reachability;

pub use client::{PhotoApiClient, UploadResponse};
pub use reachability::ReachabilityMonitor;
