//! PhotoVault Core - Domain types, ports and configuration
//!
//! This crate is the hexagonal core shared by the backup client and the
//! storage server:
//! - **Domain types** - `PhotoRecord`, `Photo`, `UploadLedgerEntry`, `SyncState`, `ListQuery`
//! - **Error taxonomy** - [`PhotoError`](domain::errors::PhotoError), mapped once at each boundary
//! - **Port definitions** - `IMetadataStore`, `IImageAnalyzer`, `IPhotoLibrary`,
//!   `IPhotoApi`, `IChangeNotifier`, `INetworkMonitor`
//! - **Checksum** - the SHA-256 content identity used for dedup on both sides
//!
//! # Architecture
//!
//! Adapter crates (`photovault-store`, `photovault-client`, `photovault-sync`,
//! `photovault-server`) implement the ports. Engines depend only on the
//! traits so backends can be swapped without touching orchestration code.

pub mod checksum;
pub mod config;
pub mod domain;
pub mod ports;
