//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the engines depend on. Implementations live in
//! adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IMetadataStore`] - Server-side photo metadata persistence
//! - [`IImageAnalyzer`] - Dimensions, EXIF and thumbnails from raw bytes
//! - [`IPhotoLibrary`] - Client-side local photo library
//! - [`IPhotoApi`] - Upload surface of the backup server
//! - [`IChangeNotifier`] - New-asset notifications from the library
//! - [`INetworkMonitor`] - Connectivity checks before a sync pass

pub mod change_notifier;
pub mod image_analysis;
pub mod metadata_store;
pub mod network;
pub mod photo_api;
pub mod photo_library;

pub use change_notifier::{ChangeSink, IChangeNotifier, LibraryChange};
pub use image_analysis::{IImageAnalyzer, ImageAnalysis};
pub use metadata_store::IMetadataStore;
pub use network::{FixedNetworkMonitor, INetworkMonitor, NetworkStatus};
pub use photo_api::IPhotoApi;
pub use photo_library::{ExportedAsset, IPhotoLibrary, LocalAsset};
