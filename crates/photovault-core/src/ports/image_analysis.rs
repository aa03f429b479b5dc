//! Image analysis port (driven/secondary port)
//!
//! Supplies dimensions, capture metadata and thumbnail bytes from raw file
//! bytes. Codec internals stay behind this trait.

use chrono::{DateTime, Utc};

use crate::domain::{errors::PhotoResult, photo::ExifData};

/// What could be learned about an image without storing it
///
/// Every field is optional: an image the decoder cannot read still has a
/// valid (empty) analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAnalysis {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// EXIF `DateTimeOriginal`
    pub taken_at: Option<DateTime<Utc>>,
    pub exif: Option<ExifData>,
}

/// Port trait for image inspection and thumbnail rendering
#[async_trait::async_trait]
pub trait IImageAnalyzer: Send + Sync {
    /// Extracts dimensions and EXIF data
    async fn analyze(&self, data: &[u8]) -> PhotoResult<ImageAnalysis>;

    /// Renders a JPEG thumbnail whose longest edge is at most `max_size`
    ///
    /// # Errors
    ///
    /// [`PhotoError::ImageProcessing`](crate::domain::PhotoError::ImageProcessing)
    /// if the image cannot be decoded or encoded.
    async fn thumbnail(&self, data: &[u8], max_size: u32) -> PhotoResult<Vec<u8>>;
}
