//! Photo records and MIME handling
//!
//! [`PhotoRecord`] is the server-authoritative metadata row. [`Photo`] is the
//! projection returned over HTTP; it never exposes storage paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Checksum, PhotoId};

/// MIME types accepted for upload
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/heic",
    "image/heif",
    "image/webp",
];

/// Returns true if `mime_type` may be uploaded
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

/// Picks the stored file extension for an upload
///
/// The filename's extension wins when present; otherwise it is derived from
/// the MIME type, defaulting to `jpg`.
pub fn extension_for(filename: &str, mime_type: &str) -> String {
    let from_name = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = from_name {
        return ext;
    }

    match mime_type.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/webp" => "webp",
        _ => "jpg",
    }
    .to_string()
}

/// Guesses a MIME type from a file extension (used by the folder library)
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// EXIF details recovered from an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifData {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_model: Option<String>,
    /// Focal length in millimetres
    pub focal_length: Option<f64>,
    /// F-number
    pub aperture: Option<f64>,
    /// Exposure time as displayed, e.g. `1/125`
    pub shutter_speed: Option<String>,
    pub iso: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub date_time_original: Option<DateTime<Utc>>,
}

impl ExifData {
    /// Returns true when no field was recovered
    pub fn is_empty(&self) -> bool {
        *self == ExifData::default()
    }
}

/// Server-side metadata for one stored photo
///
/// Immutable after creation except for deletion. `checksum` is unique
/// across all records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: PhotoId,
    pub original_filename: String,
    pub mime_type: String,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Server ingestion time
    pub created_at: DateTime<Utc>,
    /// Capture time from EXIF
    pub taken_at: Option<DateTime<Utc>>,
    pub checksum: Checksum,
    /// Path of the original, relative to the originals directory
    pub storage_path: String,
    /// Path of the thumbnail, relative to the thumbnails directory
    pub thumbnail_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
}

/// Public view of a photo as returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub checksum: Checksum,
}

impl From<&PhotoRecord> for Photo {
    fn from(record: &PhotoRecord) -> Self {
        Self {
            id: record.id,
            filename: record.original_filename.clone(),
            mime_type: record.mime_type.clone(),
            size: record.size,
            width: record.width,
            height: record.height,
            created_at: record.created_at,
            taken_at: record.taken_at,
            checksum: record.checksum.clone(),
        }
    }
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        Photo::from(&record)
    }
}

/// Liveness report from `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// `healthy` or `degraded`
    pub status: String,
    pub version: String,
    pub storage_available: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::compute_checksum;

    fn sample_record() -> PhotoRecord {
        PhotoRecord {
            id: PhotoId::new(),
            original_filename: "IMG_0001.JPG".to_string(),
            mime_type: "image/jpeg".to_string(),
            size: 2048,
            width: Some(4032),
            height: Some(3024),
            created_at: Utc::now(),
            taken_at: None,
            checksum: compute_checksum(b"sample"),
            storage_path: "2025/01/x.jpg".to_string(),
            thumbnail_path: Some("x.jpg".to_string()),
            exif: None,
        }
    }

    #[test]
    fn test_allowed_mime_types() {
        assert!(is_allowed_mime_type("image/jpeg"));
        assert!(is_allowed_mime_type("IMAGE/PNG"));
        assert!(is_allowed_mime_type("image/heic"));
        assert!(is_allowed_mime_type("image/heif"));
        assert!(is_allowed_mime_type("image/webp; q=1"));
        assert!(!is_allowed_mime_type("image/gif"));
        assert!(!is_allowed_mime_type("application/pdf"));
        assert!(!is_allowed_mime_type(""));
    }

    #[test]
    fn test_extension_prefers_filename() {
        assert_eq!(extension_for("IMG_0001.JPEG", "image/png"), "jpeg");
        assert_eq!(extension_for("shot.heic", "image/heic"), "heic");
    }

    #[test]
    fn test_extension_falls_back_to_mime() {
        assert_eq!(extension_for("noext", "image/png"), "png");
        assert_eq!(extension_for("noext", "image/webp"), "webp");
        assert_eq!(extension_for("noext", "image/heif"), "heif");
        assert_eq!(extension_for("noext", "image/jpeg"), "jpg");
        assert_eq!(extension_for("noext", "application/unknown"), "jpg");
    }

    #[test]
    fn test_photo_projection_hides_paths() {
        let record = sample_record();
        let photo = Photo::from(&record);
        assert_eq!(photo.filename, "IMG_0001.JPG");

        let json = serde_json::to_value(&photo).unwrap();
        assert!(json.get("storagePath").is_none());
        assert!(json.get("mimeType").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originalFilename"], "IMG_0001.JPG");
        assert_eq!(json["storagePath"], "2025/01/x.jpg");
        assert!(json.get("exif").is_none());

        let back: PhotoRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
