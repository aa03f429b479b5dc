//! Image analysis backed by the `image` and `kamadak-exif` crates
//!
//! Decoding is CPU-bound, so both operations run on the blocking pool.
//! HEIC/HEIF cannot be decoded by `image`: analysis of those files still
//! yields EXIF (when the container carries it) but no dimensions, and
//! thumbnail rendering fails.

use std::io::Cursor;

use chrono::{DateTime, NaiveDate, Utc};
use exif::{In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use tracing::debug;

use photovault_core::domain::{ExifData, PhotoError, PhotoResult};
use photovault_core::ports::{IImageAnalyzer, ImageAnalysis};

/// JPEG quality of generated thumbnails
const THUMBNAIL_QUALITY: u8 = 85;

/// [`IImageAnalyzer`] implementation using pure-Rust codecs
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageAnalyzer;

impl ImageAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl IImageAnalyzer for ImageAnalyzer {
    async fn analyze(&self, data: &[u8]) -> PhotoResult<ImageAnalysis> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || analyze_bytes(&data))
            .await
            .map_err(|e| PhotoError::ImageProcessing(format!("analysis task failed: {e}")))
    }

    async fn thumbnail(&self, data: &[u8], max_size: u32) -> PhotoResult<Vec<u8>> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || render_thumbnail(&data, max_size))
            .await
            .map_err(|e| PhotoError::ImageProcessing(format!("thumbnail task failed: {e}")))?
    }
}

fn analyze_bytes(data: &[u8]) -> ImageAnalysis {
    let dimensions = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    let exif = read_exif(data);
    let taken_at = exif.as_ref().and_then(|e| e.date_time_original);

    debug!(?dimensions, has_exif = exif.is_some(), "Image analyzed");
    ImageAnalysis {
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
        taken_at,
        exif,
    }
}

fn render_thumbnail(data: &[u8], max_size: u32) -> PhotoResult<Vec<u8>> {
    let image = image::load_from_memory(data)
        .map_err(|e| PhotoError::ImageProcessing(format!("cannot decode image: {e}")))?;

    // JPEG has no alpha channel
    let thumb = DynamicImage::ImageRgb8(image.thumbnail(max_size, max_size).to_rgb8());

    let mut buf = Vec::new();
    thumb
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY))
        .map_err(|e| PhotoError::ImageProcessing(format!("cannot encode thumbnail: {e}")))?;
    Ok(buf)
}

// ============================================================================
// EXIF
// ============================================================================

fn read_exif(data: &[u8]) -> Option<ExifData> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;
    let field = |tag: Tag| exif.get_field(tag, In::PRIMARY);

    let text = |tag: Tag| {
        field(tag)
            .map(|f| f.display_value().to_string().trim_matches('"').trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let rational = |tag: Tag| match field(tag).map(|f| &f.value) {
        Some(Value::Rational(v)) => v.first().map(|r| r.to_f64()),
        _ => None,
    };

    let iso = field(Tag::PhotographicSensitivity).and_then(|f| match &f.value {
        Value::Short(v) => v.first().map(|&n| u32::from(n)),
        Value::Long(v) => v.first().copied(),
        _ => None,
    });

    let date_time_original = field(Tag::DateTimeOriginal).and_then(|f| match &f.value {
        Value::Ascii(v) => v.first().and_then(|bytes| parse_exif_datetime(bytes)),
        _ => None,
    });

    let latitude = gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S');
    let longitude = gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W');
    let altitude = rational(Tag::GPSAltitude).map(|alt| {
        let below_sea_level = matches!(
            field(Tag::GPSAltitudeRef).map(|f| &f.value),
            Some(Value::Byte(v)) if v.first() == Some(&1)
        );
        if below_sea_level {
            -alt
        } else {
            alt
        }
    });

    let data = ExifData {
        camera_make: text(Tag::Make),
        camera_model: text(Tag::Model),
        lens_model: text(Tag::LensModel),
        focal_length: rational(Tag::FocalLength),
        aperture: rational(Tag::FNumber),
        shutter_speed: text(Tag::ExposureTime),
        iso,
        latitude,
        longitude,
        altitude,
        date_time_original,
    };

    (!data.is_empty()).then_some(data)
}

/// Parses `YYYY:MM:DD HH:MM:SS`; the value carries no zone and is taken as UTC
fn parse_exif_datetime(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let dt = exif::DateTime::from_ascii(bytes).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(
            u32::from(dt.hour),
            u32::from(dt.minute),
            u32::from(dt.second),
        )
        .map(|naive| naive.and_utc())
}

fn gps_coordinate(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let value = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(dms) = &value.value else {
        return None;
    };
    if dms.len() < 3 {
        return None;
    }
    let decimal = dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0;

    let hemisphere = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|f| f.display_value().to_string())
        .unwrap_or_default();
    Some(if hemisphere.contains(negative) {
        -decimal
    } else {
        decimal
    })
}
