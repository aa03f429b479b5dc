//! SQLite implementation of IMetadataStore
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                         |
//! |-----------------|----------|--------------------------------------------------|
//! | PhotoId         | TEXT     | UUID string via `.to_string()` / `FromStr`       |
//! | Checksum        | TEXT     | Lowercase hex via `.as_str()` / `Checksum::new()`|
//! | DateTime<Utc>   | TEXT     | ISO 8601 via `to_rfc3339()`                      |
//! | u64 / u32       | INTEGER  | Cast through `i64`                               |
//! | ExifData        | row      | One optional row in `exif_data`                  |
//!
//! Checksum uniqueness is enforced by the schema. A colliding insert fails
//! inside SQLite, so two concurrent ingests of the same bytes cannot both
//! commit.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use photovault_core::domain::{
    newtypes::{Checksum, PhotoId},
    ExifData, PhotoError, PhotoRecord, PhotoResult,
};
use photovault_core::ports::IMetadataStore;

use crate::StoreError;

/// SQLite-based implementation of the metadata store port
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Creates a new store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_RECORDS: &str = "SELECT p.*, \
     e.photo_id AS exif_photo_id, e.camera_make, e.camera_model, e.lens_model, \
     e.focal_length, e.aperture, e.shutter_speed, e.iso, e.latitude, e.longitude, \
     e.altitude, e.date_time_original \
     FROM photo_metadata p LEFT JOIN exif_data e ON e.photo_id = p.id";

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's own CURRENT_TIMESTAMP format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

// ============================================================================
// Row mapping
// ============================================================================

fn exif_from_row(row: &SqliteRow) -> Result<Option<ExifData>, StoreError> {
    let exif_photo_id: Option<String> = row.try_get("exif_photo_id")?;
    if exif_photo_id.is_none() {
        return Ok(None);
    }

    Ok(Some(ExifData {
        camera_make: row.try_get("camera_make")?,
        camera_model: row.try_get("camera_model")?,
        lens_model: row.try_get("lens_model")?,
        focal_length: row.try_get("focal_length")?,
        aperture: row.try_get("aperture")?,
        shutter_speed: row.try_get("shutter_speed")?,
        iso: to_u32(row.try_get("iso")?),
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        altitude: row.try_get("altitude")?,
        date_time_original: parse_optional_datetime(row.try_get("date_time_original")?)?,
    }))
}

fn record_from_row(row: &SqliteRow) -> Result<PhotoRecord, StoreError> {
    let id_str: String = row.try_get("id")?;
    let checksum_str: String = row.try_get("checksum")?;
    let size: i64 = row.try_get("size")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(PhotoRecord {
        id: PhotoId::from_str(&id_str)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        original_filename: row.try_get("original_filename")?,
        mime_type: row.try_get("mime_type")?,
        size: u64::try_from(size).map_err(|_| {
            StoreError::SerializationError(format!("Negative size {} for photo {}", size, id_str))
        })?,
        width: to_u32(row.try_get("width")?),
        height: to_u32(row.try_get("height")?),
        created_at: parse_datetime(&created_at)?,
        taken_at: parse_optional_datetime(row.try_get("taken_at")?)?,
        checksum: Checksum::new(checksum_str)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        storage_path: row.try_get("storage_path")?,
        thumbnail_path: row.try_get("thumbnail_path")?,
        exif: exif_from_row(row)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ============================================================================
// IMetadataStore implementation
// ============================================================================

impl SqliteMetadataStore {
    async fn fetch_one_where(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<PhotoRecord>, StoreError> {
        let sql = format!("{} WHERE {} = ?", SELECT_RECORDS, clause);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn write_record(&self, record: &PhotoRecord) -> Result<(), sqlx::Error> {
        let id = record.id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO photo_metadata \
             (id, original_filename, mime_type, size, width, height, created_at, \
              taken_at, checksum, storage_path, thumbnail_path) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
              original_filename = excluded.original_filename, \
              mime_type = excluded.mime_type, \
              size = excluded.size, \
              width = excluded.width, \
              height = excluded.height, \
              created_at = excluded.created_at, \
              taken_at = excluded.taken_at, \
              checksum = excluded.checksum, \
              storage_path = excluded.storage_path, \
              thumbnail_path = excluded.thumbnail_path",
        )
        .bind(&id)
        .bind(&record.original_filename)
        .bind(&record.mime_type)
        .bind(record.size as i64)
        .bind(record.width.map(i64::from))
        .bind(record.height.map(i64::from))
        .bind(record.created_at.to_rfc3339())
        .bind(record.taken_at.map(|dt| dt.to_rfc3339()))
        .bind(record.checksum.as_str())
        .bind(&record.storage_path)
        .bind(&record.thumbnail_path)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM exif_data WHERE photo_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        if let Some(exif) = record.exif.as_ref().filter(|e| !e.is_empty()) {
            sqlx::query(
                "INSERT INTO exif_data \
                 (photo_id, camera_make, camera_model, lens_model, focal_length, aperture, \
                  shutter_speed, iso, latitude, longitude, altitude, date_time_original) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&exif.camera_make)
            .bind(&exif.camera_model)
            .bind(&exif.lens_model)
            .bind(exif.focal_length)
            .bind(exif.aperture)
            .bind(&exif.shutter_speed)
            .bind(exif.iso.map(i64::from))
            .bind(exif.latitude)
            .bind(exif.longitude)
            .bind(exif.altitude)
            .bind(exif.date_time_original.map(|dt| dt.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    async fn load_all(&self) -> PhotoResult<Vec<PhotoRecord>> {
        let sql = format!("{} ORDER BY p.rowid ASC", SELECT_RECORDS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn get(&self, id: &PhotoId) -> PhotoResult<Option<PhotoRecord>> {
        Ok(self.fetch_one_where("p.id", &id.to_string()).await?)
    }

    async fn find_by_checksum(&self, checksum: &Checksum) -> PhotoResult<Option<PhotoRecord>> {
        Ok(self.fetch_one_where("p.checksum", checksum.as_str()).await?)
    }

    async fn save(&self, record: &PhotoRecord) -> PhotoResult<()> {
        match self.write_record(record).await {
            Ok(()) => {
                tracing::trace!(photo_id = %record.id, "Saved photo metadata");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                let existing = self.fetch_one_where("p.checksum", record.checksum.as_str()).await?;
                tracing::debug!(
                    photo_id = %record.id,
                    checksum = %record.checksum,
                    "Checksum already stored"
                );
                Err(match existing {
                    Some(existing) => PhotoError::duplicate(existing.id),
                    None => PhotoError::Duplicate { existing_id: None },
                })
            }
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn delete(&self, id: &PhotoId) -> PhotoResult<bool> {
        let result = sqlx::query("DELETE FROM photo_metadata WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let removed = result.rows_affected() > 0;
        tracing::trace!(photo_id = %id, removed, "Deleted photo metadata");
        Ok(removed)
    }

    async fn count(&self) -> PhotoResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photo_metadata")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_datetime_accepts_rfc3339_and_sqlite_format() {
        assert!(parse_datetime("2024-03-15T10:30:00+00:00").is_ok());
        assert!(parse_datetime("2024-03-15 10:30:00").is_ok());
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn negative_dimensions_are_dropped() {
        assert_eq!(to_u32(Some(-1)), None);
        assert_eq!(to_u32(Some(640)), Some(640));
        assert_eq!(to_u32(None), None);
    }
}
