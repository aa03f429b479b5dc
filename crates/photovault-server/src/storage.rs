//! Photo storage engine
//!
//! Owns the on-disk layout and the ingestion pipeline:
//!
//! ```text
//! {base}/photos/originals/{YYYY}/{MM}/{uuid}.{ext}
//! {base}/thumbnails/{uuid}.jpg
//! ```
//!
//! ## Ingest order
//!
//! 1. checksum, duplicate check (nothing written on a duplicate)
//! 2. analysis (failures degrade to absent values)
//! 3. original, written atomically
//! 4. thumbnail; on failure the original is removed
//! 5. metadata record, last
//!
//! A record therefore never points at files that were not fully written.
//! Files without a record can only be left behind by a crash between steps
//! 3 and 5; [`PhotoStorageEngine::reconcile_orphans`] removes them.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use photovault_core::checksum::compute_checksum;
use photovault_core::config::StorageConfig;
use photovault_core::domain::photo::{extension_for, is_allowed_mime_type, ALLOWED_MIME_TYPES};
use photovault_core::domain::{
    ListQuery, PhotoError, PhotoId, PhotoRecord, PhotoResult, SortField, SortOrder,
};
use photovault_core::ports::{IImageAnalyzer, IMetadataStore, ImageAnalysis};

/// Suffix of in-progress writes
const TMP_SUFFIX: &str = ".tmp";

/// Result of an orphan sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Files inspected under both trees
    pub scanned: usize,
    /// Files without a metadata record that were deleted
    pub removed: usize,
    /// Leftover temporary files that were deleted
    pub temp_removed: usize,
}

/// Server-side ingestion, listing and deletion of photos
pub struct PhotoStorageEngine {
    base_path: PathBuf,
    originals_dir: PathBuf,
    thumbnails_dir: PathBuf,
    thumbnail_size: u32,
    store: Arc<dyn IMetadataStore>,
    analyzer: Arc<dyn IImageAnalyzer>,
}

impl PhotoStorageEngine {
    pub fn new(
        config: &StorageConfig,
        store: Arc<dyn IMetadataStore>,
        analyzer: Arc<dyn IImageAnalyzer>,
    ) -> Self {
        Self {
            base_path: config.base_path.clone(),
            originals_dir: config.originals_dir(),
            thumbnails_dir: config.thumbnails_dir(),
            thumbnail_size: config.thumbnail_size,
            store,
            analyzer,
        }
    }

    /// Creates the originals and thumbnails directories
    pub async fn ensure_layout(&self) -> PhotoResult<()> {
        tokio::fs::create_dir_all(&self.originals_dir).await?;
        tokio::fs::create_dir_all(&self.thumbnails_dir).await?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// True when the storage base directory exists
    pub fn storage_available(&self) -> bool {
        self.base_path.is_dir()
    }

    // ------------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------------

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload_photo(
        &self,
        filename: &str,
        data: &[u8],
        mime_type: &str,
    ) -> PhotoResult<PhotoRecord> {
        validate_upload(filename, data, mime_type)?;

        let checksum = compute_checksum(data);
        if let Some(existing) = self.store.find_by_checksum(&checksum).await? {
            info!(existing_id = %existing.id, "Duplicate upload rejected");
            return Err(PhotoError::duplicate(existing.id));
        }

        let analysis = match self.analyzer.analyze(data).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Image analysis failed, storing without metadata");
                ImageAnalysis::default()
            }
        };

        let id = PhotoId::new();
        let created_at = Utc::now();
        let storage_path = storage_path_for(&id, created_at, &extension_for(filename, mime_type));
        let original = self.originals_dir.join(&storage_path);

        write_atomic(&original, data).await?;

        let thumbnail_path = format!("{id}.jpg");
        let thumbnail = self.thumbnails_dir.join(&thumbnail_path);
        if let Err(e) = self.write_thumbnail(data, &thumbnail).await {
            warn!(error = %e, "Thumbnail generation failed, rolling back original");
            remove_if_exists(&original).await;
            return Err(match e {
                PhotoError::ImageProcessing(_) => e,
                other => PhotoError::ImageProcessing(other.to_string()),
            });
        }

        let record = PhotoRecord {
            id,
            original_filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: data.len() as u64,
            width: analysis.width,
            height: analysis.height,
            created_at,
            taken_at: analysis.taken_at,
            checksum,
            storage_path,
            thumbnail_path: Some(thumbnail_path),
            exif: analysis.exif,
        };

        if let Err(e) = self.store.save(&record).await {
            if e.is_duplicate() {
                info!("Concurrent upload of the same content won the race");
            } else {
                warn!(error = %e, "Metadata save failed, removing written files");
            }
            remove_if_exists(&original).await;
            remove_if_exists(&thumbnail).await;
            return Err(e);
        }

        info!(
            photo_id = %record.id,
            filename,
            size = record.size,
            width = ?record.width,
            height = ?record.height,
            "Photo stored"
        );
        Ok(record)
    }

    async fn write_thumbnail(&self, data: &[u8], dest: &Path) -> PhotoResult<()> {
        let jpeg = self.analyzer.thumbnail(data, self.thumbnail_size).await?;
        write_atomic(dest, &jpeg).await
    }

    // ------------------------------------------------------------------------
    // Read paths
    // ------------------------------------------------------------------------

    /// One page of records and the total count after filtering
    pub async fn list_photos(&self, query: &ListQuery) -> PhotoResult<(Vec<PhotoRecord>, u64)> {
        let mut records: Vec<PhotoRecord> = self
            .store
            .load_all()
            .await?
            .into_iter()
            .filter(|r| query.year.map_or(true, |y| r.created_at.year() == y))
            .filter(|r| query.month.map_or(true, |m| r.created_at.month() == m))
            .collect();

        sort_records(&mut records, query.sort_by, query.order);

        let total = records.len() as u64;
        let page = records
            .into_iter()
            .skip(query.offset())
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    pub async fn get_photo(&self, id: &PhotoId) -> PhotoResult<PhotoRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PhotoError::NotFound("Photo not found".to_string()))
    }

    pub async fn photo_exists(&self, id: &PhotoId) -> PhotoResult<bool> {
        Ok(self.store.get(id).await?.is_some())
    }

    /// Absolute path of the original; `Storage` if the file is gone
    pub async fn photo_file_path(&self, id: &PhotoId) -> PhotoResult<PathBuf> {
        let record = self.get_photo(id).await?;
        let path = self.originals_dir.join(&record.storage_path);
        ensure_file(&path, "Photo file not found on disk").await?;
        Ok(path)
    }

    /// Absolute path of the thumbnail
    pub async fn thumbnail_file_path(&self, id: &PhotoId) -> PhotoResult<PathBuf> {
        let record = self.get_photo(id).await?;
        let relative = record
            .thumbnail_path
            .ok_or_else(|| PhotoError::NotFound("Thumbnail not found".to_string()))?;
        let path = self.thumbnails_dir.join(relative);
        ensure_file(&path, "Thumbnail file not found on disk").await?;
        Ok(path)
    }

    // ------------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------------

    #[tracing::instrument(skip(self), fields(photo_id = %id))]
    pub async fn delete_photo(&self, id: &PhotoId) -> PhotoResult<()> {
        let record = self.get_photo(id).await?;

        remove_if_exists(&self.originals_dir.join(&record.storage_path)).await;
        if let Some(thumb) = &record.thumbnail_path {
            remove_if_exists(&self.thumbnails_dir.join(thumb)).await;
        }
        self.store.delete(id).await?;

        info!("Photo deleted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reconcile
    // ------------------------------------------------------------------------

    /// Deletes files with no metadata record and leftover temporary files
    pub async fn reconcile_orphans(&self) -> PhotoResult<ReconcileReport> {
        let known: HashSet<PhotoId> = self
            .store
            .load_all()
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let roots = vec![self.originals_dir.clone(), self.thumbnails_dir.clone()];
        let report = tokio::task::spawn_blocking(move || sweep(&roots, &known))
            .await
            .map_err(|e| PhotoError::Storage(format!("reconcile task failed: {e}")))?;

        info!(
            scanned = report.scanned,
            removed = report.removed,
            temp_removed = report.temp_removed,
            "Orphan reconcile finished"
        );
        Ok(report)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_upload(filename: &str, data: &[u8], mime_type: &str) -> PhotoResult<()> {
    if filename.trim().is_empty() {
        return Err(PhotoError::InvalidRequest("Filename is required".to_string()));
    }
    if !is_allowed_mime_type(mime_type) {
        return Err(PhotoError::InvalidRequest(format!(
            "Unsupported file type: {mime_type}. Allowed types: {}",
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }
    if data.is_empty() {
        return Err(PhotoError::InvalidRequest("File is empty".to_string()));
    }
    Ok(())
}

/// `{YYYY}/{MM}/{uuid}.{ext}` from the ingestion time
fn storage_path_for(id: &PhotoId, created_at: DateTime<Utc>, ext: &str) -> String {
    format!(
        "{:04}/{:02}/{}.{}",
        created_at.year(),
        created_at.month(),
        id,
        ext
    )
}

/// Stable sort; `desc` reverses the comparator so ties keep store order
fn sort_records(records: &mut [PhotoRecord], field: SortField, order: SortOrder) {
    records.sort_by(|a, b| {
        if field == SortField::TakenAt {
            // Missing capture times go last in both directions
            return match (a.taken_at, b.taken_at) {
                (Some(x), Some(y)) => directed(x.cmp(&y), order),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
        }
        let ord = match field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Filename => a.original_filename.cmp(&b.original_filename),
            SortField::Size => a.size.cmp(&b.size),
            SortField::TakenAt => Ordering::Equal,
        };
        directed(ord, order)
    });
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> PhotoResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    let result = async {
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        remove_if_exists(&tmp).await;
        return Err(PhotoError::Storage(format!(
            "failed to write {}: {e}",
            path.display()
        )));
    }
    Ok(())
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

async fn ensure_file(path: &Path, message: &str) -> PhotoResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(PhotoError::Storage(message.to_string())),
    }
}

fn sweep(roots: &[PathBuf], known: &HashSet<PhotoId>) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for root in roots {
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            report.scanned += 1;

            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(TMP_SUFFIX) {
                if std::fs::remove_file(path).is_ok() {
                    report.temp_removed += 1;
                }
                continue;
            }

            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<PhotoId>().ok())
            else {
                debug!(path = %path.display(), "Skipping file with unrecognized name");
                continue;
            };

            if !known.contains(&id) {
                match std::fs::remove_file(path) {
                    Ok(()) => {
                        info!(path = %path.display(), "Removed orphan file");
                        report.removed += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove orphan"),
                }
            }
        }
    }

    report
}
