//! Folder-backed photo library
//!
//! Presents a directory tree of image files as the device photo library.
//! An asset's id is its path relative to the root, with `/` separators, so
//! ids stay stable across runs and match what the change notifier reports.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use photovault_core::domain::{
    newtypes::LocalAssetId,
    photo::mime_type_for_extension,
    PhotoError, PhotoResult,
};
use photovault_core::ports::{ExportedAsset, IPhotoLibrary, LocalAsset};

/// Photo library rooted at a local directory
#[derive(Debug, Clone)]
pub struct FolderPhotoLibrary {
    root: PathBuf,
}

impl FolderPhotoLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, id: &LocalAssetId) -> Option<PathBuf> {
        let relative = Path::new(id.as_str());
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }
}

/// MIME type for a path, if its extension is a supported image type
pub(crate) fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    mime_type_for_extension(&ext)
}

/// Asset id of `path` under `root`
pub(crate) fn asset_id_for(root: &Path, path: &Path) -> Option<LocalAssetId> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    LocalAssetId::new(parts.join("/")).ok()
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn scan(root: &Path) -> PhotoResult<Vec<LocalAsset>> {
    if !root.is_dir() {
        return Err(PhotoError::AccessDenied(format!(
            "photo library root is not a readable directory: {}",
            root.display()
        )));
    }

    let mut found: Vec<(SystemTime, PathBuf, LocalAsset)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(PhotoError::AccessDenied(e.to_string()));
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable library entry");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || image_mime_type(path).is_none() {
            continue;
        }
        let Some(id) = asset_id_for(root, path) else {
            continue;
        };

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let asset = LocalAsset {
            id,
            filename: entry.file_name().to_string_lossy().into_owned(),
            created_at: Some(DateTime::<Utc>::from(modified)),
        };
        found.push((modified, path.to_path_buf(), asset));
    }

    // Newest first; path breaks ties so the order is stable
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    debug!(root = %root.display(), count = found.len(), "Library enumerated");
    Ok(found.into_iter().map(|(_, _, asset)| asset).collect())
}

#[async_trait::async_trait]
impl IPhotoLibrary for FolderPhotoLibrary {
    async fn enumerate(&self) -> PhotoResult<Vec<LocalAsset>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan(&root))
            .await
            .map_err(|e| PhotoError::Storage(format!("library scan task failed: {e}")))?
    }

    async fn resolve(&self, ids: &[LocalAssetId]) -> PhotoResult<Vec<LocalAsset>> {
        let mut assets = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(path) = self.path_of(id) else {
                warn!(asset = %id, "Ignoring asset id outside the library root");
                continue;
            };
            if !path.is_file() || image_mime_type(&path).is_none() {
                continue;
            }
            assets.push(LocalAsset {
                id: id.clone(),
                filename: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.to_string()),
                created_at: modified_at(&path),
            });
        }
        Ok(assets)
    }

    async fn export(&self, asset: &LocalAsset) -> PhotoResult<ExportedAsset> {
        let path = self
            .path_of(&asset.id)
            .ok_or_else(|| PhotoError::InvalidRequest(format!("invalid asset id: {}", asset.id)))?;
        let mime_type = image_mime_type(&path).ok_or_else(|| {
            PhotoError::InvalidRequest(format!("unsupported file type: {}", asset.id))
        })?;
        let data = tokio::fs::read(&path).await?;

        Ok(ExportedAsset {
            filename: asset.filename.clone(),
            mime_type: mime_type.to_string(),
            data,
        })
    }
}
