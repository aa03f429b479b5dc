//! JSON file implementation of IMetadataStore
//!
//! The whole collection lives in one pretty-printed JSON array. It is loaded
//! lazily on first use and every mutation rewrites the file through a
//! temporary sibling followed by a rename, so a crash leaves either the old
//! or the new document on disk.
//!
//! All access goes through one `tokio::sync::Mutex`. The in-memory copy is
//! only replaced after the file write succeeds, so a failed write leaves
//! memory and disk in agreement.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use photovault_core::domain::{
    newtypes::{Checksum, PhotoId},
    PhotoError, PhotoRecord, PhotoResult,
};
use photovault_core::ports::IMetadataStore;

use crate::StoreError;

/// Metadata store backed by a single JSON file
pub struct JsonMetadataStore {
    path: PathBuf,
    /// `None` until the file has been read
    records: Mutex<Option<Vec<PhotoRecord>>>,
}

impl JsonMetadataStore {
    /// Creates a store for `path`; nothing is read until first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(None),
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => {
                let records: Vec<PhotoRecord> = serde_json::from_slice(&bytes)?;
                tracing::debug!(
                    path = %self.path.display(),
                    count = records.len(),
                    "Loaded metadata file"
                );
                Ok(records)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, records: &[PhotoRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Runs `f` against the loaded records while holding the lock
    async fn with_records<T>(
        &self,
        f: impl FnOnce(&[PhotoRecord]) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(f(guard.as_deref().unwrap_or_default()))
    }

    /// Applies `mutate` to a copy, persists it, then swaps it in
    async fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<PhotoRecord>) -> PhotoResult<T>,
    ) -> PhotoResult<T> {
        let mut guard = self.records.lock().await;
        let mut next = match guard.as_ref() {
            Some(records) => records.clone(),
            None => self.read_file().await?,
        };

        let result = mutate(&mut next)?;
        self.write_file(&next).await?;
        *guard = Some(next);
        Ok(result)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait::async_trait]
impl IMetadataStore for JsonMetadataStore {
    async fn load_all(&self) -> PhotoResult<Vec<PhotoRecord>> {
        Ok(self.with_records(|records| records.to_vec()).await?)
    }

    async fn get(&self, id: &PhotoId) -> PhotoResult<Option<PhotoRecord>> {
        Ok(self
            .with_records(|records| records.iter().find(|r| &r.id == id).cloned())
            .await?)
    }

    async fn find_by_checksum(&self, checksum: &Checksum) -> PhotoResult<Option<PhotoRecord>> {
        Ok(self
            .with_records(|records| records.iter().find(|r| &r.checksum == checksum).cloned())
            .await?)
    }

    async fn save(&self, record: &PhotoRecord) -> PhotoResult<()> {
        self.mutate(|records| {
            if let Some(existing) = records
                .iter()
                .find(|r| r.checksum == record.checksum && r.id != record.id)
            {
                return Err(PhotoError::duplicate(existing.id));
            }

            match records.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record.clone(),
                None => records.push(record.clone()),
            }
            Ok(())
        })
        .await?;

        tracing::trace!(photo_id = %record.id, "Saved photo metadata");
        Ok(())
    }

    async fn delete(&self, id: &PhotoId) -> PhotoResult<bool> {
        let removed = self
            .mutate(|records| {
                let before = records.len();
                records.retain(|r| &r.id != id);
                Ok(records.len() != before)
            })
            .await?;

        tracing::trace!(photo_id = %id, removed, "Deleted photo metadata");
        Ok(removed)
    }

    async fn count(&self) -> PhotoResult<u64> {
        Ok(self.with_records(|records| records.len() as u64).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/data/metadata.json")),
            PathBuf::from("/data/metadata.json.tmp")
        );
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonMetadataStore::new(dir.path().join("metadata.json"));
        assert!(store.load_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonMetadataStore::new(&path);
        let err = store.load_all().await.unwrap_err();
        assert!(matches!(err, PhotoError::Storage(_)));
    }
}
