//! Upload ledger
//!
//! Persistent mapping from local asset id to the server photo it became.
//! The engine consults it to skip work and records into it after every
//! classified item, so an interrupted pass resumes where it stopped.
//!
//! ## Durability
//!
//! Every mutation rewrites the whole file: the new document goes to
//! `<file>.tmp` and is renamed over the old one. The in-memory map is built
//! on a copy and only swapped in once the rename succeeded, so a failed
//! write leaves both views at the previous state.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use photovault_core::domain::{
    newtypes::{Checksum, LocalAssetId, PhotoId},
    UploadLedgerEntry,
};

use crate::SyncError;

type Entries = BTreeMap<LocalAssetId, UploadLedgerEntry>;

/// Durable record of backed-up local assets
pub struct UploadLedger {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl UploadLedger {
    /// Opens the ledger at `path`
    ///
    /// A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LedgerCorrupt`] if the file exists but is not a
    /// valid ledger. The file is left untouched in that case.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice::<Entries>(&bytes).map_err(|e| SyncError::LedgerCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), entries = entries.len(), "Upload ledger opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn has(&self, id: &LocalAssetId) -> bool {
        self.entries.lock().await.contains_key(id)
    }

    /// Returns true if any entry carries `checksum`
    pub async fn has_checksum(&self, checksum: &Checksum) -> bool {
        self.entries
            .lock()
            .await
            .values()
            .any(|entry| &entry.checksum == checksum)
    }

    /// Records (or replaces) the entry for `id`, durably
    pub async fn record(
        &self,
        id: LocalAssetId,
        server_photo_id: Option<PhotoId>,
        checksum: Checksum,
    ) -> Result<(), SyncError> {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        next.insert(
            id.clone(),
            UploadLedgerEntry::new(id.clone(), server_photo_id, checksum),
        );

        self.persist(&next).await?;
        *guard = next;

        debug!(asset = %id, duplicate = server_photo_id.is_none(), "Ledger entry recorded");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Forgets every entry
    pub async fn clear(&self) -> Result<(), SyncError> {
        let mut guard = self.entries.lock().await;
        let next = Entries::new();
        self.persist(&next).await?;
        *guard = next;

        info!(path = %self.path.display(), "Upload ledger cleared");
        Ok(())
    }

    /// Snapshot of all entries, ordered by local asset id
    pub async fn entries(&self) -> Vec<UploadLedgerEntry> {
        self.entries.lock().await.values().cloned().collect()
    }

    /// Ids of every recorded asset
    pub async fn uploaded_ids(&self) -> HashSet<LocalAssetId> {
        self.entries.lock().await.keys().cloned().collect()
    }

    async fn persist(&self, entries: &Entries) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let tmp = tmp_path(&self.path);
        let result = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %tmp.display(),
                        error = %cleanup,
                        "Failed to remove ledger temp file"
                    );
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
