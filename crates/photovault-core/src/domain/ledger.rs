//! Upload ledger entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Checksum, LocalAssetId, PhotoId};

/// Client-side record of one backed-up local asset
///
/// `server_photo_id == None` means the content was recognized as a duplicate
/// and was not stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLedgerEntry {
    pub local_asset_id: LocalAssetId,
    pub server_photo_id: Option<PhotoId>,
    pub checksum: Checksum,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadLedgerEntry {
    /// Creates an entry stamped with the current time
    pub fn new(
        local_asset_id: LocalAssetId,
        server_photo_id: Option<PhotoId>,
        checksum: Checksum,
    ) -> Self {
        Self {
            local_asset_id,
            server_photo_id,
            checksum,
            uploaded_at: Utc::now(),
        }
    }

    /// Returns true if this entry stands for a duplicate skip
    pub fn is_duplicate(&self) -> bool {
        self.server_photo_id.is_none()
    }
}
