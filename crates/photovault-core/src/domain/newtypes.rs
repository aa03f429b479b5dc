//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for identifiers and checksums. Each newtype
//! validates at construction time so the rest of the code can trust it.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::PhotoError;

// ============================================================================
// PhotoId
// ============================================================================

/// Server-assigned identifier of a stored photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(Uuid);

impl PhotoId {
    /// Create a new random PhotoId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a PhotoId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PhotoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PhotoId {
    type Err = PhotoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| PhotoError::InvalidRequest(format!("Invalid photo id '{s}': {e}")))
    }
}

impl From<Uuid> for PhotoId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Checksum
// ============================================================================

/// Length of a hex-encoded SHA-256 digest
const CHECKSUM_HEX_LEN: usize = 64;

/// Content checksum: 64 lowercase hex characters (SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Validates and wraps a hex digest
    ///
    /// Uppercase input is normalized to lowercase.
    pub fn new(value: impl Into<String>) -> Result<Self, PhotoError> {
        let value = value.into().to_ascii_lowercase();
        if value.len() != CHECKSUM_HEX_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PhotoError::InvalidRequest(format!(
                "Invalid checksum '{value}': expected {CHECKSUM_HEX_LEN} hex characters"
            )));
        }
        Ok(Self(value))
    }

    /// Wraps a digest produced by [`compute_checksum`](crate::checksum::compute_checksum)
    pub(crate) fn from_digest(hex: String) -> Self {
        Self(hex)
    }

    /// Returns the hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Checksum {
    type Error = PhotoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Checksum> for String {
    fn from(checksum: Checksum) -> Self {
        checksum.0
    }
}

impl FromStr for Checksum {
    type Err = PhotoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// LocalAssetId
// ============================================================================

/// Identifier of an asset in the local photo library
///
/// Opaque to the engine. The folder library uses the path relative to the
/// library root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalAssetId(String);

impl LocalAssetId {
    /// Creates a LocalAssetId, rejecting empty or whitespace-only values
    pub fn new(value: impl Into<String>) -> Result<Self, PhotoError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PhotoError::InvalidRequest(
                "Local asset id must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LocalAssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LocalAssetId {
    type Error = PhotoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocalAssetId> for String {
    fn from(id: LocalAssetId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_id_roundtrip() {
        let id = PhotoId::new();
        let parsed: PhotoId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_photo_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<PhotoId>().unwrap_err();
        assert!(matches!(err, PhotoError::InvalidRequest(_)));
    }

    #[test]
    fn test_checksum_validation() {
        let hex = "a".repeat(64);
        assert!(Checksum::new(hex.clone()).is_ok());
        assert!(Checksum::new("abc").is_err());
        assert!(Checksum::new("z".repeat(64)).is_err());

        let upper = Checksum::new("A".repeat(64)).unwrap();
        assert_eq!(upper.as_str(), hex);
    }

    #[test]
    fn test_checksum_serde_rejects_invalid() {
        let ok: Result<Checksum, _> = serde_json::from_str(&format!("\"{}\"", "0".repeat(64)));
        assert!(ok.is_ok());
        let bad: Result<Checksum, _> = serde_json::from_str("\"short\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_local_asset_id_rejects_empty() {
        assert!(LocalAssetId::new("").is_err());
        assert!(LocalAssetId::new("   ").is_err());
        assert_eq!(
            LocalAssetId::new("2024/IMG_0001.jpg").unwrap().as_str(),
            "2024/IMG_0001.jpg"
        );
    }
}
