//! Error taxonomy shared by client and server
//!
//! Every port returns [`PhotoError`]. The HTTP layer maps it to status codes
//! in exactly one place, and the API client maps status codes back into it,
//! so the sync engine can classify outcomes without string matching.

use thiserror::Error;

use super::newtypes::PhotoId;

/// Result alias used at port boundaries
pub type PhotoResult<T> = Result<T, PhotoError>;

/// Errors that can occur anywhere in the backup pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// The photo library (or another source) refused access; fatal to a sync pass
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The server could not be reached
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A metadata record or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Content with the same checksum is already stored
    ///
    /// `existing_id` is `None` only when the remote side did not report it.
    #[error("{}", duplicate_reason(.existing_id))]
    Duplicate {
        /// Id of the record that already holds this content
        existing_id: Option<PhotoId>,
    },

    /// Bad input: type, size, id format, empty filename
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Filesystem or persistence inconsistency
    #[error("Storage error: {0}")]
    Storage(String),

    /// Dimension, EXIF or thumbnail derivation failed
    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    /// The server answered with an unexpected status
    #[error("Server error ({status}): {reason}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Reason reported by the server, if any
        reason: String,
    },
}

fn duplicate_reason(existing_id: &Option<PhotoId>) -> String {
    match existing_id {
        Some(id) => format!("Photo already exists with id: {id}"),
        None => "Photo already exists".to_string(),
    }
}

impl PhotoError {
    /// Creates a duplicate error pointing at an existing record
    pub fn duplicate(existing_id: PhotoId) -> Self {
        PhotoError::Duplicate {
            existing_id: Some(existing_id),
        }
    }

    /// Short machine-readable code, used in logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            PhotoError::AccessDenied(_) => "access_denied",
            PhotoError::NetworkUnavailable(_) => "network_unavailable",
            PhotoError::NotFound(_) => "not_found",
            PhotoError::Duplicate { .. } => "duplicate",
            PhotoError::InvalidRequest(_) => "invalid_request",
            PhotoError::Storage(_) => "storage_error",
            PhotoError::ImageProcessing(_) => "image_processing_error",
            PhotoError::Server { .. } => "server_error",
        }
    }

    /// Returns true for failures worth retrying (network loss, 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            PhotoError::NetworkUnavailable(_) => true,
            PhotoError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this is a duplicate signal
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PhotoError::Duplicate { .. })
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => PhotoError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => PhotoError::AccessDenied(err.to_string()),
            _ => PhotoError::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_display_carries_id() {
        let id = PhotoId::new();
        let err = PhotoError::duplicate(id);
        assert_eq!(err.to_string(), format!("Photo already exists with id: {id}"));

        let anonymous = PhotoError::Duplicate { existing_id: None };
        assert_eq!(anonymous.to_string(), "Photo already exists");
    }

    #[test]
    fn test_codes() {
        assert_eq!(PhotoError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            PhotoError::ImageProcessing("x".into()).code(),
            "image_processing_error"
        );
        assert_eq!(
            PhotoError::Server {
                status: 502,
                reason: String::new()
            }
            .code(),
            "server_error"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(PhotoError::NetworkUnavailable("down".into()).is_transient());
        assert!(PhotoError::Server {
            status: 503,
            reason: "busy".into()
        }
        .is_transient());
        assert!(!PhotoError::Server {
            status: 418,
            reason: String::new()
        }
        .is_transient());
        assert!(!PhotoError::InvalidRequest("bad".into()).is_transient());
        assert!(!PhotoError::Duplicate { existing_id: None }.is_transient());
    }

    #[test]
    fn test_io_error_mapping() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(PhotoError::from(missing), PhotoError::NotFound(_)));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(PhotoError::from(denied), PhotoError::AccessDenied(_)));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(matches!(PhotoError::from(other), PhotoError::Storage(_)));
    }
}
