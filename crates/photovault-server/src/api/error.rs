//! Error-to-response mapping
//!
//! The only place a [`PhotoError`] becomes an HTTP status. Bodies always
//! have the shape `{"error": true, "reason": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use photovault_core::domain::PhotoError;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub reason: String,
}

/// Handler error wrapper
#[derive(Debug)]
pub struct ApiError(pub PhotoError);

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self(PhotoError::InvalidRequest(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PhotoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PhotoError::NotFound(_) => StatusCode::NOT_FOUND,
            PhotoError::Duplicate { .. } => StatusCode::CONFLICT,
            PhotoError::AccessDenied(_) => StatusCode::FORBIDDEN,
            PhotoError::NetworkUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PhotoError::Storage(_) | PhotoError::ImageProcessing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PhotoError::Server { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    /// Message sent to the client
    pub fn reason(&self) -> String {
        match &self.0 {
            PhotoError::InvalidRequest(m)
            | PhotoError::NotFound(m)
            | PhotoError::AccessDenied(m)
            | PhotoError::NetworkUnavailable(m)
            | PhotoError::Storage(m) => m.clone(),
            PhotoError::ImageProcessing(m) => format!("Image processing failed: {m}"),
            PhotoError::Server { reason, .. } => reason.clone(),
            dup @ PhotoError::Duplicate { .. } => dup.to_string(),
        }
    }
}

impl From<PhotoError> for ApiError {
    fn from(err: PhotoError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = self.reason();

        if status.is_server_error() {
            error!(status = status.as_u16(), code = self.0.code(), %reason, "Request failed");
        } else {
            warn!(status = status.as_u16(), code = self.0.code(), %reason, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                error: true,
                reason,
            }),
        )
            .into_response()
    }
}
