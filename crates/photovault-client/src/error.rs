//! HTTP status and transport error mapping

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use photovault_core::domain::{PhotoError, PhotoId};

/// Prefix of the reason the server sends with a 409
const DUPLICATE_PREFIX: &str = "Photo already exists with id:";

/// Error body returned by the server: `{"error": true, "reason": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: String,
}

/// Maps a reqwest failure into the taxonomy
pub fn map_transport(err: reqwest::Error) -> PhotoError {
    if err.is_connect() || err.is_timeout() {
        return PhotoError::NetworkUnavailable(err.to_string());
    }
    if err.is_decode() {
        return PhotoError::Server {
            status: err.status().map(|s| s.as_u16()).unwrap_or(200),
            reason: format!("invalid response body: {err}"),
        };
    }
    if let Some(status) = err.status() {
        return from_status(status, err.to_string());
    }
    PhotoError::NetworkUnavailable(err.to_string())
}

/// Maps an error status and its reason into the taxonomy
pub fn from_status(status: StatusCode, reason: String) -> PhotoError {
    match status {
        StatusCode::BAD_REQUEST => PhotoError::InvalidRequest(reason),
        StatusCode::FORBIDDEN => PhotoError::AccessDenied(reason),
        StatusCode::NOT_FOUND => PhotoError::NotFound(reason),
        StatusCode::CONFLICT => PhotoError::Duplicate {
            existing_id: parse_existing_id(&reason),
        },
        _ => PhotoError::Server {
            status: status.as_u16(),
            reason,
        },
    }
}

/// Extracts the id from `Photo already exists with id: <uuid>`
pub fn parse_existing_id(reason: &str) -> Option<PhotoId> {
    let (_, rest) = reason.split_once(DUPLICATE_PREFIX)?;
    rest.trim().parse().ok()
}

/// Passes success responses through; turns error responses into [`PhotoError`]
pub(crate) async fn check(response: Response) -> Result<Response, PhotoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.reason)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text
            }
        });

    Err(from_status(status, reason))
}
