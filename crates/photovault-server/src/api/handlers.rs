//! Route handlers

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use photovault_core::domain::{
    HealthStatus, ListParams, ListQuery, Paginated, Pagination, Photo, PhotoId, PhotoRecord,
};

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Response body of a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub photo: Photo,
    pub message: &'static str,
}

fn parse_id(raw: &str) -> ApiResult<PhotoId> {
    raw.parse().map_err(|_| ApiError::invalid("Invalid photo ID"))
}

/// Quotes and backslashes would end the quoted-string early
fn sanitize_filename(name: &str) -> String {
    name.replace(['\\', '"'], "_")
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::from(photovault_core::domain::PhotoError::Storage(e.to_string())))
}

// ============================================================================
// Listing and metadata
// ============================================================================

pub async fn list_photos(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<Photo>>> {
    let Query(params) = params.map_err(|e| ApiError::invalid(e.body_text()))?;
    let query = ListQuery::from(params);

    let (records, total) = state.engine.list_photos(&query).await?;
    Ok(Json(Paginated {
        data: records.iter().map(Photo::from).collect(),
        pagination: Pagination::new(query.page, query.per_page, total),
    }))
}

pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Photo>> {
    let id = parse_id(&id)?;
    let record = state.engine.get_photo(&id).await?;
    Ok(Json(Photo::from(&record)))
}

// ============================================================================
// Streaming
// ============================================================================

async fn stream_file(path: &std::path::Path) -> ApiResult<(Body, u64)> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ApiError::from(photovault_core::domain::PhotoError::Storage(e.to_string())))?;
    let len = file.metadata().await.map(|m| m.len()).unwrap_or(0);
    Ok((Body::from_stream(ReaderStream::new(file)), len))
}

pub async fn download_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let record: PhotoRecord = state.engine.get_photo(&id).await?;
    let path = state.engine.photo_file_path(&id).await?;
    let (body, len) = stream_file(&path).await?;

    debug!(photo_id = %id, bytes = len, "Streaming original");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&record.original_filename)
    );
    let headers = [
        (header::CONTENT_TYPE, header_value(&record.mime_type)?),
        (header::CONTENT_LENGTH, HeaderValue::from(len)),
        (header::CONTENT_DISPOSITION, header_value(&disposition)?),
        (header::ETAG, header_value(&format!("\"{}\"", record.checksum))?),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("private, max-age=31536000"),
        ),
    ];
    Ok((StatusCode::OK, headers, body).into_response())
}

pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let record = state.engine.get_photo(&id).await?;
    let path = state.engine.thumbnail_file_path(&id).await?;
    let (body, len) = stream_file(&path).await?;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
        (header::CONTENT_LENGTH, HeaderValue::from(len)),
        (
            header::ETAG,
            header_value(&format!("\"{}-thumb\"", record.checksum))?,
        ),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400"),
        ),
    ];
    Ok((StatusCode::OK, headers, body).into_response())
}

// ============================================================================
// Upload and delete
// ============================================================================

pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let too_large = || {
        ApiError::invalid(format!(
            "File too large. Maximum size is {}MB",
            state.max_upload_bytes / (1024 * 1024)
        ))
    };
    let multipart_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large()
        } else {
            ApiError::invalid(format!("Invalid multipart body: {}", e.body_text()))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Filename is required"))?;
        let mime_type = field
            .content_type()
            .unwrap_or("image/jpeg")
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > state.max_upload_bytes {
            return Err(too_large());
        }

        let record = state
            .engine
            .upload_photo(&filename, &data, &mime_type)
            .await?;
        return Ok(Json(UploadResponse {
            photo: Photo::from(&record),
            message: "Photo uploaded successfully",
        }));
    }

    Err(ApiError::invalid("Missing file field"))
}

pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.engine.delete_photo(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Health
// ============================================================================

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let storage_available = state.engine.storage_available();
    Json(HealthStatus {
        status: if storage_available { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_available,
    })
}
