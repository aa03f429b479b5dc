//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`

use std::io::Cursor;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use photovault_core::config::StorageConfig;
use photovault_core::domain::PhotoId;
use photovault_server::{create_router, AppState, ImageAnalyzer, PhotoStorageEngine};
use photovault_store::JsonMetadataStore;

const BOUNDARY: &str = "photovault-test-boundary";

struct TestApp {
    _dir: TempDir,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_limit(50 * 1024 * 1024).await
    }

    async fn with_limit(max_upload_bytes: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: dir.path().to_path_buf(),
            ..StorageConfig::default()
        };
        let store = Arc::new(JsonMetadataStore::new(config.metadata_file()));
        let engine = Arc::new(PhotoStorageEngine::new(
            &config,
            store,
            Arc::new(ImageAnalyzer::new()),
        ));
        engine.ensure_layout().await.unwrap();

        Self {
            _dir: dir,
            router: create_router(AppState::new(engine, max_upload_bytes)),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn upload(&self, filename: &str, mime: &str, data: &[u8]) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(multipart_request("file", Some(filename), mime, data))
            .await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([shade, shade, 30]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn multipart_request(field: &str, filename: Option<&str>, mime: &str, data: &[u8]) -> Request<Body> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/v1/photos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, _, body) = app.get("/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storageAvailable"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_outside_prefix() {
    let app = TestApp::new().await;
    let (status, _, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_then_fetch_everything() {
    let app = TestApp::new().await;
    let data = png(400, 200, 10);

    let (status, body) = app.upload("wide.png", "image/png", &data).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Photo uploaded successfully");
    assert_eq!(body["photo"]["filename"], "wide.png");
    assert_eq!(body["photo"]["width"], 400);
    let id = body["photo"]["id"].as_str().unwrap().to_string();

    let (status, _, meta) = app.get(&format!("/api/v1/photos/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&meta)["mimeType"], "image/png");

    let (status, headers, original) = app.get(&format!("/api/v1/photos/{id}/download")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(original, data);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"wide.png\""
    );
    assert_eq!(headers[header::CACHE_CONTROL], "private, max-age=31536000");
    let etag = headers[header::ETAG].to_str().unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));

    let (status, headers, thumb) = app.get(&format!("/api/v1/photos/{id}/thumbnail")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=86400");
    assert!(headers[header::ETAG].to_str().unwrap().ends_with("-thumb\""));
    let thumb = image::load_from_memory(&thumb).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (300, 150));
}

#[tokio::test]
async fn test_duplicate_upload_is_conflict() {
    let app = TestApp::new().await;
    let data = png(10, 10, 11);

    let (_, first) = app.upload("a.png", "image/png", &data).await;
    let (status, body) = app.upload("b.png", "image/png", &data).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], true);
    assert_eq!(
        body["reason"],
        format!(
            "Photo already exists with id: {}",
            first["photo"]["id"].as_str().unwrap()
        )
    );
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let app = TestApp::new().await;
    let (status, body) = app.upload("clip.gif", "image/gif", b"GIF89a").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .starts_with("Unsupported file type: image/gif"));
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let app = TestApp::new().await;
    let (status, _, body) = app
        .send(multipart_request("attachment", Some("a.png"), "image/png", &png(4, 4, 1)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["reason"], "Missing file field");
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = TestApp::with_limit(1024).await;
    let data = vec![0u8; 4096];
    let (status, body) = app.upload("big.jpg", "image/jpeg", &data).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .starts_with("File too large"));
}

#[tokio::test]
async fn test_undecodable_upload_is_server_error() {
    let app = TestApp::new().await;
    let (status, body) = app
        .upload("broken.jpg", "image/jpeg", b"\xFF\xD8not really a jpeg")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .starts_with("Image processing failed"));
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_with_pagination_block() {
    let app = TestApp::new().await;
    for (i, name) in ["c.png", "a.png", "b.png"].iter().enumerate() {
        app.upload(name, "image/png", &png(6, 6, i as u8)).await;
    }

    let (status, _, body) = app
        .get("/api/v1/photos?page=1&perPage=2&sortBy=filename&order=asc")
        .await;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["filename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
    assert_eq!(body["pagination"]["totalItems"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNextPage"], true);
    assert_eq!(body["pagination"]["hasPrevPage"], false);
}

#[tokio::test]
async fn test_list_clamps_out_of_range_parameters() {
    let app = TestApp::new().await;
    let (status, _, body) = app.get("/api/v1/photos?page=0&perPage=500").await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["perPage"], 100);
}

#[tokio::test]
async fn test_list_clamps_numbers_beyond_integer_range() {
    let app = TestApp::new().await;
    let (status, _, body) = app
        .get("/api/v1/photos?page=99999999999999999999&perPage=99999999999999999999")
        .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["pagination"]["page"], u64::from(u32::MAX));
    assert_eq!(body["pagination"]["perPage"], 100);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_rejects_malformed_query() {
    let app = TestApp::new().await;
    let (status, _, body) = app.get("/api/v1/photos?page=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], true);
}

// ============================================================================
// Lookup and delete
// ============================================================================

#[tokio::test]
async fn test_invalid_and_unknown_ids() {
    let app = TestApp::new().await;

    let (status, _, body) = app.get("/api/v1/photos/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["reason"], "Invalid photo ID");

    let (status, _, body) = app.get(&format!("/api/v1/photos/{}", PhotoId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["reason"], "Photo not found");
}

#[tokio::test]
async fn test_delete_then_gone() {
    let app = TestApp::new().await;
    let (_, body) = app.upload("x.png", "image/png", &png(5, 5, 99)).await;
    let id = body["photo"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/photos/{id}");

    let (status, _, body) = app
        .send(Request::delete(uri.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app
        .send(Request::delete(uri.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
