//! Shared helpers for client integration tests
//!
//! Each helper mounts one endpoint on a wiremock server. Tests start a
//! server with [`setup`] and mount only what they exercise.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use photovault_client::PhotoApiClient;
use photovault_core::domain::PhotoId;

/// Starts a mock server and a client pointed at it
pub async fn setup() -> (MockServer, PhotoApiClient) {
    let server = MockServer::start().await;
    let client = PhotoApiClient::new(server.uri()).unwrap();
    (server, client)
}

/// JSON for a photo as the server serializes it
pub fn photo_json(id: PhotoId, filename: &str) -> Value {
    json!({
        "id": id.to_string(),
        "filename": filename,
        "mimeType": "image/jpeg",
        "size": 2048,
        "width": 640,
        "height": 480,
        "createdAt": "2024-05-01T10:00:00Z",
        "takenAt": null,
        "checksum": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    })
}

/// Error body as the server serializes it
pub fn error_json(reason: &str) -> Value {
    json!({ "error": true, "reason": reason })
}

/// Mounts `GET /api/v1/health`
pub async fn mount_health(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": status,
            "version": "0.1.0",
            "storageAvailable": status == "healthy"
        })))
        .mount(server)
        .await;
}

/// Mounts an error response for any request to `route`
pub async fn mount_error(server: &MockServer, http_method: &str, route: &str, status: u16, reason: &str) {
    Mock::given(method(http_method))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(error_json(reason)))
        .mount(server)
        .await;
}
