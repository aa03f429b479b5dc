//! Multipart upload and its error mapping

use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, Request, ResponseTemplate};

use photovault_client::PhotoApiClient;
use photovault_core::domain::{PhotoError, PhotoId};
use photovault_core::ports::IPhotoApi;

use crate::common::{mount_error, photo_json, setup};

fn body_contains(request: &Request, needle: &str) -> bool {
    request
        .body
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[tokio::test]
async fn test_upload_sends_multipart_file_field() {
    let (server, client) = setup().await;
    let id = PhotoId::new();

    Mock::given(method("POST"))
        .and(path("/api/v1/photos"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "photo": photo_json(id, "beach.jpg"),
            "message": "Photo uploaded successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client
        .upload_photo("beach.jpg", "image/jpeg", b"jpeg bytes".to_vec())
        .await
        .unwrap();
    assert_eq!(response.photo.id, id);
    assert_eq!(response.message, "Photo uploaded successfully");

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert!(body_contains(request, "name=\"file\""));
    assert!(body_contains(request, "filename=\"beach.jpg\""));
    assert!(body_contains(request, "image/jpeg"));
    assert!(body_contains(request, "jpeg bytes"));
}

#[tokio::test]
async fn test_duplicate_carries_existing_id() {
    let (server, client) = setup().await;
    let existing = PhotoId::new();
    mount_error(
        &server,
        "POST",
        "/api/v1/photos",
        409,
        &format!("Photo already exists with id: {existing}"),
    )
    .await;

    let err = client
        .upload("a.jpg", "image/jpeg", b"x".to_vec())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PhotoError::Duplicate {
            existing_id: Some(existing)
        }
    );
    assert!(err.is_duplicate());
}

#[tokio::test]
async fn test_rejected_type_is_invalid_request() {
    let (server, client) = setup().await;
    mount_error(
        &server,
        "POST",
        "/api/v1/photos",
        400,
        "Invalid file type. Allowed types: image/jpeg, image/png, image/heic, image/heif, image/webp",
    )
    .await;

    let err = client
        .upload("doc.gif", "image/gif", b"GIF89a".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, PhotoError::InvalidRequest(reason) if reason.starts_with("Invalid file type")));
}

#[tokio::test]
async fn test_server_failure_is_transient() {
    let (server, client) = setup().await;
    mount_error(&server, "POST", "/api/v1/photos", 500, "Storage error: disk full").await;

    let err = client
        .upload("a.jpg", "image/jpeg", b"x".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, PhotoError::Server { status: 500, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_server_is_network_unavailable() {
    // Nothing listens on port 1
    let client = PhotoApiClient::new("http://127.0.0.1:1").unwrap();

    let err = client
        .upload("a.jpg", "image/jpeg", b"x".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, PhotoError::NetworkUnavailable(_)));
}

#[tokio::test]
async fn test_slow_server_times_out_as_network_unavailable() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client =
        PhotoApiClient::with_timeout(server.uri(), std::time::Duration::from_millis(100)).unwrap();
    let err = client.health().await.unwrap_err();
    assert!(matches!(err, PhotoError::NetworkUnavailable(_)));
}
