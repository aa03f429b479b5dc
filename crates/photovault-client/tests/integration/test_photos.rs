//! Listing, metadata, download and delete

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use photovault_core::domain::{ListQuery, PhotoError, PhotoId, SortField, SortOrder};

use crate::common::{error_json, mount_error, photo_json, setup};

#[tokio::test]
async fn test_list_sends_query_and_decodes_page() {
    let (server, client) = setup().await;
    let first = PhotoId::new();

    Mock::given(method("GET"))
        .and(path("/api/v1/photos"))
        .and(query_param("page", "2"))
        .and(query_param("perPage", "10"))
        .and(query_param("sortBy", "size"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [photo_json(first, "a.jpg")],
            "pagination": {
                "page": 2,
                "perPage": 10,
                "totalItems": 11,
                "totalPages": 2,
                "hasNextPage": false,
                "hasPrevPage": true
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery {
        page: 2,
        per_page: 10,
        sort_by: SortField::Size,
        order: SortOrder::Asc,
        ..ListQuery::default()
    };
    let page = client.list(&query).await.unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, first);
    assert_eq!(page.data[0].width, Some(640));
    assert_eq!(page.pagination.total_items, 11);
    assert!(page.pagination.has_prev_page);
}

#[tokio::test]
async fn test_get_decodes_photo() {
    let (server, client) = setup().await;
    let id = PhotoId::new();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/photos/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(photo_json(id, "IMG_0001.JPG")))
        .mount(&server)
        .await;

    let photo = client.get(&id).await.unwrap();
    assert_eq!(photo.filename, "IMG_0001.JPG");
    assert_eq!(photo.mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_get_missing_photo_is_not_found() {
    let (server, client) = setup().await;
    let id = PhotoId::new();
    mount_error(&server, "GET", &format!("/api/v1/photos/{id}"), 404, "Photo not found").await;

    let err = client.get(&id).await.unwrap_err();
    assert_eq!(err, PhotoError::NotFound("Photo not found".into()));
}

#[tokio::test]
async fn test_download_to_writes_file() {
    let (server, client) = setup().await;
    let id = PhotoId::new();
    let body = vec![7u8; 64 * 1024];

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/photos/{id}/download")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.clone())
                .append_header("Content-Type", "image/jpeg"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("photo.jpg");
    let written = client.download_to(&id, &dest).await.unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert!(!dir.path().join("photo.jpg.part").exists());
}

#[tokio::test]
async fn test_download_error_leaves_no_file() {
    let (server, client) = setup().await;
    let id = PhotoId::new();
    mount_error(
        &server,
        "GET",
        &format!("/api/v1/photos/{id}/download"),
        500,
        "Storage error: original missing",
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("photo.jpg");
    let err = client.download_to(&id, &dest).await.unwrap_err();

    assert!(matches!(err, PhotoError::Server { status: 500, .. }));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_thumbnail_returns_bytes() {
    let (server, client) = setup().await;
    let id = PhotoId::new();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/photos/{id}/thumbnail")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .mount(&server)
        .await;

    assert_eq!(client.thumbnail(&id).await.unwrap(), vec![0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn test_delete_expects_no_content() {
    let (server, client) = setup().await;
    let id = PhotoId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/photos/{id}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete(&id).await.unwrap();
}

#[tokio::test]
async fn test_bad_id_is_invalid_request() {
    let (server, client) = setup().await;
    let id = PhotoId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/photos/{id}")))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_json("Invalid photo ID")))
        .mount(&server)
        .await;

    let err = client.delete(&id).await.unwrap_err();
    assert_eq!(err, PhotoError::InvalidRequest("Invalid photo ID".into()));
}

#[tokio::test]
async fn test_plain_text_error_body_becomes_reason() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/photos"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.list(&ListQuery::default()).await.unwrap_err();
    assert_eq!(
        err,
        PhotoError::Server {
            status: 502,
            reason: "bad gateway".into()
        }
    );
    assert!(err.is_transient());
}
