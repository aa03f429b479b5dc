//! PhotoVault API client
//!
//! Typed HTTP client for the server's `/api/v1` surface. Handles URL
//! construction, multipart upload, JSON decoding and error mapping.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use photovault_client::PhotoApiClient;
//! use photovault_core::domain::ListQuery;
//!
//! # async fn example() -> Result<(), photovault_core::domain::PhotoError> {
//! let client = PhotoApiClient::new("http://192.168.1.1:8080")?;
//! let page = client.list(&ListQuery::default()).await?;
//! println!("{} photos on the server", page.pagination.total_items);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use photovault_core::config::ClientConfig;
use photovault_core::domain::{
    HealthStatus, ListQuery, Paginated, Photo, PhotoError, PhotoId, PhotoResult,
};
use photovault_core::ports::IPhotoApi;

use crate::error::{check, map_transport};

/// Path prefix of every API route
pub const API_PREFIX: &str = "/api/v1";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Response body of `POST /photos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub photo: Photo,
    pub message: String,
}

// ============================================================================
// PhotoApiClient
// ============================================================================

/// HTTP client for a PhotoVault server
#[derive(Debug, Clone)]
pub struct PhotoApiClient {
    client: Client,
    /// Server origin without trailing slash, e.g. `http://host:8080`
    base_url: String,
}

impl PhotoApiClient {
    /// Creates a client for `base_url` with the default timeout
    pub fn new(base_url: impl Into<String>) -> PhotoResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> PhotoResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PhotoError::InvalidRequest(format!("cannot build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Creates a client from the `client` config section
    pub fn from_config(config: &ClientConfig) -> PhotoResult<Self> {
        Self::with_timeout(
            config.server_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request builder for an API path such as `/photos`
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, path);
        self.client.request(method, url)
    }

    async fn send(&self, builder: RequestBuilder) -> PhotoResult<Response> {
        let response = builder.send().await.map_err(map_transport)?;
        check(response).await
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> PhotoResult<T> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(map_transport)
    }

    // ------------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------------

    /// `GET /photos`
    pub async fn list(&self, query: &ListQuery) -> PhotoResult<Paginated<Photo>> {
        debug!(page = query.page, per_page = query.per_page, "Listing photos");
        self.send_json(self.request(Method::GET, "/photos").query(&query.to_params()))
            .await
    }

    /// `GET /photos/{id}`
    pub async fn get(&self, id: &PhotoId) -> PhotoResult<Photo> {
        self.send_json(self.request(Method::GET, &format!("/photos/{id}")))
            .await
    }

    /// `GET /photos/{id}/download`, buffered in memory
    pub async fn download(&self, id: &PhotoId) -> PhotoResult<Vec<u8>> {
        self.fetch_bytes(&format!("/photos/{id}/download")).await
    }

    /// `GET /photos/{id}/thumbnail`
    pub async fn thumbnail(&self, id: &PhotoId) -> PhotoResult<Vec<u8>> {
        self.fetch_bytes(&format!("/photos/{id}/thumbnail")).await
    }

    /// Streams the original into `dest`, returning the number of bytes written
    ///
    /// The file appears at `dest` only once the whole body has arrived.
    pub async fn download_to(&self, id: &PhotoId, dest: &Path) -> PhotoResult<u64> {
        let response = self
            .send(self.request(Method::GET, &format!("/photos/{id}/download")))
            .await?;

        let mut tmp_name = dest.as_os_str().to_owned();
        tmp_name.push(".part");
        let tmp = Path::new(&tmp_name);

        let mut file = tokio::fs::File::create(tmp).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(tmp).await;
                    return Err(map_transport(e));
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(tmp, dest).await?;

        info!(photo_id = %id, bytes = written, dest = %dest.display(), "Photo downloaded");
        Ok(written)
    }

    /// `POST /photos` with a multipart `file` field
    pub async fn upload_photo(
        &self,
        filename: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> PhotoResult<UploadResponse> {
        let size = data.len();
        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| PhotoError::InvalidRequest(format!("invalid MIME type: {e}")))?;
        let form = Form::new().part("file", part);

        debug!(filename, mime_type, size, "Uploading photo");
        let response: UploadResponse = self
            .send_json(self.request(Method::POST, "/photos").multipart(form))
            .await?;
        info!(photo_id = %response.photo.id, filename, size, "Photo uploaded");
        Ok(response)
    }

    /// `DELETE /photos/{id}`
    pub async fn delete(&self, id: &PhotoId) -> PhotoResult<()> {
        let response = self
            .send(self.request(Method::DELETE, &format!("/photos/{id}")))
            .await?;
        if response.status() != StatusCode::NO_CONTENT {
            debug!(status = %response.status(), "Unexpected delete status");
        }
        info!(photo_id = %id, "Photo deleted");
        Ok(())
    }

    /// `GET /health`
    pub async fn health(&self) -> PhotoResult<HealthStatus> {
        self.send_json(self.request(Method::GET, "/health")).await
    }

    async fn fetch_bytes(&self, path: &str) -> PhotoResult<Vec<u8>> {
        let bytes = self
            .send(self.request(Method::GET, path))
            .await?
            .bytes()
            .await
            .map_err(map_transport)?;
        debug!(path, bytes = bytes.len(), "Fetched body");
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl IPhotoApi for PhotoApiClient {
    async fn upload(&self, filename: &str, mime_type: &str, data: Vec<u8>) -> PhotoResult<Photo> {
        self.upload_photo(filename, mime_type, data)
            .await
            .map(|response| response.photo)
    }

    async fn health(&self) -> PhotoResult<HealthStatus> {
        PhotoApiClient::health(self).await
    }
}
