//! HTTP API served under `/api/v1`
//!
//! | Method | Path                          | Handler                  |
//! |--------|-------------------------------|--------------------------|
//! | GET    | `/photos`                     | [`handlers::list_photos`]    |
//! | POST   | `/photos`                     | [`handlers::upload_photo`]   |
//! | GET    | `/photos/:id`                 | [`handlers::get_photo`]      |
//! | DELETE | `/photos/:id`                 | [`handlers::delete_photo`]   |
//! | GET    | `/photos/:id/download`        | [`handlers::download_photo`] |
//! | GET    | `/photos/:id/thumbnail`       | [`handlers::get_thumbnail`]  |
//! | GET    | `/health`                     | [`handlers::health`]         |

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::storage::PhotoStorageEngine;

pub use error::{ApiError, ErrorBody};

/// Path prefix of every route
pub const API_PREFIX: &str = "/api/v1";

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PhotoStorageEngine>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<PhotoStorageEngine>, max_upload_bytes: usize) -> Self {
        Self {
            engine,
            max_upload_bytes,
        }
    }
}

/// Builds the full application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .route(
            "/photos",
            get(handlers::list_photos).post(handlers::upload_photo),
        )
        .route(
            "/photos/:id",
            get(handlers::get_photo).delete(handlers::delete_photo),
        )
        .route("/photos/:id/download", get(handlers::download_photo))
        .route("/photos/:id/thumbnail", get(handlers::get_thumbnail))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
}
