//! HTTP API.
//!
//! ```text
//! GET  /api/{resource}/comments?offset=&limit=   one page of comments
//! POST /api/{resource}/refresh                   force a refresh
//! GET  /health                                   liveness
//! ```
//!
//! Anything else, including a known path with the wrong method, is a 404.

mod comments;

pub use comments::*;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::pipeline::CommentService;

/// `Cache-Control` sent with successful comment reads.
pub const COMMENTS_CACHE_CONTROL: &str = "public, max-age=120";

/// Build the application router.
pub fn create_router(service: CommentService, resource: &str) -> Router {
    let resource = resource.trim_matches('/');
    Router::new()
        .route(
            &format!("/api/{resource}/comments"),
            get(get_comments).fallback(not_found),
        )
        .route(
            &format!("/api/{resource}/refresh"),
            post(refresh_comments).fallback(not_found),
        )
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Error body: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors the API reports to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Nothing cached and the fetch failed
    NoData,
    /// A forced refresh failed
    RefreshFailed,
    NotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoData => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RefreshFailed => StatusCode::BAD_GATEWAY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ApiError::NoData => "暂时没有缓存的知乎数据，请稍后再试。",
            ApiError::RefreshFailed => "刷新知乎数据失败，请稍后重试。",
            ApiError::NotFound => "Not Found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
