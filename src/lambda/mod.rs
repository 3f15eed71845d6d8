// src/lambda/mod.rs

//! AWS Lambda handler for the comments API.
//!
//! Each invocation carries one HTTP request. It is replayed through the same
//! router the server uses, so routes, status codes and headers match exactly.
//! The payload is kept in S3 when `ZHIHU_S3_BUCKET` is set and in instance
//! memory otherwise. There is no refresh timer here: the first read on a
//! cold instance fetches, and stale reads refresh in the background.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tracing::{error, info, instrument};

use crate::api;
use crate::config;
use crate::error::{AppError, Result};
use crate::models::{FeedConfig, ServerConfig};
use crate::pipeline::CommentService;
use crate::services::FeedFetcher;
use crate::storage::{MemoryStorage, PayloadStore, S3Storage};

/// Lambda invocation payload: an HTTP request.
///
/// Accepts both the API Gateway REST shape (`httpMethod`, `path`,
/// `queryStringParameters`) and a minimal `method`/`path`/`query` shape.
#[derive(Debug, Default, Deserialize)]
pub struct HttpEvent {
    #[serde(default, alias = "httpMethod")]
    pub method: Option<String>,

    #[serde(default, alias = "rawPath")]
    pub path: Option<String>,

    #[serde(default, alias = "queryStringParameters")]
    pub query: Option<HashMap<String, String>>,
}

impl HttpEvent {
    /// Rebuild the HTTP request this event describes.
    pub fn to_request(&self) -> Result<Request<Body>> {
        let method = match self.method.as_deref() {
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|e| AppError::config(format!("Invalid method {m:?}: {e}")))?,
            None => Method::GET,
        };

        let path = self.path.as_deref().unwrap_or("/");
        let mut uri = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if let Some(query) = self.query.as_ref().filter(|q| !q.is_empty()) {
            let mut pairs: Vec<_> = query.iter().collect();
            pairs.sort();
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            uri.push('?');
            uri.push_str(&encoded);
        }

        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| AppError::config(format!("Invalid request: {e}")))
    }
}

/// Lambda response payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Build the router used for every invocation of this instance.
pub async fn build_router() -> Result<Router> {
    let server = ServerConfig::from_env()?;
    let config = config::load_all(&server.data_dir, FeedConfig::serverless_defaults());
    config.validate()?;
    let config = Arc::new(config);

    let store: Arc<dyn PayloadStore> = if std::env::var_os("ZHIHU_S3_BUCKET").is_some() {
        Arc::new(S3Storage::from_env(&config.question_id).await?)
    } else {
        info!("ZHIHU_S3_BUCKET not set, keeping comments in instance memory");
        Arc::new(MemoryStorage::new())
    };
    info!("Comment store: {}", store.location());

    let fetcher = Arc::new(FeedFetcher::new(Arc::clone(&config))?);
    let service = CommentService::new(config, fetcher, store);
    Ok(api::create_router(service, &server.resource))
}

/// Run one event through the router.
pub async fn dispatch(router: Router, event: &HttpEvent) -> Result<HttpResponse> {
    let request = event.to_request()?;
    let response = match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::Task(format!("failed to read response body: {e}")))?;

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(HttpResponse {
        status_code: parts.status.as_u16(),
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Main Lambda handler function.
#[instrument(skip(router, event))]
pub async fn handler(
    router: Router,
    event: LambdaEvent<HttpEvent>,
) -> std::result::Result<HttpResponse, LambdaError> {
    let (request, _context) = event.into_parts();
    info!(
        "Handling {} {}",
        request.method.as_deref().unwrap_or("GET"),
        request.path.as_deref().unwrap_or("/")
    );

    match dispatch(router, &request).await {
        Ok(response) => {
            info!("Responded {}", response.status_code);
            Ok(response)
        }
        Err(e) => {
            error!("Dispatch failed: {}", e);
            Err(e.into())
        }
    }
}
