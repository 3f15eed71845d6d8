//! Comment API endpoints.

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, COMMENTS_CACHE_CONTROL};
use crate::models::{PageQuery, iso_millis};
use crate::pipeline::{CommentService, RefreshMode, RefreshOutcome};

/// Raw query string of a comment read.
///
/// Values are kept as strings so a malformed one falls back to its default
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct CommentsParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl CommentsParams {
    pub fn page_query(&self) -> PageQuery {
        PageQuery::new(
            parse_or(self.offset.as_deref(), 0),
            parse_or(self.limit.as_deref(), PageQuery::DEFAULT_LIMIT),
        )
    }
}

fn parse_or(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Body of a successful manual refresh.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub ok: bool,
    #[serde(with = "iso_millis")]
    pub refreshed_at: DateTime<Utc>,
    pub total: usize,
}

/// GET /api/{resource}/comments - One page of cached comments.
pub async fn get_comments(
    State(service): State<CommentService>,
    Query(params): Query<CommentsParams>,
) -> Response {
    match service.comments(params.page_query()).await {
        Ok(page) => (
            [(header::CACHE_CONTROL, COMMENTS_CACHE_CONTROL)],
            Json(page),
        )
            .into_response(),
        Err(e) => {
            log::error!("Serving comments failed: {}", e);
            ApiError::NoData.into_response()
        }
    }
}

/// POST /api/{resource}/refresh - Force a refresh and wait for it.
pub async fn refresh_comments(State(service): State<CommentService>) -> Response {
    match service.refresh(RefreshMode::Forced).await {
        Ok(RefreshOutcome::Refreshed(summary)) => Json(RefreshResponse {
            ok: true,
            refreshed_at: summary.fetched_at,
            total: summary.total,
        })
        .into_response(),
        Ok(RefreshOutcome::Fresh) => match service.cache().current() {
            Some(payload) => Json(RefreshResponse {
                ok: true,
                refreshed_at: payload.fetched_at,
                total: payload.total,
            })
            .into_response(),
            None => ApiError::RefreshFailed.into_response(),
        },
        Err(e) => {
            log::error!("Manual refresh failed: {}", e);
            ApiError::RefreshFailed.into_response()
        }
    }
}
