// src/services/feed.rs

//! Feed fetcher service.
//!
//! Pages through the question feed by following upstream's opaque `next`
//! cursor, one page at a time, sleeping between pages.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Endpoint, FeedConfig, RawFeedPage};
use crate::utils::http::{build_headers, create_async_client};

/// Anything that can produce the aggregated raw feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every page the pagination policy allows, concatenated in order.
    async fn fetch_all(&self) -> Result<RawFeedPage>;
}

/// Why pagination stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No paging block, `is_end`, or no cursor
    EndOfFeed,
    /// Upstream wants a logged-in session to go further
    LoginRequired,
    /// `max_pages` reached
    PageCap,
}

/// Service for fetching the answer feed of one question.
pub struct FeedFetcher {
    config: Arc<FeedConfig>,
    client: Client,
    headers: HeaderMap,
}

impl FeedFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: Arc<FeedConfig>) -> Result<Self> {
        let client = create_async_client(&config)?;
        Self::with_client(config, client)
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(config: Arc<FeedConfig>, client: Client) -> Result<Self> {
        let headers = build_headers(&config)?;
        Ok(Self {
            config,
            client,
            headers,
        })
    }

    /// URL of the first page; later pages come from the cursor.
    pub fn first_page_url(&self) -> Result<String> {
        let mut url = url::Url::parse(&self.config.endpoint_url())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("include", &self.config.include);
            query.append_pair("limit", &self.config.page_size.to_string());
            query.append_pair("offset", "0");
            query.append_pair("platform", "desktop");
            if self.config.endpoint == Endpoint::Answers {
                query.append_pair("sort_by", &self.config.sort_by);
            }
        }
        Ok(url.into())
    }

    /// Fetch and decode a single page.
    async fn fetch_page(&self, url: &str) -> Result<RawFeedPage> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<Value>(&body);
        if let Ok(value) = &parsed {
            if let Some(message) = error_message(value) {
                return Err(AppError::upstream(message));
            }
        }
        if !status.is_success() {
            return Err(AppError::upstream_status(status));
        }

        Ok(serde_json::from_value(parsed?)?)
    }

    fn log_first_page(&self, url: &str, page: &RawFeedPage) {
        if let Some(paging) = &page.paging {
            log::info!(
                "First page paging info: totals={}, is_end={}, need_force_login={}, has_next={}",
                paging
                    .totals
                    .map_or_else(|| "n/a".to_string(), |t| t.to_string()),
                paging
                    .is_end
                    .map_or_else(|| "n/a".to_string(), |b| b.to_string()),
                paging.needs_login(),
                paging.next_cursor().is_some(),
            );
        }
        if page.data.len() < self.config.page_size as usize {
            log::warn!(
                "First page returned {} items (requested {}), API may be limiting access",
                page.data.len(),
                self.config.page_size
            );
        }
        log::debug!("First page url: {}", url);
        let names: Vec<&str> = self.headers.keys().map(|k| k.as_str()).collect();
        log::debug!("Request headers used: {}", names.join(", "));
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch_all(&self) -> Result<RawFeedPage> {
        let mut aggregated = RawFeedPage::default();
        let mut cursor: Option<String> = None;
        let mut pages: u32 = 0;
        let mut reported_total = false;

        let reason = loop {
            let url = match &cursor {
                Some(next) => next.clone(),
                None => self.first_page_url()?,
            };
            log::info!(
                "Fetching page {}{}",
                pages + 1,
                if cursor.is_some() { " via cursor" } else { "" }
            );

            let page = self.fetch_page(&url).await?;
            if pages == 0 {
                self.log_first_page(&url, &page);
            }
            pages += 1;

            let RawFeedPage { data, paging } = page;
            if !reported_total {
                if let Some(total) = paging.as_ref().and_then(|p| p.totals) {
                    log::info!("Upstream reports {} answers in total", total);
                    reported_total = true;
                }
            }

            let count = data.len();
            aggregated.data.extend(data);
            log::info!(
                "Page {} returned {} items (accumulated {})",
                pages,
                count,
                aggregated.data.len()
            );

            let next = match &paging {
                None => None,
                Some(p) if p.is_end() => None,
                Some(p) => p.next_cursor().map(str::to_string),
            };
            let needs_login = paging.as_ref().is_some_and(|p| p.needs_login());
            aggregated.paging = paging;

            let Some(next) = next else {
                if needs_login {
                    log::warn!("Paging requires login, stopped fetching further pages");
                }
                break StopReason::EndOfFeed;
            };
            if needs_login {
                log::warn!("Paging requires login, stopped fetching further pages");
                break StopReason::LoginRequired;
            }
            if self.config.max_pages.is_some_and(|max| pages >= max) {
                break StopReason::PageCap;
            }

            cursor = Some(next);
            let delay = self.config.page_delay();
            if !delay.is_zero() {
                log::debug!("Waiting {}ms before the next page", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
        };

        log::info!(
            "Fetched {} items over {} pages ({:?})",
            aggregated.data.len(),
            pages,
            reason
        );
        Ok(aggregated)
    }
}

/// Message of an error envelope, if `value` is one.
///
/// Any non-null `error` member counts. The message is taken from a string
/// `error`, or from `error.message`, falling back to the code.
fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error").filter(|e| !e.is_null())?;
    let text = match error {
        Value::String(s) => Some(s.as_str()),
        _ => error.get("message").and_then(Value::as_str),
    };
    let message = match text.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.to_string(),
        None => match error.get("code").filter(|c| !c.is_null()) {
            Some(Value::String(code)) => format!("error code {code}"),
            Some(code) => format!("error code {code}"),
            None => "unknown error".to_string(),
        },
    };
    Some(message)
}
