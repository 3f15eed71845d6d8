// src/pipeline/service.rs

//! The comment service: serves reads from the cache and keeps it fresh.
//!
//! Reads never wait on upstream unless nothing has ever been cached. A stale
//! cache is served as-is while a background refresh replaces it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::task::TaskTracker;

use crate::error::{AppError, Result};
use crate::models::{CommentsPage, CommentsPayload, FeedConfig, PageQuery};
use crate::pipeline::refresh::{RefreshState, RefreshSummary, SharedResult, SingleFlight};
use crate::services::{FeedSource, Normalizer};
use crate::storage::{CommentCache, PayloadStore};

/// Longest slack the periodic loop allows when deciding a payload is due.
const SCHEDULE_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Always fetch, joining a refresh already in flight
    Forced,
    /// Fetch only when the cached payload is older than the refresh interval
    Opportunistic,
    /// Like `Opportunistic`, with a little slack so a timer firing once per
    /// interval does not skip every other cycle
    Scheduled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(RefreshSummary),
    /// The cache was fresh enough, nothing was fetched
    Fresh,
}

struct Inner {
    config: Arc<FeedConfig>,
    source: Arc<dyn FeedSource>,
    normalizer: Normalizer,
    cache: CommentCache,
    flight: Arc<SingleFlight>,
    tasks: TaskTracker,
}

/// Cheaply cloneable handle shared by the HTTP layer and the scheduler.
#[derive(Clone)]
pub struct CommentService {
    inner: Arc<Inner>,
}

impl CommentService {
    pub fn new(
        config: Arc<FeedConfig>,
        source: Arc<dyn FeedSource>,
        store: Arc<dyn PayloadStore>,
    ) -> Self {
        let cache = CommentCache::new(store, config.cache_ttl());
        let normalizer = Normalizer::new(config.question_id.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                source,
                normalizer,
                cache,
                flight: Arc::new(SingleFlight::new()),
                tasks: TaskTracker::new(),
            }),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &CommentCache {
        &self.inner.cache
    }

    pub fn state(&self) -> RefreshState {
        self.inner.flight.state()
    }

    /// Load the durable copy, then start a refresh in the background.
    pub async fn init(&self) {
        self.inner.cache.warm().await;
        self.refresh_in_background(RefreshMode::Forced);
    }

    /// Refresh according to `mode`.
    pub async fn refresh(&self, mode: RefreshMode) -> SharedResult<RefreshOutcome> {
        if let Some(max_age) = self.max_age(mode) {
            if let Some(payload) = self.inner.cache.read().await {
                if !payload.is_stale(Utc::now(), max_age) {
                    log::debug!("Cache is fresh (fetched at {}), skipping refresh", payload.fetched_at);
                    return Ok(RefreshOutcome::Fresh);
                }
            }
        }

        match mode {
            RefreshMode::Forced => log::info!("Refresh requested"),
            _ => log::info!("Cache is stale, refreshing"),
        }

        let inner = Arc::clone(&self.inner);
        let summary = self
            .inner
            .flight
            .run(move || async move { run_refresh(inner).await.map_err(Arc::new) })
            .await?;
        Ok(RefreshOutcome::Refreshed(summary))
    }

    /// Start a refresh nobody waits for. Failures are logged.
    pub fn refresh_in_background(&self, mode: RefreshMode) {
        let service = self.clone();
        self.inner.tasks.spawn(async move {
            if let Err(e) = service.refresh(mode).await {
                log::error!("Background refresh failed: {}", e);
            }
        });
    }

    /// One page of comments.
    ///
    /// Fails with [`AppError::NoData`] only when nothing is cached and the
    /// blocking refresh did not produce anything either.
    pub async fn comments(&self, query: PageQuery) -> Result<CommentsPage> {
        let payload = match self.inner.cache.read().await {
            Some(payload) => {
                if self.is_stale(&payload) {
                    self.refresh_in_background(RefreshMode::Opportunistic);
                }
                payload
            }
            None => {
                log::info!("No cached comments, fetching before responding");
                if let Err(e) = self.refresh(RefreshMode::Forced).await {
                    log::error!("Initial fetch failed: {}", e);
                }
                self.inner.cache.read().await.ok_or(AppError::NoData)?
            }
        };
        Ok(payload.page(query))
    }

    /// Wait for background refreshes to finish.
    pub async fn shutdown(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
    }

    fn is_stale(&self, payload: &CommentsPayload) -> bool {
        self.max_age(RefreshMode::Opportunistic)
            .is_some_and(|max_age| payload.is_stale(Utc::now(), max_age))
    }

    fn max_age(&self, mode: RefreshMode) -> Option<chrono::Duration> {
        let interval = self.inner.config.refresh_interval();
        let age = match mode {
            RefreshMode::Forced => return None,
            RefreshMode::Opportunistic => interval,
            RefreshMode::Scheduled => interval.saturating_sub(SCHEDULE_SLACK.min(interval / 4)),
        };
        chrono::Duration::from_std(age).ok()
    }
}

async fn run_refresh(inner: Arc<Inner>) -> Result<RefreshSummary> {
    let started = std::time::Instant::now();
    let feed = inner.source.fetch_all().await?;
    let payload = inner.normalizer.normalize(&feed);
    let (_, meta) = inner.cache.write(payload).await;

    log::info!(
        "Refreshed {} comments in {:.1}s",
        meta.total,
        started.elapsed().as_secs_f64()
    );
    Ok(RefreshSummary {
        fetched_at: meta.fetched_at,
        total: meta.total,
        persisted: meta.persisted,
    })
}
