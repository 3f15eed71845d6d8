// src/pipeline/refresh.rs

//! Single-flight coordination for refreshes.
//!
//! At most one refresh runs at a time. A caller that arrives while one is in
//! flight awaits the same result instead of starting another. The refresh
//! itself runs on its own task, so it completes even if every caller stops
//! waiting.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::AppError;

/// Result shared by every caller of one refresh.
pub type SharedResult<T> = std::result::Result<T, Arc<AppError>>;

/// What a completed refresh produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub fetched_at: DateTime<Utc>,
    pub total: usize,
    /// Whether the durable copy was written
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type Flight = Shared<BoxFuture<'static, SharedResult<RefreshSummary>>>;

/// Holds the in-flight refresh, if any.
#[derive(Default)]
pub struct SingleFlight {
    slot: Mutex<Option<(u64, Flight)>>,
    next_id: AtomicU64,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RefreshState {
        match *self.lock() {
            Some(_) => RefreshState::Refreshing,
            None => RefreshState::Idle,
        }
    }

    /// Join the refresh in flight, or start `work` as the new one.
    ///
    /// `work` is only called when nothing is in flight.
    pub async fn run<F, Fut>(self: &Arc<Self>, work: F) -> SharedResult<RefreshSummary>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SharedResult<RefreshSummary>> + Send + 'static,
    {
        let flight = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some((id, flight)) => {
                    log::info!("Refresh #{} already in progress, joining it", id);
                    flight.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let guard = FlightGuard {
                        owner: Arc::clone(self),
                        id,
                    };
                    let work = work();
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        work.await
                    });
                    let flight = async move {
                        handle.await.unwrap_or_else(|e| {
                            Err(Arc::new(AppError::Task(format!("refresh task failed: {e}"))))
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, flight.clone()));
                    flight
                }
            }
        };
        flight.await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(u64, Flight)>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the slot when the refresh task ends, including by panic.
struct FlightGuard {
    owner: Arc<SingleFlight>,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut slot = self.owner.lock();
        if slot.as_ref().is_some_and(|(id, _)| *id == self.id) {
            *slot = None;
        }
    }
}
