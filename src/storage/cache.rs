//! Two-tier comment cache: an in-process copy in front of a durable store.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::models::CommentsPayload;
use crate::storage::{PayloadStore, WriteMetadata};

pub struct CommentCache {
    memory: RwLock<Option<Arc<CommentsPayload>>>,
    store: Arc<dyn PayloadStore>,
    ttl: Duration,
}

impl CommentCache {
    /// `ttl` is passed to the durable store on every write.
    pub fn new(store: Arc<dyn PayloadStore>, ttl: Duration) -> Self {
        Self {
            memory: RwLock::new(None),
            store,
            ttl,
        }
    }

    /// The in-process copy, without touching the durable store.
    pub fn current(&self) -> Option<Arc<CommentsPayload>> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Memory first, then the durable store.
    ///
    /// A payload loaded from the store is kept in memory. Store errors are
    /// logged and read as a miss.
    pub async fn read(&self) -> Option<Arc<CommentsPayload>> {
        if let Some(payload) = self.current() {
            return Some(payload);
        }

        let loaded = match self.store.load().await {
            Ok(loaded) => loaded?,
            Err(e) => {
                log::warn!("Failed to load cached comments from {}: {}", self.store.location(), e);
                return None;
            }
        };

        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        // A refresh may have landed while the store was being read.
        let payload = memory.get_or_insert_with(|| Arc::new(loaded));
        Some(Arc::clone(payload))
    }

    /// Load the durable copy into memory, if there is one.
    pub async fn warm(&self) -> Option<Arc<CommentsPayload>> {
        let payload = self.read().await;
        match &payload {
            Some(p) => log::info!(
                "Loaded {} cached comments from {} (fetched at {})",
                p.total,
                self.store.location(),
                p.fetched_at
            ),
            None => log::info!("No cached comments at {}", self.store.location()),
        }
        payload
    }

    /// Replace the cached payload.
    ///
    /// Memory is always updated. `fetched_at` never moves backwards. A failed
    /// durable write is logged and reported through `persisted`.
    pub async fn write(&self, mut payload: CommentsPayload) -> (Arc<CommentsPayload>, WriteMetadata) {
        let payload = {
            let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = memory.as_ref() {
                payload.fetched_at = payload.fetched_at.max(previous.fetched_at);
            }
            let payload = Arc::new(payload);
            *memory = Some(Arc::clone(&payload));
            payload
        };

        let persisted = match self.store.save(&payload, self.ttl).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist comments to {}: {}", self.store.location(), e);
                false
            }
        };

        let metadata = WriteMetadata {
            total: payload.total,
            fetched_at: payload.fetched_at,
            persisted,
            location: self.store.location(),
        };
        (payload, metadata)
    }

    pub fn location(&self) -> String {
        self.store.location()
    }
}
