//! In-process key/value storage with per-entry expiry.
//!
//! Stands in for a hosted KV store: entries are stored serialized and
//! disappear once their TTL has elapsed.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::CommentsPayload;
use crate::storage::PayloadStore;

/// Default key the payload is stored under.
pub const DEFAULT_KEY: &str = "zhihu:comments";

struct Entry {
    json: String,
    expires_at: Option<Instant>,
}

/// Memory-backed storage.
pub struct MemoryStorage {
    key: String,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayloadStore for MemoryStorage {
    async fn load(&self) -> Result<Option<CommentsPayload>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = entries
            .get(&self.key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| Instant::now() >= at);
        if expired {
            entries.remove(&self.key);
            return Ok(None);
        }
        match entries.get(&self.key) {
            Some(entry) => Ok(Some(serde_json::from_str(&entry.json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, payload: &CommentsPayload, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(payload)?;
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key.clone(), Entry { json, expires_at });
        Ok(())
    }

    fn location(&self) -> String {
        format!("memory://{}", self.key)
    }
}
