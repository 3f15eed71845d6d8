//! Storage abstractions for the comment payload.
//!
//! The payload lives in two tiers:
//! - Hot: the in-process copy held by [`CommentCache`]
//! - Durable: one serialized payload in a [`PayloadStore`], so a restart or
//!   a fresh serverless instance can serve data before its first fetch
//!
//! ## Backends
//!
//! ```text
//! LocalStorage   {data_dir}/zhihu-comments.json     (server)
//! MemoryStorage  key -> payload, with expiry         (tests, single instance)
//! S3Storage      s3://{bucket}/{prefix}/{qid}.json  (serverless, feature "s3")
//! ```

pub mod cache;
pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::CommentsPayload;

// Re-export for convenience
pub use cache::CommentCache;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Metadata about a cache write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of comments written
    pub total: usize,
    /// `fetched_at` of the stored payload
    pub fetched_at: DateTime<Utc>,
    /// Whether the durable copy was written too
    pub persisted: bool,
    /// Where the durable copy lives
    pub location: String,
}

/// Trait for durable payload backends.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Load the stored payload. `Ok(None)` when nothing is stored or it expired.
    async fn load(&self) -> Result<Option<CommentsPayload>>;

    /// Replace the stored payload. Backends that support expiry drop it after `ttl`.
    async fn save(&self, payload: &CommentsPayload, ttl: Duration) -> Result<()>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}
