//! AWS S3 storage implementation.
//!
//! The payload is stored as one object per question at
//! `{prefix}/{question_id}.json`. Each write sets the object's `Expires`
//! header to `now + ttl`, and reads ignore objects past that point.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::CommentsPayload;
use crate::storage::PayloadStore;

/// Default key prefix.
pub const DEFAULT_PREFIX: &str = "zhihu/comments";

/// S3-based payload storage.
pub struct S3Storage {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: &str, question_id: &str) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: object_key(prefix, question_id),
        }
    }

    /// Create S3 storage from environment configuration.
    ///
    /// Reads `ZHIHU_S3_BUCKET` (required) and `ZHIHU_S3_PREFIX`.
    pub async fn from_env(question_id: &str) -> Result<Self> {
        let bucket = std::env::var("ZHIHU_S3_BUCKET")
            .map_err(|_| AppError::config("ZHIHU_S3_BUCKET is not set"))?;
        let prefix =
            std::env::var("ZHIHU_S3_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());

        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Ok(Self::new(Client::new(&config), bucket, &prefix, question_id))
    }
}

#[async_trait]
impl PayloadStore for S3Storage {
    async fn load(&self) -> Result<Option<CommentsPayload>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No existing payload at {}", self.location());
                    return Ok(None);
                }
                return Err(AppError::storage(service_err));
            }
        };

        #[allow(deprecated)]
        let expired = output
            .expires()
            .is_some_and(|at| at.secs() <= Utc::now().timestamp());
        if expired {
            log::info!("Payload at {} has expired", self.location());
            return Ok(None);
        }

        let bytes = output.body.collect().await.map_err(AppError::storage)?;
        Ok(Some(serde_json::from_slice(&bytes.into_bytes())?))
    }

    async fn save(&self, payload: &CommentsPayload, ttl: Duration) -> Result<()> {
        let json = serde_json::to_vec(payload)?;
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(ByteStream::from(json))
            .content_type("application/json")
            .expires(DateTime::from_secs(expires))
            .send()
            .await
            .map_err(|e| AppError::storage(e.into_service_error()))?;

        log::info!("Wrote {} comments to {}", payload.total, self.location());
        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

fn object_key(prefix: &str, question_id: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{question_id}.json")
    } else {
        format!("{prefix}/{question_id}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key(DEFAULT_PREFIX, "800718032"), "zhihu/comments/800718032.json");
        assert_eq!(object_key("/cache/", "1"), "cache/1.json");
        assert_eq!(object_key("", "1"), "1.json");
    }
}
