//! Local filesystem storage implementation.
//!
//! Keeps a single pretty-printed JSON file under the data directory. Writes
//! go to a temp file first and are renamed into place, so a crash mid-write
//! never leaves a truncated payload behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CommentsPayload;
use crate::storage::PayloadStore;

/// File name of the persisted payload.
pub const PAYLOAD_FILE: &str = "zhihu-comments.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Full path of the payload file.
    pub fn payload_path(&self) -> PathBuf {
        self.root_dir.join(PAYLOAD_FILE)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl PayloadStore for LocalStorage {
    async fn load(&self) -> Result<Option<CommentsPayload>> {
        let path = self.payload_path();
        match self.read_bytes(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => {
                log::debug!("No payload found at {}", path.display());
                Ok(None)
            }
        }
    }

    async fn save(&self, payload: &CommentsPayload, _ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(payload)?;
        self.write_bytes(&self.payload_path(), &bytes).await?;
        log::debug!(
            "Wrote {} comments to {}",
            payload.total,
            self.payload_path().display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.payload_path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn payload() -> CommentsPayload {
        let question = Question {
            id: "1".into(),
            title: "t".into(),
            url: "https://www.zhihu.com/question/1".into(),
        };
        CommentsPayload::new(
            question,
            Vec::new(),
            Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"));

        storage.save(&payload(), Duration::ZERO).await.unwrap();
        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, payload());
        assert!(!storage.payload_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        tokio::fs::write(storage.payload_path(), b"{not json").await.unwrap();

        assert!(matches!(storage.load().await, Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn test_file_uses_wire_field_names() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.save(&payload(), Duration::ZERO).await.unwrap();

        let raw = tokio::fs::read_to_string(storage.payload_path()).await.unwrap();
        assert!(raw.contains("\"fetchedAt\": \"2025-01-01T08:00:00.000Z\""));
    }
}
