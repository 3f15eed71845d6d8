// src/error.rs

//! Unified error handling for the comment pipeline.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Upstream answered with an error envelope
    #[error("Zhihu API error: {0}")]
    Upstream(String),

    /// Upstream answered with a non-success status
    #[error("Zhihu API error: {status} {reason}")]
    UpstreamStatus { status: u16, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Nothing cached and nothing could be fetched
    #[error("No data available")]
    NoData,

    /// A background task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),

    /// Error produced by a refresh that several callers awaited
    #[error(transparent)]
    Shared(#[from] Arc<AppError>),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create an upstream error from an error-envelope message.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create an upstream error from an HTTP status.
    pub fn upstream_status(status: reqwest::StatusCode) -> Self {
        Self::UpstreamStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Whether the error originated at the upstream boundary.
    pub fn is_upstream(&self) -> bool {
        match self {
            Self::Http(_) | Self::Upstream(_) | Self::UpstreamStatus { .. } => true,
            Self::Shared(inner) => inner.is_upstream(),
            _ => false,
        }
    }
}
