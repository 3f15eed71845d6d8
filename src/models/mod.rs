// src/models/mod.rs

//! Domain models for the comment pipeline.
//!
//! Raw upstream shapes live in `feed`, the canonical records served to the
//! widget live in `comment`, and settings live in `config`.

mod comment;
mod config;
mod feed;

// Re-export all public types
pub use comment::{Author, Comment, CommentsPage, CommentsPayload, PageQuery, Question, iso_millis};
pub use config::{Endpoint, FeedConfig, FileConfig, ServerConfig, defaults};
pub use feed::{Paging, RawAnswer, RawAuthor, RawFeedItem, RawFeedPage, RawQuestion};
