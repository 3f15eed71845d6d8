//! Service layer for the comment pipeline.
//!
//! This module contains the business logic for:
//! - Feed fetching with cursor pagination (`FeedFetcher`)
//! - Mapping raw answers onto comments (`Normalizer`)

mod feed;
mod normalize;

pub use feed::{FeedFetcher, FeedSource, StopReason};
pub use normalize::Normalizer;
