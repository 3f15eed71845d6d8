// src/lib.rs

//! Zhihu question answers, scraped, cached and served as paginated comments.

pub mod api;
pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
