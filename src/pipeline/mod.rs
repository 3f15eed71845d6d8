//! Pipeline entry points for keeping the comment cache fresh.
//!
//! - `CommentService`: serve reads and run refreshes (fetch, normalize, cache)
//! - `SingleFlight`: at most one refresh in flight, shared by every caller
//! - `run_refresh_loop`: refresh on a fixed interval until shutdown

pub mod refresh;
pub mod schedule;
pub mod service;

pub use refresh::{RefreshState, RefreshSummary, SharedResult, SingleFlight};
pub use schedule::{run_refresh_loop, spawn_refresh_loop};
pub use service::{CommentService, RefreshMode, RefreshOutcome};
