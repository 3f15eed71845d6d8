// src/pipeline/schedule.rs

//! Periodic refresh loop.

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pipeline::service::{CommentService, RefreshMode};

/// Refresh every configured interval until `shutdown` is cancelled.
///
/// The first tick is skipped, since startup already refreshed. A failed cycle
/// is logged and the loop carries on.
pub async fn run_refresh_loop(service: CommentService, shutdown: CancellationToken) {
    let period = service.config().refresh_interval();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    log::info!("Refresh loop started (every {}s)", period.as_secs());
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = service.refresh(RefreshMode::Scheduled) => {
                if let Err(e) = result {
                    log::error!("Scheduled refresh failed: {}", e);
                }
            }
        }
    }
    log::info!("Refresh loop stopped");
}

/// Spawn [`run_refresh_loop`] on the runtime.
pub fn spawn_refresh_loop(service: CommentService, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run_refresh_loop(service, shutdown))
}
