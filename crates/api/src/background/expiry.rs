//! Periodic expiry sweep.
//!
//! The request sweep already runs eagerly on every read path that serves
//! request data; this task is the backstop that catches windows lapsing
//! while nobody is reading, so connected clients still hear about the
//! expiry promptly. Session housekeeping rides the same tick.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use nearhand_db::repositories::SessionRepo;
use nearhand_db::DbPool;

use crate::engine::LifecycleEngine;

/// Run the expiry sweep loop.
///
/// Delegates to [`LifecycleEngine::sweep_expired`], which also publishes
/// `RequestExpired` events for swept rows, then purges dead auth
/// sessions. Runs until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    lifecycle: Arc<LifecycleEngine>,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs, "Expiry sweeper started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Expiry sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                match lifecycle.sweep_expired().await {
                    Ok(swept) => {
                        if swept > 0 {
                            tracing::info!(swept, "Expiry sweep: requests expired");
                        } else {
                            tracing::debug!("Expiry sweep: nothing to expire");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Expiry sweep failed");
                    }
                }

                match SessionRepo::cleanup_expired(&pool).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::debug!(deleted, "Purged dead sessions");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Session cleanup failed");
                    }
                }
            }
        }
    }
}
