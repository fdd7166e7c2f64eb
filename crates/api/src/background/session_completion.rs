//! In-process session completion loop.
//!
//! Deployments without an external scheduler can set
//! `SESSION_COMPLETION_INTERVAL_SECS` to run the completion batch on a fixed
//! interval instead of calling the cron endpoint.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::engine::session_completion::SessionCompletionEngine;

/// Run the completion batch every `interval` until `cancel` is triggered.
pub async fn run(engine: SessionCompletionEngine, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Session completion job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session completion job stopping");
                break;
            }
            _ = ticker.tick() => {
                match engine.run_batch(Utc::now()).await {
                    Ok(report) if report.has_errors() => {
                        tracing::warn!(
                            completed = report.completed,
                            errors = report.errors.len(),
                            "Session completion: batch finished with errors"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Session completion: batch selection failed");
                    }
                }
            }
        }
    }
}
