//! Background expiry of stale confirmations.
//!
//! Periodically asks the orchestrator to expire pending actions older than
//! the configured time-to-live. Stops on shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::orchestrator::Orchestrator;

/// Background sweeper that expires stale pending actions.
pub struct ExpirySweeper {
    orchestrator: Arc<Orchestrator>,
    ttl: Duration,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl ExpirySweeper {
    pub fn new(orchestrator: Arc<Orchestrator>, ttl: Duration, interval: Duration) -> Self {
        Self {
            orchestrator,
            ttl,
            interval: interval.max(Duration::from_secs(1)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run one sweep immediately, then one per interval until shutdown.
    ///
    /// Sweep errors are logged and retried on the next tick.
    pub async fn run(&self) {
        info!(
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );
        loop {
            match self.orchestrator.expire_stale(self.ttl).await {
                Ok(report) if report.actions > 0 => {
                    info!(
                        batches = report.batches,
                        actions = report.actions,
                        "Expiry sweep finished"
                    );
                }
                Ok(_) => debug!("Expiry sweep found nothing to expire"),
                Err(e) => error!(error = %e, "Expiry sweep failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.notified() => {
                    info!("Expiry sweeper stopped");
                    return;
                }
            }
        }
    }

    /// Signal the sweeper to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
