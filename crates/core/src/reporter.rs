//! Periodic metrics reporter
//!
//! Logs every registered component's counters at a fixed interval until
//! cancelled. Run it as a tokio task.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::metrics::MetricsRegistry;

/// Logs metrics snapshots on an interval
pub struct MetricsReporter {
    registry: Arc<MetricsRegistry>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(registry: Arc<MetricsRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run until cancellation, logging a final report on the way out
    pub async fn run(self, cancel: CancellationToken) {
        if self.interval.is_zero() {
            info!("metrics reporting disabled");
            return;
        }

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately
        ticker.tick().await;

        info!(
            interval_secs = self.interval.as_secs(),
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.report();
                    info!("metrics reporter stopped");
                    return;
                }
                _ = ticker.tick() => self.report(),
            }
        }
    }

    fn report(&self) {
        for (component, m) in self.registry.snapshot() {
            info!(
                component = %component,
                received = m.received,
                sent = m.sent,
                failed = m.failed,
                dropped = m.dropped,
                connects = m.connects,
                connect_failures = m.connect_failures,
                "metrics"
            );
        }
    }
}
