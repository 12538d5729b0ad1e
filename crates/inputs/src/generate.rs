//! Generate input
//!
//! Emits a single-part message resolved from a field expression every
//! `interval`. The first message goes out immediately. Each message waits
//! for its acknowledgement before the next tick; rejected messages are
//! logged and counted, not retried.

use std::sync::Arc;

use bytes::Bytes;
use ferry_config::GenerateInputConfig;
use ferry_core::{Batch, ComponentMetrics, Field, Part};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::InputError;
use crate::task::{TaskInput, deliver};

/// Build the generate input
pub fn generate_input(
    config: &GenerateInputConfig,
    metrics: Arc<ComponentMetrics>,
) -> Result<TaskInput, InputError> {
    let payload = Field::parse(&config.payload).map_err(|e| InputError::expression("payload", e))?;
    let count = config.count;
    let interval = config.interval;

    Ok(TaskInput::spawn("generate", move |tx, stop| async move {
        let mut ticker = (!interval.is_zero()).then(|| {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut emitted = 0u64;
        while count == 0 || emitted < count {
            if !tick(ticker.as_mut(), &stop).await {
                break;
            }

            let batch = Arc::new(Batch::single(render(&payload)));
            metrics.record_received();
            match deliver(&tx, &stop, batch).await {
                None => break,
                Some(Ok(())) => metrics.record_sent(),
                Some(Err(e)) => {
                    metrics.record_failed();
                    tracing::warn!(input = "generate", error = %e, "generated message was rejected");
                }
            }
            emitted += 1;
        }
        drop(tx);
        Ok(())
    }))
}

/// Wait for the next tick; false when stopping
async fn tick(ticker: Option<&mut Interval>, stop: &CancellationToken) -> bool {
    match ticker {
        Some(ticker) => tokio::select! {
            _ = stop.cancelled() => false,
            _ = ticker.tick() => true,
        },
        None => {
            tokio::task::yield_now().await;
            !stop.is_cancelled()
        }
    }
}

fn render(payload: &Field) -> Part {
    let scratch = Batch::single(Part::new(Bytes::new()));
    Part::new(payload.string(0, &scratch))
}
