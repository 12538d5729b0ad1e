//! ProcessorPipeline - runs a processor chain between two channels
//!
//! `threads` workers pull from the inbound channel, run the [`Chain`] and
//! push the results to the outbound channel returned by
//! [`transactions`](ProcessorPipeline::transactions). The outbound channel
//! closes once every worker has stopped, so closing the input cascades to
//! the output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::shutdown::ShutdownSignal;
use ferry_core::{
    AckSender, Batch, ComponentError, ComponentMetrics, DeliveryError, Result, StreamedOutput,
    Transaction, TransactionReceiver, TransactionSender, transaction_channel,
};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::chain::Chain;

struct Inner {
    chain: Chain,
    threads: usize,
    started: AtomicBool,
    outbound: Mutex<Option<TransactionSender>>,
    transactions: TransactionReceiver,
    signal: ShutdownSignal,
    metrics: Arc<ComponentMetrics>,
}

/// Processing stage between the input and the output
pub struct ProcessorPipeline {
    inner: Arc<Inner>,
}

impl ProcessorPipeline {
    /// Create a stage running `chain` on `threads` workers (at least one)
    pub fn new(chain: Chain, threads: usize, metrics: Arc<ComponentMetrics>) -> Self {
        let (tx, rx) = transaction_channel();
        Self {
            inner: Arc::new(Inner {
                chain,
                threads: threads.max(1),
                started: AtomicBool::new(false),
                outbound: Mutex::new(Some(tx)),
                transactions: rx,
                signal: ShutdownSignal::new(),
                metrics,
            }),
        }
    }

    /// The outbound transaction channel
    pub fn transactions(&self) -> TransactionReceiver {
        self.inner.transactions.clone()
    }
}

#[async_trait]
impl StreamedOutput for ProcessorPipeline {
    fn consume(&self, transactions: TransactionReceiver) -> Result<()> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(ComponentError::AlreadyStarted);
        }
        let Some(outbound) = self.inner.outbound.lock().take() else {
            return Err(ComponentError::AlreadyStarted);
        };

        let mut workers = JoinSet::new();
        for id in 0..self.inner.threads {
            workers.spawn(run_worker(
                Arc::clone(&self.inner),
                id,
                transactions.clone(),
                outbound.clone(),
            ));
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "processing worker panicked");
                }
            }
            tracing::debug!("processor pipeline closed");
            inner.signal.mark_closed();
        });

        Ok(())
    }

    fn connected(&self) -> bool {
        !self.inner.signal.is_closed()
    }

    fn close_async(&self) {
        self.inner.signal.close_async();
        if !self.inner.started.swap(true, Ordering::AcqRel) {
            self.inner.outbound.lock().take();
            self.inner.signal.mark_closed();
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<()> {
        self.inner.signal.wait_for_close(timeout).await
    }
}

async fn run_worker(
    inner: Arc<Inner>,
    id: usize,
    inbound: TransactionReceiver,
    outbound: TransactionSender,
) {
    let stop = inner.signal.stop_token().clone();

    loop {
        let tran = tokio::select! {
            _ = stop.cancelled() => break,
            next = inbound.recv() => match next {
                Ok(tran) => tran,
                Err(_) => break,
            },
        };
        inner.metrics.record_received();

        let (payload, ack) = tran.into_parts();
        let batches = match inner.chain.process(Arc::unwrap_or_clone(payload)).await {
            Ok(batches) => batches,
            Err(e) => {
                tracing::warn!(worker = id, error = %e, "failed to process message");
                inner.metrics.record_failed();
                let _ = ack.ack(&stop, Err(DeliveryError::processing(e.to_string())));
                continue;
            }
        };

        let mut batches = batches.into_iter();
        let delivered = match (batches.next(), batches.len()) {
            (None, _) => {
                inner.metrics.record_dropped();
                let _ = ack.ack(&stop, Ok(()));
                true
            }
            (Some(batch), 0) => {
                let tran = Transaction::from_parts(Arc::new(batch), ack);
                let sent = forward(tran, &outbound, &stop).await;
                if sent {
                    inner.metrics.record_sent();
                }
                sent
            }
            (Some(first), _) => {
                fan_out(&inner, std::iter::once(first).chain(batches), ack, &outbound, &stop).await
            }
        };

        if !delivered {
            break;
        }
    }

    tracing::debug!(worker = id, "processing worker stopped");
}

/// Send each batch with its own acknowledgement and resolve `ack` with the
/// first failure
async fn fan_out(
    inner: &Inner,
    batches: impl Iterator<Item = Batch>,
    ack: AckSender,
    outbound: &TransactionSender,
    stop: &CancellationToken,
) -> bool {
    let mut pending = Vec::new();
    for batch in batches {
        let (tran, child_ack) = Transaction::new(batch);
        if !forward(tran, outbound, stop).await {
            return false;
        }
        pending.push(child_ack);
    }

    let mut outcome = Ok(());
    for child_ack in pending {
        let result = tokio::select! {
            _ = stop.cancelled() => return false,
            result = child_ack => result,
        };
        if outcome.is_ok() {
            outcome = result;
        }
    }

    match &outcome {
        Ok(()) => inner.metrics.record_sent(),
        Err(_) => inner.metrics.record_failed(),
    }
    let _ = ack.ack(stop, outcome);
    true
}

/// Push one transaction downstream; false when stopping
async fn forward(tran: Transaction, outbound: &TransactionSender, stop: &CancellationToken) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        sent = outbound.send(tran) => sent.is_ok(),
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
