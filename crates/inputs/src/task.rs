//! Inputs driven by a single background task

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::shutdown::ShutdownSignal;
use ferry_core::{
    AckResult, Batch, Result, StreamedInput, Transaction, TransactionReceiver, TransactionSender,
    transaction_channel,
};
use tokio_util::sync::CancellationToken;

use crate::error::InputError;

/// A streamed input whose messages come from one spawned task
///
/// The outbound channel closes when the task returns, either because the
/// source is exhausted or because the input was closed.
pub struct TaskInput {
    name: &'static str,
    transactions: TransactionReceiver,
    running: Arc<AtomicBool>,
    signal: ShutdownSignal,
}

impl TaskInput {
    /// Spawn `task` with the outbound sender and the stop token
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(TransactionSender, CancellationToken) -> Fut,
        Fut: Future<Output = std::result::Result<(), InputError>> + Send + 'static,
    {
        let (tx, rx) = transaction_channel();
        let signal = ShutdownSignal::new();
        let running = Arc::new(AtomicBool::new(true));

        let fut = task(tx, signal.stop_token().clone());
        let task_signal = signal.clone();
        let task_running = Arc::clone(&running);
        tokio::spawn(async move {
            match fut.await {
                Ok(()) => tracing::info!(input = name, "input finished"),
                Err(e) => tracing::error!(input = name, error = %e, "input failed"),
            }
            task_running.store(false, Ordering::Release);
            task_signal.mark_closed();
        });

        Self {
            name,
            transactions: rx,
            running,
            signal,
        }
    }

    /// Input type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl StreamedInput for TaskInput {
    fn transactions(&self) -> TransactionReceiver {
        self.transactions.clone()
    }

    fn connected(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn close_async(&self) {
        self.signal.close_async();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<()> {
        self.signal.wait_for_close(timeout).await
    }
}

/// Push one batch downstream and wait for its acknowledgement
///
/// Returns `None` when the input is stopping or nobody reads the channel.
pub(crate) async fn deliver(
    tx: &TransactionSender,
    stop: &CancellationToken,
    batch: Arc<Batch>,
) -> Option<AckResult> {
    let (tran, ack) = Transaction::new(batch);

    tokio::select! {
        _ = stop.cancelled() => return None,
        sent = tx.send(tran) => {
            if sent.is_err() {
                return None;
            }
        }
    }

    tokio::select! {
        _ = stop.cancelled() => None,
        result = ack => Some(result),
    }
}
