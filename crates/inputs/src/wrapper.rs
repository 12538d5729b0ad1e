//! InputWrapper - a hot-swappable input
//!
//! Downstream components bind to the wrapper's transaction channel once. The
//! wrapper relays transactions from whichever input is currently active,
//! passing each one through untouched so the original acknowledgement goes
//! back to the input that produced it.
//!
//! # Swapping
//!
//! ```text
//! close_existing_input()   old input drains and closes, outbound stays open
//! swap_input(new)          relay switches to the new input's channel
//! ```
//!
//! Transactions still queued in the old input's channel when the relay
//! switches are forwarded before it moves on. The outbound channel only
//! closes after the wrapper itself is closed and its last input has shut
//! down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::shutdown::{ShutdownSignal, maximum_shutdown_wait};
use ferry_core::{
    ComponentError, Result, StreamedInput, Transaction, TransactionReceiver, TransactionSender,
    transaction_channel,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

struct Inner {
    active: Mutex<Option<Arc<dyn StreamedInput>>>,
    generation: watch::Sender<u64>,
    close_when_exhausted: bool,
    transactions: TransactionReceiver,
    signal: ShutdownSignal,
}

impl Inner {
    fn active(&self) -> Option<Arc<dyn StreamedInput>> {
        self.active.lock().clone()
    }
}

/// Streamed input that relays from a replaceable inner input
pub struct InputWrapper {
    inner: Arc<Inner>,
}

impl InputWrapper {
    /// Wrap `input`; the wrapper outlives it and waits for a replacement
    /// when it finishes
    pub fn new(input: Arc<dyn StreamedInput>) -> Self {
        Self::start(input, false)
    }

    /// Wrap `input`; the wrapper closes once the active input finishes
    pub fn closing_when_exhausted(input: Arc<dyn StreamedInput>) -> Self {
        Self::start(input, true)
    }

    fn start(input: Arc<dyn StreamedInput>, close_when_exhausted: bool) -> Self {
        let (tx, rx) = transaction_channel();
        let (generation, _) = watch::channel(0);
        let inner = Arc::new(Inner {
            active: Mutex::new(Some(input)),
            generation,
            close_when_exhausted,
            transactions: rx,
            signal: ShutdownSignal::new(),
        });

        tokio::spawn(relay(Arc::clone(&inner), tx));
        Self { inner }
    }

    /// Replace the active input
    ///
    /// The replaced input is asked to close if it is still running.
    pub fn swap_input(&self, input: Arc<dyn StreamedInput>) {
        let previous = self.inner.active.lock().replace(input);
        if let Some(previous) = previous {
            previous.close_async();
        }
        self.inner.generation.send_modify(|g| *g += 1);
        tracing::info!("input swapped");
    }

    /// Close the active input and wait for it, leaving the outbound channel
    /// open
    ///
    /// Fails with [`ComponentError::Cancelled`] when `cancel` fires first.
    pub async fn close_existing_input(&self, cancel: &CancellationToken) -> Result<()> {
        let Some(input) = self.inner.active() else {
            return Ok(());
        };

        input.close_async();
        tokio::select! {
            _ = cancel.cancelled() => Err(ComponentError::Cancelled),
            result = input.wait_for_close(maximum_shutdown_wait()) => result,
        }
    }
}

#[async_trait]
impl StreamedInput for InputWrapper {
    fn transactions(&self) -> TransactionReceiver {
        self.inner.transactions.clone()
    }

    fn connected(&self) -> bool {
        self.inner.active().is_some_and(|input| input.connected())
    }

    fn close_async(&self) {
        self.inner.signal.close_async();
        if let Some(input) = self.inner.active() {
            input.close_async();
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<()> {
        self.inner.signal.wait_for_close(timeout).await
    }
}

async fn relay(inner: Arc<Inner>, outbound: TransactionSender) {
    let stop = inner.signal.stop_token().clone();
    let mut generation = inner.generation.subscribe();

    'relay: loop {
        generation.borrow_and_update();
        let Some(input) = inner.active() else {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = generation.changed() => {}
            }
            continue;
        };
        let inbound = input.transactions();

        loop {
            tokio::select! {
                _ = stop.cancelled() => break 'relay,
                _ = generation.changed() => {
                    // Forward whatever the old input already queued
                    while let Ok(tran) = inbound.try_recv() {
                        if !forward(tran, &outbound, &stop).await {
                            break 'relay;
                        }
                    }
                    continue 'relay;
                }
                next = inbound.recv() => match next {
                    Ok(tran) => {
                        if !forward(tran, &outbound, &stop).await {
                            break 'relay;
                        }
                    }
                    Err(_) if inner.close_when_exhausted => {
                        tracing::info!("wrapped input finished, closing");
                        break 'relay;
                    }
                    Err(_) => {
                        tracing::debug!("wrapped input finished, waiting for a replacement");
                        tokio::select! {
                            _ = stop.cancelled() => break 'relay,
                            _ = generation.changed() => continue 'relay,
                        }
                    }
                },
            }
        }
    }

    if let Some(input) = inner.active() {
        input.close_async();
        if let Err(e) = input.wait_for_close(maximum_shutdown_wait()).await {
            tracing::warn!(error = %e, "wrapped input failed to close");
        }
    }

    drop(outbound);
    inner.signal.mark_closed();
}

/// Hand one transaction downstream; false when stopping
///
/// A transaction abandoned here is dropped, which fails it upstream.
async fn forward(tran: Transaction, outbound: &TransactionSender, stop: &CancellationToken) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        sent = outbound.send(tran) => sent.is_ok(),
    }
}

#[cfg(test)]
#[path = "wrapper_test.rs"]
mod wrapper_test;
