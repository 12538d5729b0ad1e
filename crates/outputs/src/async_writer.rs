//! AsyncWriter - turns a [`Writer`] into a streamed output
//!
//! # Worker loop
//!
//! `consume` spawns `max_in_flight` workers. Each owns one writer and cycles
//! through:
//!
//! ```text
//! Disconnected --connect ok--> Connected --write ok--> Connected
//!      ^   |                       |
//!      |   +--connect err: backoff |
//!      +------- write err ---------+
//! ```
//!
//! - Connection failures are logged and retried with exponential backoff;
//!   they never fail a transaction.
//! - A worker only pulls a transaction once it is connected.
//! - A failed write closes the connection and fails the transaction.
//!
//! Workers share the inbound channel, so ordering only holds per worker.
//!
//! # Shutdown
//!
//! `close_async` stops every worker. A pending write is abandoned, which
//! fails its transaction, unless the writer was built with
//! [`with_no_cancel`](AsyncWriter::with_no_cancel): then in-flight writes
//! finish and already queued transactions are drained before the worker
//! exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::shutdown::ShutdownSignal;
use ferry_core::{
    ComponentError, ComponentMetrics, DeliveryError, Result, StreamedOutput, Transaction,
    TransactionReceiver,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::WriteError;
use crate::writer::Writer;

/// Default first reconnect delay
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Default upper bound on the reconnect delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

type WriterFactory = dyn Fn() -> Box<dyn Writer> + Send + Sync;

/// Exponential reconnect delay
#[derive(Debug, Clone)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

struct Inner {
    name: String,
    max_in_flight: usize,
    factory: Box<WriterFactory>,
    initial_backoff: Duration,
    max_backoff: Duration,
    no_cancel: bool,
    connected: AtomicUsize,
    started: AtomicBool,
    signal: ShutdownSignal,
    metrics: Arc<ComponentMetrics>,
}

/// Streamed output backed by one [`Writer`] per in-flight slot
pub struct AsyncWriter {
    inner: Arc<Inner>,
}

impl AsyncWriter {
    /// Create a writer adapter
    ///
    /// `factory` is called once per worker; `max_in_flight` is clamped to at
    /// least one.
    pub fn new<F, W>(
        name: impl Into<String>,
        max_in_flight: usize,
        factory: F,
        metrics: Arc<ComponentMetrics>,
    ) -> Self
    where
        F: Fn() -> W + Send + Sync + 'static,
        W: Writer + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                max_in_flight: max_in_flight.max(1),
                factory: Box::new(move || Box::new(factory()) as Box<dyn Writer>),
                initial_backoff: DEFAULT_INITIAL_BACKOFF,
                max_backoff: DEFAULT_MAX_BACKOFF,
                no_cancel: false,
                connected: AtomicUsize::new(0),
                started: AtomicBool::new(false),
                signal: ShutdownSignal::new(),
                metrics,
            }),
        }
    }

    /// Set the reconnect backoff range
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.initial_backoff = initial;
            inner.max_backoff = max.max(initial);
        }
        self
    }

    /// Let in-flight and queued writes finish when shutting down
    #[must_use]
    pub fn with_no_cancel(mut self) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.no_cancel = true;
        }
        self
    }

    /// Number of workers
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight
    }
}

#[async_trait]
impl StreamedOutput for AsyncWriter {
    fn consume(&self, transactions: TransactionReceiver) -> Result<()> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(ComponentError::AlreadyStarted);
        }

        let mut workers = JoinSet::new();
        for id in 0..self.inner.max_in_flight {
            workers.spawn(run_worker(
                Arc::clone(&self.inner),
                id,
                transactions.clone(),
            ));
        }
        drop(transactions);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    tracing::error!(output = %inner.name, error = %e, "writer worker panicked");
                }
            }
            tracing::debug!(output = %inner.name, "async writer closed");
            inner.signal.mark_closed();
        });

        Ok(())
    }

    fn connected(&self) -> bool {
        self.inner.connected.load(Ordering::Relaxed) > 0
    }

    fn close_async(&self) {
        self.inner.signal.close_async();
        // Never started: nothing to drain
        if !self.inner.started.swap(true, Ordering::AcqRel) {
            self.inner.signal.mark_closed();
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<()> {
        self.inner.signal.wait_for_close(timeout).await
    }
}

/// Connection state owned by a single worker
struct Slot {
    writer: Box<dyn Writer>,
    connected: bool,
}

async fn run_worker(inner: Arc<Inner>, id: usize, transactions: TransactionReceiver) {
    let stop = inner.signal.stop_token().clone();
    let mut slot = Slot {
        writer: (inner.factory)(),
        connected: false,
    };
    let mut backoff = Backoff::new(inner.initial_backoff, inner.max_backoff);

    loop {
        if !slot.connected && !connect(&inner, id, &mut slot, &mut backoff, &stop).await {
            break;
        }

        let tran = tokio::select! {
            _ = stop.cancelled() => break,
            next = transactions.recv() => match next {
                Ok(tran) => tran,
                Err(_) => break,
            },
        };

        if inner.no_cancel {
            write(&inner, id, &mut slot, tran, &stop).await;
        } else {
            tokio::select! {
                // Dropping the pending write drops the transaction, which
                // fails it upstream
                _ = stop.cancelled() => break,
                _ = write(&inner, id, &mut slot, tran, &stop) => {}
            }
        }
    }

    if inner.no_cancel && stop.is_cancelled() {
        drain(&inner, id, &mut slot, &transactions, &stop).await;
    }

    if slot.connected {
        disconnect(&inner, &mut slot).await;
    }
    tracing::debug!(output = %inner.name, worker = id, "writer worker stopped");
}

/// Connect, retrying until success or shutdown. Returns false on shutdown.
async fn connect(
    inner: &Inner,
    id: usize,
    slot: &mut Slot,
    backoff: &mut Backoff,
    stop: &CancellationToken,
) -> bool {
    let mut attempts = 0u64;
    loop {
        let result = tokio::select! {
            _ = stop.cancelled() => return false,
            result = slot.writer.connect() => result,
        };

        match result {
            Ok(()) => {
                slot.connected = true;
                backoff.reset();
                inner.connected.fetch_add(1, Ordering::Relaxed);
                inner.metrics.record_connect();
                tracing::info!(output = %inner.name, worker = id, "connected to target");
                return true;
            }
            Err(e) => {
                inner.metrics.record_connect_failure();
                attempts += 1;
                let delay = backoff.next_delay();
                if attempts == 1 {
                    tracing::warn!(
                        output = %inner.name,
                        worker = id,
                        error = %e,
                        retry_in = ?delay,
                        "failed to connect, retrying"
                    );
                } else {
                    tracing::debug!(
                        output = %inner.name,
                        worker = id,
                        attempts,
                        error = %e,
                        retry_in = ?delay,
                        "connect retry failed"
                    );
                }

                tokio::select! {
                    _ = stop.cancelled() => return false,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

async fn write(inner: &Inner, id: usize, slot: &mut Slot, tran: Transaction, stop: &CancellationToken) {
    inner.metrics.record_received();

    let result = if slot.connected {
        slot.writer.write(tran.payload()).await
    } else {
        Err(WriteError::NotConnected)
    };

    let outcome = match result {
        Ok(()) => {
            inner.metrics.record_sent();
            Ok(())
        }
        Err(e) => {
            inner.metrics.record_failed();
            tracing::warn!(
                output = %inner.name,
                worker = id,
                error = %e,
                "failed to send message, reconnecting"
            );
            disconnect(inner, slot).await;
            Err(DeliveryError::from(e))
        }
    };

    if let Err(e) = tran.ack(stop, outcome) {
        tracing::debug!(output = %inner.name, error = %e, "acknowledgement not delivered");
    }
}

/// Write whatever is already queued; used by no-cancel writers on shutdown
async fn drain(
    inner: &Inner,
    id: usize,
    slot: &mut Slot,
    transactions: &TransactionReceiver,
    stop: &CancellationToken,
) {
    while slot.connected {
        let Ok(tran) = transactions.try_recv() else {
            return;
        };
        write(inner, id, slot, tran, stop).await;
    }
}

async fn disconnect(inner: &Inner, slot: &mut Slot) {
    if !slot.connected {
        return;
    }
    slot.connected = false;
    inner.connected.fetch_sub(1, Ordering::Relaxed);
    if let Err(e) = slot.writer.close().await {
        tracing::debug!(output = %inner.name, error = %e, "error closing connection");
    }
}

#[cfg(test)]
#[path = "async_writer_test.rs"]
mod async_writer_test;
