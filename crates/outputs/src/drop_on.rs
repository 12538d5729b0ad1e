//! DropOn - turns child failures or back pressure into drops
//!
//! Wraps a child output and forwards every transaction to it through a
//! fresh transaction, bridging the child's result back upstream.
//!
//! # Conditions
//!
//! - **error**: a failed child acknowledgement is logged and reported
//!   upstream as success.
//! - **back_pressure**: both handing the transaction to the child and
//!   waiting for its result share one deadline. When the deadline passes the
//!   transaction is dropped and the output becomes *stalled*: following
//!   transactions get a single non-blocking handoff attempt and are dropped
//!   straight away if the child still isn't accepting. The first accepted
//!   handoff clears the stall.
//!
//! A handoff only counts as accepted once the child has taken the
//! transaction off the channel. One the child never picked up is pulled
//! back when it is dropped, so the child never sees a transaction that was
//! already reported upstream.
//!
//! A back pressure drop is reported as success when `error` is also set,
//! otherwise as [`DeliveryError::BackPressure`].
//!
//! Results the loop stopped waiting for are collected by a detached task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::shutdown::{ShutdownSignal, maximum_shutdown_wait};
use ferry_core::{
    AckReceiver, AckResult, ComponentMetrics, DeliveryError, Result, StreamedOutput, Transaction,
    TransactionReceiver, TransactionSender, transaction_channel,
};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::sync::CancellationToken;

/// How long a stalled handoff waits for the child to pick the transaction up
const HANDOFF_GRACE: Duration = Duration::from_millis(1);

/// When DropOn drops instead of propagating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropConditions {
    /// Drop transactions the child fails
    pub on_error: bool,
    /// Drop transactions the child hasn't finished within this duration
    pub back_pressure: Option<Duration>,
}

/// Streamed output decorator that drops on error or back pressure
pub struct DropOn {
    conditions: DropConditions,
    child: Arc<dyn StreamedOutput>,
    started: AtomicBool,
    signal: ShutdownSignal,
    metrics: Arc<ComponentMetrics>,
}

impl DropOn {
    /// Wrap `child`
    ///
    /// A zero `back_pressure` disables the back pressure check.
    pub fn new(
        conditions: DropConditions,
        child: Arc<dyn StreamedOutput>,
        metrics: Arc<ComponentMetrics>,
    ) -> Self {
        let conditions = DropConditions {
            back_pressure: conditions.back_pressure.filter(|d| !d.is_zero()),
            ..conditions
        };
        Self {
            conditions,
            child,
            started: AtomicBool::new(false),
            signal: ShutdownSignal::new(),
            metrics,
        }
    }

    /// Configured drop conditions
    pub fn conditions(&self) -> DropConditions {
        self.conditions
    }
}

#[async_trait]
impl StreamedOutput for DropOn {
    fn consume(&self, transactions: TransactionReceiver) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ferry_core::ComponentError::AlreadyStarted);
        }

        let (child_tx, child_rx) = transaction_channel();
        let handoff = self.conditions.back_pressure.map(|_| child_rx.clone());
        if let Err(e) = self.child.consume(child_rx) {
            self.started.store(false, Ordering::Release);
            return Err(e);
        }

        let forwarder = Forwarder {
            conditions: self.conditions,
            inbound: transactions,
            child_tx,
            handoff,
            stop: self.signal.stop_token().clone(),
            metrics: Arc::clone(&self.metrics),
        };
        let child = Arc::clone(&self.child);
        let signal = self.signal.clone();

        tokio::spawn(async move {
            forwarder.run().await;

            child.close_async();
            if let Err(e) = child.wait_for_close(maximum_shutdown_wait()).await {
                tracing::error!(error = %e, "drop_on child failed to close");
            }
            signal.mark_closed();
        });

        Ok(())
    }

    fn connected(&self) -> bool {
        self.child.connected()
    }

    fn close_async(&self) {
        self.signal.close_async();
        if !self.started.swap(true, Ordering::AcqRel) {
            self.child.close_async();
            self.signal.mark_closed();
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<()> {
        self.signal.wait_for_close(timeout).await
    }
}

/// The forwarding loop; owns the stalled flag
struct Forwarder {
    conditions: DropConditions,
    inbound: TransactionReceiver,
    child_tx: TransactionSender,
    /// Receiver clone used to pull back handoffs the child never took
    handoff: Option<TransactionReceiver>,
    stop: CancellationToken,
    metrics: Arc<ComponentMetrics>,
}

/// What happened to one forwarded transaction
enum Outcome {
    /// The child resolved it
    Resolved(AckResult),
    /// Gave up on the child
    BackPressure,
    /// Shutdown interrupted the handoff or the wait
    Stopped,
}

impl Forwarder {
    async fn run(self) {
        let mut stalled = false;

        loop {
            let tran = tokio::select! {
                _ = self.stop.cancelled() => return,
                next = self.inbound.recv() => match next {
                    Ok(tran) => tran,
                    Err(_) => return,
                },
            };
            self.metrics.record_received();

            let outcome = match (self.conditions.back_pressure, &self.handoff) {
                (Some(limit), Some(handoff)) => {
                    self.forward_with_deadline(&tran, limit, handoff, &mut stalled)
                        .await
                }
                _ => self.forward(&tran).await,
            };

            let mut dropped = false;
            let result = match outcome {
                // Dropping `tran` here fails it upstream
                Outcome::Stopped => return,
                Outcome::Resolved(result) => result,
                Outcome::BackPressure => {
                    let limit = self.conditions.back_pressure.unwrap_or_default();
                    tracing::warn!(limit = ?limit, "message dropped due to back pressure");
                    dropped = true;
                    if self.conditions.on_error {
                        Ok(())
                    } else {
                        Err(DeliveryError::back_pressure(limit))
                    }
                }
            };

            let result = match result {
                Err(e) if self.conditions.on_error => {
                    tracing::warn!(error = %e, "message dropped due to error");
                    dropped = true;
                    Ok(())
                }
                other => other,
            };

            match &result {
                _ if dropped => self.metrics.record_dropped(),
                Ok(()) => self.metrics.record_sent(),
                Err(_) => self.metrics.record_failed(),
            }

            if tran.ack(&self.stop, result).is_err() && self.stop.is_cancelled() {
                return;
            }
        }
    }

    /// Hand the batch to the child and wait as long as it takes
    async fn forward(&self, tran: &Transaction) -> Outcome {
        let (child_tran, child_ack) = Transaction::new(Arc::clone(tran.payload()));

        tokio::select! {
            _ = self.stop.cancelled() => return Outcome::Stopped,
            sent = self.child_tx.send(child_tran) => {
                if sent.is_err() {
                    return Outcome::Resolved(Err(DeliveryError::ShuttingDown));
                }
            }
        }

        tokio::select! {
            _ = self.stop.cancelled() => Outcome::Stopped,
            result = child_ack => Outcome::Resolved(result),
        }
    }

    /// Hand the batch to the child under the back pressure deadline
    async fn forward_with_deadline(
        &self,
        tran: &Transaction,
        limit: Duration,
        handoff: &TransactionReceiver,
        stalled: &mut bool,
    ) -> Outcome {
        let deadline = Instant::now() + limit;
        let (child_tran, mut child_ack) = Transaction::new(Arc::clone(tran.payload()));

        if *stalled {
            // One attempt, no waiting; keep dropping while the child isn't receiving
            match self.child_tx.try_send(child_tran) {
                Ok(()) => {}
                Err(e) if e.is_closed() => {
                    return Outcome::Resolved(Err(DeliveryError::ShuttingDown));
                }
                Err(_) => return Outcome::BackPressure,
            }
            if !self.picked_up(HANDOFF_GRACE).await && take_back(handoff) {
                return Outcome::BackPressure;
            }
            *stalled = false;
        } else {
            tokio::select! {
                _ = self.stop.cancelled() => return Outcome::Stopped,
                sent = timeout_at(deadline, self.child_tx.send(child_tran)) => match sent {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => return Outcome::Resolved(Err(DeliveryError::ShuttingDown)),
                    Err(_) => {
                        *stalled = true;
                        return Outcome::BackPressure;
                    }
                },
            }
        }

        tokio::select! {
            _ = self.stop.cancelled() => Outcome::Stopped,
            result = timeout_at(deadline, &mut child_ack) => match result {
                Ok(result) => Outcome::Resolved(result),
                Err(_) => {
                    *stalled = true;
                    if !take_back(handoff) {
                        reclaim(child_ack);
                    }
                    Outcome::BackPressure
                }
            },
        }
    }

    /// Wait up to `grace` for the child to take the queued transaction
    async fn picked_up(&self, grace: Duration) -> bool {
        timeout(grace, async {
            while !self.child_tx.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .is_ok()
    }
}

/// Pull a queued transaction back out of the child's channel
///
/// Returns false when the child already took it. The pulled transaction is
/// dropped, which resolves its acknowledgement nobody waits for.
fn take_back(handoff: &TransactionReceiver) -> bool {
    handoff.try_recv().is_ok()
}

/// Collect a result nobody is waiting for anymore
fn reclaim(ack: AckReceiver) {
    tokio::spawn(async move {
        let result = ack.await;
        tracing::debug!(result = ?result, "reclaimed late acknowledgement");
    });
}

#[cfg(test)]
#[path = "drop_on_test.rs"]
mod drop_on_test;
