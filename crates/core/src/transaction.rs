//! Transactions - a batch plus an acknowledgement obligation
//!
//! # Contract
//!
//! - The producer creates a transaction with [`Transaction::new`], keeps the
//!   returned [`AckReceiver`] and pushes the transaction downstream.
//! - Exactly one result reaches the producer. [`AckSender::ack`] consumes the
//!   sender; dropping an unacknowledged sender reports
//!   [`DeliveryError::Unacknowledged`].
//! - Decorators rewrap: they create a fresh transaction for their child and
//!   bridge the child's result back into the original sender.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::TRANSACTION_CHANNEL_SIZE;
use crate::error::{AckError, DeliveryError};
use crate::message::Batch;

/// Outcome carried by an acknowledgement
pub type AckResult = Result<(), DeliveryError>;

/// Sending half of a transaction channel
pub type TransactionSender = async_channel::Sender<Transaction>;

/// Receiving half of a transaction channel
///
/// Receivers are cloneable; several workers may pull from the same channel.
pub type TransactionReceiver = async_channel::Receiver<Transaction>;

/// Create a transaction channel
pub fn transaction_channel() -> (TransactionSender, TransactionReceiver) {
    async_channel::bounded(TRANSACTION_CHANNEL_SIZE)
}

/// A message batch paired with a single-use acknowledgement
#[derive(Debug)]
pub struct Transaction {
    payload: Arc<Batch>,
    ack: AckSender,
}

impl Transaction {
    /// Create a transaction and the receiver its producer awaits
    pub fn new(payload: impl Into<Arc<Batch>>) -> (Self, AckReceiver) {
        let (tx, rx) = oneshot::channel();
        let transaction = Self {
            payload: payload.into(),
            ack: AckSender { tx: Some(tx) },
        };
        (transaction, AckReceiver { rx })
    }

    /// Pair a payload with an existing acknowledgement
    ///
    /// Used by stages that replace the batch but keep the original obligation.
    pub fn from_parts(payload: Arc<Batch>, ack: AckSender) -> Self {
        Self { payload, ack }
    }

    /// The batch carried by this transaction
    #[inline]
    pub fn payload(&self) -> &Arc<Batch> {
        &self.payload
    }

    /// Split into payload and acknowledgement
    pub fn into_parts(self) -> (Arc<Batch>, AckSender) {
        (self.payload, self.ack)
    }

    /// Acknowledge the transaction
    ///
    /// See [`AckSender::ack`].
    pub fn ack(self, cancel: &CancellationToken, result: AckResult) -> Result<(), AckError> {
        self.ack.ack(cancel, result)
    }
}

/// Single-use acknowledgement handle
///
/// Dropping it without calling [`ack`](Self::ack) fails the transaction.
#[derive(Debug)]
pub struct AckSender {
    tx: Option<oneshot::Sender<AckResult>>,
}

impl AckSender {
    /// Deliver the outcome to the producer
    ///
    /// Never blocks. Fails only when the producer no longer listens; the
    /// error is [`AckError::Cancelled`] when `cancel` has fired (the pipeline
    /// is tearing down) and [`AckError::ProducerGone`] otherwise.
    pub fn ack(mut self, cancel: &CancellationToken, result: AckResult) -> Result<(), AckError> {
        let Some(tx) = self.tx.take() else {
            return Err(AckError::ProducerGone);
        };
        tx.send(result).map_err(|_| {
            if cancel.is_cancelled() {
                AckError::Cancelled
            } else {
                AckError::ProducerGone
            }
        })
    }

    /// Whether the producer stopped waiting for this acknowledgement
    pub fn is_abandoned(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

impl Drop for AckSender {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(DeliveryError::Unacknowledged));
        }
    }
}

/// Producer side of an acknowledgement
///
/// Resolves to the outcome reported by whoever consumed the transaction.
#[derive(Debug)]
pub struct AckReceiver {
    rx: oneshot::Receiver<AckResult>,
}

impl AckReceiver {
    /// Take the outcome if it already arrived
    pub fn try_recv(&mut self) -> Option<AckResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DeliveryError::Unacknowledged)),
        }
    }
}

impl Future for AckReceiver {
    type Output = AckResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(DeliveryError::Unacknowledged)))
    }
}

#[cfg(test)]
#[path = "transaction_test.rs"]
mod transaction_test;
