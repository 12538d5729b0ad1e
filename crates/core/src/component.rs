//! Streamed component contract
//!
//! Inputs, outputs and decorators all expose the same lifecycle so they can
//! be composed without knowing each other's concrete types.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::transaction::TransactionReceiver;

/// An output that consumes a stream of transactions
///
/// # Lifecycle
///
/// 1. `consume` binds the inbound channel and starts background tasks. A
///    second call fails with [`ComponentError::AlreadyStarted`].
/// 2. `close_async` requests shutdown and returns immediately. Idempotent.
/// 3. `wait_for_close` blocks until shutdown completed or the timeout
///    elapsed ([`ComponentError::Timeout`]).
///
/// Closing the inbound channel also shuts the output down once it has
/// drained.
///
/// [`ComponentError::AlreadyStarted`]: crate::ComponentError::AlreadyStarted
/// [`ComponentError::Timeout`]: crate::ComponentError::Timeout
#[async_trait]
pub trait StreamedOutput: Send + Sync {
    /// Bind the inbound transaction channel
    fn consume(&self, transactions: TransactionReceiver) -> Result<()>;

    /// Best-effort, non-blocking connectivity probe
    fn connected(&self) -> bool;

    /// Request shutdown without waiting
    fn close_async(&self);

    /// Wait for shutdown to complete
    async fn wait_for_close(&self, timeout: Duration) -> Result<()>;
}

/// An input that produces a stream of transactions
///
/// The receiver returned by `transactions` stays the same for the whole
/// lifetime of the input and closes exactly once, after the input shut down.
#[async_trait]
pub trait StreamedInput: Send + Sync {
    /// The outbound transaction channel
    fn transactions(&self) -> TransactionReceiver;

    /// Best-effort, non-blocking connectivity probe
    fn connected(&self) -> bool;

    /// Request shutdown without waiting
    fn close_async(&self);

    /// Wait for shutdown to complete
    async fn wait_for_close(&self, timeout: Duration) -> Result<()>;
}
