//! Shutdown coordination
//!
//! `ShutdownSignal` pairs two cancellation tokens: one that asks a
//! component to stop, and one the component fires once it has fully stopped.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ComponentError, Result};

/// Upper bound on how long a parent waits for a child component to close
pub const MAXIMUM_SHUTDOWN_WAIT: Duration = Duration::from_secs(20);

/// How long a parent waits for a child component to close
#[inline]
pub fn maximum_shutdown_wait() -> Duration {
    MAXIMUM_SHUTDOWN_WAIT
}

/// Stop request plus completion notification for one component
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    stop: CancellationToken,
    closed: CancellationToken,
}

impl ShutdownSignal {
    /// Create a new signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the component to stop (non-blocking, idempotent)
    #[inline]
    pub fn close_async(&self) {
        self.stop.cancel();
    }

    /// Whether a stop was requested
    #[inline]
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Token the component's loops race against
    #[inline]
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// Resolves once a stop was requested
    pub async fn stopping(&self) {
        self.stop.cancelled().await;
    }

    /// Mark the component as fully closed
    #[inline]
    pub fn mark_closed(&self) {
        self.closed.cancel();
    }

    /// Whether the component has fully closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Wait until the component has closed, or fail with a timeout
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.closed.cancelled())
            .await
            .map_err(|_| ComponentError::Timeout)
    }
}
