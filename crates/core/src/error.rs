//! Core error types
//!
//! `ComponentError` covers lifecycle failures, `DeliveryError` is the reason
//! carried by a failed acknowledgement, and `AckError` reports that an
//! acknowledgement could not be handed back to its producer.

use std::time::Duration;

use thiserror::Error;

/// Lifecycle errors shared by all streamed components
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    /// `consume` was called twice on the same component
    #[error("component already started")]
    AlreadyStarted,

    /// `wait_for_close` gave up before the component finished closing
    #[error("action timed out")]
    Timeout,

    /// The component has no live connection to its target
    #[error("not connected to target source or sink")]
    NotConnected,

    /// The operation was abandoned because shutdown was requested
    #[error("operation cancelled")]
    Cancelled,
}

/// Reason attached to a failed acknowledgement
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The output lost (or never had) its connection
    #[error("not connected to target sink")]
    NotConnected,

    /// The target rejected or failed the write
    #[error("write failed: {0}")]
    Write(String),

    /// A decorator gave up waiting for its child
    #[error("experienced back pressure beyond: {limit:?}")]
    BackPressure {
        /// The configured back pressure limit
        limit: Duration,
    },

    /// A processor failed the batch
    #[error("processing failed: {0}")]
    Processing(String),

    /// The component holding the transaction shut down before finishing it
    #[error("component shut down before delivery")]
    ShuttingDown,

    /// The transaction was dropped without being acknowledged
    #[error("transaction dropped without acknowledgement")]
    Unacknowledged,
}

impl DeliveryError {
    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a processing error
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a back pressure error for the given limit
    pub fn back_pressure(limit: Duration) -> Self {
        Self::BackPressure { limit }
    }
}

/// Failure to hand an acknowledgement back to the producer
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AckError {
    /// The pipeline is tearing down and the producer stopped listening
    #[error("acknowledgement abandoned during shutdown")]
    Cancelled,

    /// The producer stopped listening while the pipeline was still running
    #[error("producer is no longer waiting for the acknowledgement")]
    ProducerGone,
}

/// Result type for component lifecycle operations
pub type Result<T> = std::result::Result<T, ComponentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(
            ComponentError::AlreadyStarted
                .to_string()
                .contains("already started")
        );
        assert!(ComponentError::Timeout.to_string().contains("timed out"));

        let err = DeliveryError::back_pressure(Duration::from_millis(10));
        assert_eq!(err.to_string(), "experienced back pressure beyond: 10ms");

        let err = DeliveryError::write("connection reset");
        assert!(err.to_string().contains("connection reset"));

        assert!(AckError::Cancelled.to_string().contains("shutdown"));
    }
}
