//! Writer capability
//!
//! The minimal connect/write/close contract a connector implements.
//! [`AsyncWriter`](crate::AsyncWriter) turns it into a full streamed output.

use async_trait::async_trait;
use ferry_core::Batch;

use crate::error::WriteError;

/// A synchronous-style writer driven by [`AsyncWriter`](crate::AsyncWriter)
///
/// Each worker owns its own writer, so implementations never see concurrent
/// calls. `connect` must be callable again after a failed `write`.
#[async_trait]
pub trait Writer: Send {
    /// Establish a connection to the target
    async fn connect(&mut self) -> Result<(), WriteError>;

    /// Write one batch
    async fn write(&mut self, batch: &Batch) -> Result<(), WriteError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), WriteError>;
}

#[async_trait]
impl<W: Writer + ?Sized> Writer for Box<W> {
    async fn connect(&mut self) -> Result<(), WriteError> {
        (**self).connect().await
    }

    async fn write(&mut self, batch: &Batch) -> Result<(), WriteError> {
        (**self).write(batch).await
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        (**self).close().await
    }
}
