//! Ferry - Processors
//!
//! Processors rewrite batches between the input and the output.
//!
//! ```text
//! [Batch] -> [Processor 1] -> [Processor 2] -> ... -> [Batch', Batch'', ...]
//! ```
//!
//! A processor may return the batch changed, split it into several, or
//! return none to drop it. [`ProcessorPipeline`] runs a [`Chain`] on a pool
//! of workers and keeps the acknowledgement contract intact:
//!
//! - no batches left: the transaction is acknowledged as success
//! - one batch: forwarded with the original acknowledgement
//! - several batches: each gets its own transaction, and the original is
//!   resolved with the first failure, or success
//!
//! # Adding a processor
//!
//! 1. Add a variant to `ProcessorConfig` in `ferry-config`.
//! 2. Implement [`Processor`] and a [`ProcessorFactory`].
//! 3. Register the factory in [`default_registry`].

mod chain;
mod decode;
mod error;
mod pipeline;
mod registry;

pub use chain::Chain;
pub use decode::{DecodeFactory, DecodeMetrics, DecodeProcessor, DecodeSnapshot, Scheme};
pub use error::ProcessorError;
pub use pipeline::ProcessorPipeline;
pub use registry::{ProcessorFactory, ProcessorRegistry, default_registry};

use async_trait::async_trait;
use ferry_core::Batch;

/// Result type for processor operations
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// A batch processor
///
/// Processors may be called from several workers at once and must not
/// block on I/O.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Process one batch into zero or more batches
    ///
    /// An error fails the transaction the batch came from.
    async fn process(&self, batch: Batch) -> ProcessorResult<Vec<Batch>>;

    /// Name for logging
    fn name(&self) -> &'static str;
}
