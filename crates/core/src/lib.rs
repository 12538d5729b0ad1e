//! Ferry - Core
//!
//! The transaction contract every input, processor and output plugs into.
//!
//! # Architecture
//!
//! ```text
//! [Input] --Transaction--> [Processors] --Transaction--> [Output]
//!    ^                                                      |
//!    +------------------- ack (exactly once) ---------------+
//! ```
//!
//! A [`Transaction`] pairs an `Arc<Batch>` with a single-use acknowledgement
//! handle. Whoever holds the transaction last resolves it: by calling
//! [`Transaction::ack`], or implicitly by dropping it, which reports a
//! failure so the producer can retry.
//!
//! # Key Design
//!
//! - **By-value ack**: acknowledging consumes the handle, so a second ack
//!   does not compile
//! - **Ack on drop**: an unacknowledged transaction fails itself when dropped
//! - **Rendezvous channels**: transaction channels hold at most one item so
//!   a stalled consumer is visible to the producer as backpressure
//! - **Uniform lifecycle**: every component exposes `consume`, `connected`,
//!   `close_async` and `wait_for_close`

mod cache;
mod component;
mod error;
mod message;
mod metrics;
mod reporter;
mod resources;
mod transaction;

pub mod field;
pub mod shutdown;

pub use cache::{Cache, CacheError, MemoryCache, TtlItem};
pub use component::{StreamedInput, StreamedOutput};
pub use error::{AckError, ComponentError, DeliveryError, Result};
pub use field::{Field, FieldError};
pub use message::{Batch, Part};
pub use metrics::{ComponentMetrics, MetricsRegistry, MetricsSnapshot};
pub use reporter::MetricsReporter;
pub use resources::Resources;
pub use shutdown::ShutdownSignal;
pub use transaction::{
    AckReceiver, AckResult, AckSender, Transaction, TransactionReceiver, TransactionSender,
    transaction_channel,
};

/// Capacity of transaction channels
///
/// One slot is the closest a bounded async channel gets to a rendezvous.
pub const TRANSACTION_CHANNEL_SIZE: usize = 1;
