//! Ferry - Outputs
//!
//! Everything downstream of the processors: the [`Writer`] capability, the
//! [`AsyncWriter`] adapter that turns a writer into a reconnecting streamed
//! output, the [`DropOn`] decorator and the concrete connectors.
//!
//! # Outputs
//!
//! | Type | Writer | Workers |
//! |------|--------|---------|
//! | `stdout` | [`StdoutWriter`] | 1, finishes pending writes on shutdown |
//! | `drop` | [`DropWriter`] | 1 |
//! | `cache` | [`CacheWriter`] | `max_in_flight` |
//! | `websocket` | [`WebsocketWriter`] | 1 |
//! | `drop_on` | wraps any output | - |
//!
//! Build one from configuration with [`new_output`].

mod async_writer;
mod cache;
mod drop;
mod drop_on;
mod error;
mod factory;
mod stdout;
mod websocket;
mod writer;

pub use async_writer::{AsyncWriter, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};
pub use cache::{CacheWriter, cache_output};
pub use drop::{DropWriter, drop_output};
pub use drop_on::{DropConditions, DropOn};
pub use error::{BuildError, WriteError};
pub use factory::new_output;
pub use stdout::{StdoutWriter, stdout_output};
pub use websocket::{WebsocketWriter, websocket_output};
pub use writer::Writer;
