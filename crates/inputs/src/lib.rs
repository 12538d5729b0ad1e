//! Ferry - Inputs
//!
//! Sources of transactions and the [`InputWrapper`] that lets the running
//! input be replaced without downstream components noticing.
//!
//! | Type | Produces |
//! |------|----------|
//! | `generate` | a message from a field expression every `interval` |
//! | `stdin` | one message per line, or one batch per paragraph with `multipart` |

mod error;
mod factory;
mod generate;
mod stdin;
mod task;
mod wrapper;

pub use error::InputError;
pub use factory::new_input;
pub use generate::generate_input;
pub use stdin::{reader_input, stdin_input};
pub use task::TaskInput;
pub use wrapper::InputWrapper;
