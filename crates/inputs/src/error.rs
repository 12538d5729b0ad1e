//! Input error types

use ferry_core::FieldError;
use thiserror::Error;

/// Errors raised while building or running an input
#[derive(Debug, Error)]
pub enum InputError {
    /// A field expression did not parse
    #[error("failed to parse {field} expression: {source}")]
    Expression {
        /// Which setting held the expression
        field: &'static str,
        /// Parse failure
        #[source]
        source: FieldError,
    },

    /// Reading the source failed
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the configured buffer
    #[error("line exceeds max buffer of {limit} bytes")]
    LineTooLong {
        /// Configured limit
        limit: usize,
    },
}

impl InputError {
    /// Create an Expression error
    pub fn expression(field: &'static str, source: FieldError) -> Self {
        Self::Expression { field, source }
    }
}
