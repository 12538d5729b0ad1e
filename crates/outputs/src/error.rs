//! Output error types

use ferry_core::{CacheError, ComponentError, DeliveryError, FieldError};
use thiserror::Error;

/// Errors returned by a [`Writer`](crate::Writer)
#[derive(Debug, Error)]
pub enum WriteError {
    /// No live connection
    #[error("not connected to target sink")]
    NotConnected,

    /// Connection attempt failed
    #[error("connection failed: {0}")]
    Connect(String),

    /// The target rejected or failed the write
    #[error("write failed: {0}")]
    Write(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache backend error
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl WriteError {
    /// Create a connection error
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}

impl From<WriteError> for DeliveryError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::NotConnected => DeliveryError::NotConnected,
            WriteError::Write(msg) => DeliveryError::Write(msg),
            other => DeliveryError::Write(other.to_string()),
        }
    }
}

/// Errors raised while constructing an output
#[derive(Debug, Error)]
pub enum BuildError {
    /// A field expression did not parse
    #[error("failed to parse {field} expression: {source}")]
    Expression {
        /// Which setting held the expression
        field: &'static str,
        /// Parse failure
        #[source]
        source: FieldError,
    },

    /// The referenced cache resource does not exist
    #[error("cache resource '{0}' was not found")]
    CacheNotFound(String),

    /// A `drop_on` output has no child
    #[error("drop_on output requires a child output")]
    MissingChild,

    /// An invalid setting
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// What was wrong
        message: String,
    },

    /// The child component refused to start
    #[error(transparent)]
    Component(#[from] ComponentError),
}

impl BuildError {
    /// Create an Expression error
    pub fn expression(field: &'static str, source: FieldError) -> Self {
        Self::Expression { field, source }
    }

    /// Create an Invalid error
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}
