//! Processor error types

use thiserror::Error;

/// Errors raised while building or running processors
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No factory registered for the type
    #[error("unknown processor type '{type_name}', available: [{available}]")]
    UnknownType {
        /// Requested type
        type_name: String,
        /// Registered types, comma separated
        available: String,
    },

    /// Processing a batch failed
    #[error("processing failed: {0}")]
    Failed(String),
}

impl ProcessorError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a processing failure
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
