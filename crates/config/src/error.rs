//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to render the config as TOML
    #[error("failed to render config as toml: {0}")]
    TomlRenderError(#[from] toml::ser::Error),

    /// Failed to render the config as JSON
    #[error("failed to render config as json: {0}")]
    JsonRenderError(#[from] serde_json::Error),

    /// Validation error - output references a cache that isn't declared
    #[error("{component} '{name}' references unknown cache '{cache}'")]
    UnknownCache {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Name of the missing cache
        cache: String,
    },

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "output", "input")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an UnknownCache error
    pub fn unknown_cache(
        component: &'static str,
        name: impl Into<String>,
        cache: impl Into<String>,
    ) -> Self {
        Self::UnknownCache {
            component,
            name: name.into(),
            cache: cache.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_cache_error() {
        let err = ConfigError::unknown_cache("output", "cache", "missing");
        assert!(err.to_string().contains("unknown cache 'missing'"));
        assert!(err.to_string().contains("output 'cache'"));
    }

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("output", "drop_on", "output");
        assert_eq!(
            err.to_string(),
            "output 'drop_on' is missing required field 'output'"
        );
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("pipeline", "pipeline", "threads", "must be at least 1");
        assert!(err.to_string().contains("threads"));
        assert!(err.to_string().contains("must be at least 1"));
    }
}
