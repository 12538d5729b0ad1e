//! Input configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the pipeline input
///
/// ```toml
/// [input]
/// type = "generate"
/// payload = "hello"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    /// Emit messages from a field expression on an interval
    Generate(GenerateInputConfig),

    /// Read lines from stdin
    Stdin(StdinInputConfig),
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::Stdin(StdinInputConfig::default())
    }
}

impl InputConfig {
    /// Get the input type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Generate(_) => "generate",
            Self::Stdin(_) => "stdin",
        }
    }
}

/// Generate input configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerateInputConfig {
    /// Field expression resolved for every message
    /// Default: ""
    pub payload: String,

    /// Delay between messages
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Number of messages to emit, 0 means unlimited
    /// Default: 0
    pub count: u64,
}

impl Default for GenerateInputConfig {
    fn default() -> Self {
        Self {
            payload: String::new(),
            interval: Duration::from_secs(1),
            count: 0,
        }
    }
}

/// Stdin input configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StdinInputConfig {
    /// Group consecutive lines into one batch, ended by an empty line
    /// Default: false
    pub multipart: bool,

    /// Longest accepted line in bytes
    /// Default: 1MiB
    pub max_buffer: usize,
}

impl Default for StdinInputConfig {
    fn default() -> Self {
        Self {
            multipart: false,
            max_buffer: 1024 * 1024,
        }
    }
}
