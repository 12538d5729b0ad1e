//! Output configuration types
//!
//! Outputs nest: a `drop_on` output wraps a child output declared in its
//! own `output` table.
//!
//! ```toml
//! [output]
//! type = "drop_on"
//! error = true
//! back_pressure = "30s"
//!
//! [output.output]
//! type = "websocket"
//! url = "ws://localhost:8080/ingest"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cache key: unique per message within a process
pub const DEFAULT_CACHE_KEY: &str = r#"${!count("items")}-${!timestamp_unix_nano()}"#;

/// Configuration for a single output
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Write messages to stdout
    Stdout(StdoutOutputConfig),

    /// Discard everything
    Drop,

    /// Store messages in a cache resource
    Cache(CacheOutputConfig),

    /// Send messages as websocket binary frames
    Websocket(WebsocketOutputConfig),

    /// Turn child errors or back pressure into drops
    DropOn(DropOnOutputConfig),
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::Stdout(StdoutOutputConfig::default())
    }
}

impl OutputConfig {
    /// Get the output type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Stdout(_) => "stdout",
            Self::Drop => "drop",
            Self::Cache(_) => "cache",
            Self::Websocket(_) => "websocket",
            Self::DropOn(_) => "drop_on",
        }
    }
}

/// How stdout frames parts
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StdoutCodec {
    /// One part per line; multipart batches end with an empty line
    #[default]
    Lines,
    /// Raw bytes, no framing
    AllBytes,
}

/// Stdout output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StdoutOutputConfig {
    /// Framing
    /// Default: lines
    pub codec: StdoutCodec,
}

/// Cache output configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheOutputConfig {
    /// Name of the cache resource
    /// Required
    pub target: String,

    /// Key field expression
    /// Default: `${!count("items")}-${!timestamp_unix_nano()}`
    pub key: String,

    /// TTL field expression, empty means the cache default
    /// Default: ""
    pub ttl: String,

    /// Concurrent writes
    /// Default: 64
    pub max_in_flight: usize,
}

impl Default for CacheOutputConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            key: DEFAULT_CACHE_KEY.to_string(),
            ttl: String::new(),
            max_in_flight: 64,
        }
    }
}

/// Websocket output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebsocketOutputConfig {
    /// Target url (`ws://` or `wss://`)
    /// Required
    pub url: String,
}

/// DropOn output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DropOnOutputConfig {
    /// Drop messages the child fails to deliver
    /// Default: false
    pub error: bool,

    /// Drop messages the child hasn't accepted or finished within this
    /// duration. Unset disables the check.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub back_pressure: Option<Duration>,

    /// The wrapped output
    /// Required
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Box<OutputConfig>>,
}
