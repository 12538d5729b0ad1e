//! Ferry Configuration
//!
//! TOML-based configuration loading with sensible defaults. An empty file is
//! a valid config: it reads lines from stdin and writes them to stdout.
//!
//! # Parsing
//!
//! ```
//! use ferry_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[output]\ntype = \"drop\"").unwrap();
//! assert_eq!(config.output.type_name(), "drop");
//! ```
//!
//! # Example
//!
//! ```toml
//! shutdown_timeout = "20s"
//!
//! [input]
//! type = "generate"
//! payload = '{"id":${! count("gen") }}'
//! interval = "100ms"
//!
//! [pipeline]
//! threads = 2
//!
//! [[pipeline.processors]]
//! type = "decode"
//! scheme = "base64"
//!
//! [output]
//! type = "drop_on"
//! back_pressure = "1s"
//!
//! [output.output]
//! type = "cache"
//! target = "main"
//!
//! [resources.caches.main]
//! type = "memory"
//! default_ttl = "5m"
//! ```

mod error;
mod http;
mod inputs;
mod logging;
mod metrics;
mod outputs;
mod pipeline;
mod resources;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::{ConfigError, Result};
pub use http::HttpConfig;
pub use inputs::{GenerateInputConfig, InputConfig, StdinInputConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::MetricsConfig;
pub use outputs::{
    CacheOutputConfig, DropOnOutputConfig, OutputConfig, StdoutCodec, StdoutOutputConfig,
    WebsocketOutputConfig,
};
pub use pipeline::{DecodeProcessorConfig, PipelineConfig, ProcessorConfig};
pub use resources::{CacheConfig, MemoryCacheConfig, ResourcesConfig};

/// Default time allowed for a graceful shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Time allowed for the whole pipeline to shut down
    /// Default: 20s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Logging configuration
    pub log: LogConfig,

    /// Admin HTTP API
    pub http: HttpConfig,

    /// Metrics reporting
    pub metrics: MetricsConfig,

    /// Where messages come from
    pub input: InputConfig,

    /// Processors applied between input and output
    pub pipeline: PipelineConfig,

    /// Where messages go
    pub output: OutputConfig,

    /// Named shared resources (caches)
    pub resources: ResourcesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            log: LogConfig::default(),
            http: HttpConfig::default(),
            metrics: MetricsConfig::default(),
            input: InputConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
            resources: ResourcesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks for:
    /// - Cache outputs referencing caches that are not declared
    /// - Zero `max_in_flight` or pipeline `threads`
    /// - `drop_on` outputs without a child
    /// - Websocket outputs without a url
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Render the configuration as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
