//! Processor pipeline configuration

use serde::{Deserialize, Serialize};

/// Processors applied between input and output
///
/// ```toml
/// [pipeline]
/// threads = 2
///
/// [[pipeline.processors]]
/// type = "decode"
/// scheme = "base64"
/// parts = [0]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent processing workers
    /// Default: 1
    pub threads: usize,

    /// Processors, applied in order
    pub processors: Vec<ProcessorConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            processors: Vec::new(),
        }
    }
}

/// Configuration for a single processor
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorConfig {
    /// Decode message parts
    Decode(DecodeProcessorConfig),
}

impl ProcessorConfig {
    /// Get the processor type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
        }
    }
}

/// Decode processor configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DecodeProcessorConfig {
    /// Decoding scheme
    /// Default: "base64"
    pub scheme: String,

    /// Part indexes to decode, negative counts from the end. Empty means all.
    /// Default: []
    pub parts: Vec<isize>,
}

impl Default for DecodeProcessorConfig {
    fn default() -> Self {
        Self {
            scheme: "base64".to_string(),
            parts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.threads, 1);
        assert!(config.processors.is_empty());
    }

    #[test]
    fn test_decode_processor() {
        let toml = r#"
[[processors]]
type = "decode"
parts = [-1]
"#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        let ProcessorConfig::Decode(decode) = &config.processors[0];
        assert_eq!(decode.scheme, "base64");
        assert_eq!(decode.parts, vec![-1]);
        assert_eq!(config.processors[0].type_name(), "decode");
    }
}
