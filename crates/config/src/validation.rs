//! Configuration validation
//!
//! Validates config consistency:
//! - Cache outputs reference declared caches
//! - `max_in_flight` and pipeline `threads` are at least 1
//! - `drop_on` outputs have a child (checked recursively)
//! - Websocket outputs have a url

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::outputs::OutputConfig;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_pipeline(config)?;
    validate_output(config, &config.output)?;
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    if config.pipeline.threads == 0 {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "pipeline",
            "threads",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_output(config: &Config, output: &OutputConfig) -> Result<()> {
    let name = output.type_name();

    match output {
        OutputConfig::Stdout(_) | OutputConfig::Drop => {}
        OutputConfig::Cache(cache) => {
            if cache.target.is_empty() {
                return Err(ConfigError::missing_field("output", name, "target"));
            }
            if !config.resources.caches.contains_key(&cache.target) {
                return Err(ConfigError::unknown_cache("output", name, &cache.target));
            }
            if cache.max_in_flight == 0 {
                return Err(ConfigError::invalid_value(
                    "output",
                    name,
                    "max_in_flight",
                    "must be at least 1",
                ));
            }
        }
        OutputConfig::Websocket(ws) => {
            if ws.url.is_empty() {
                return Err(ConfigError::missing_field("output", name, "url"));
            }
        }
        OutputConfig::DropOn(drop_on) => {
            let Some(child) = drop_on.output.as_deref() else {
                return Err(ConfigError::missing_field("output", name, "output"));
            };
            validate_output(config, child)?;
        }
    }

    Ok(())
}
