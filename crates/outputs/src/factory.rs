//! Output construction from configuration

use std::sync::Arc;

use ferry_config::OutputConfig;
use ferry_core::{MetricsRegistry, Resources, StreamedOutput};

use crate::cache::cache_output;
use crate::drop::drop_output;
use crate::drop_on::{DropConditions, DropOn};
use crate::error::BuildError;
use crate::stdout::stdout_output;
use crate::websocket::websocket_output;

/// Build an output, registering its metrics under `output.<type>`
///
/// Wrapped outputs nest their names, so the child of a `drop_on` reports as
/// `output.drop_on.<type>`.
pub fn new_output(
    config: &OutputConfig,
    resources: &Resources,
    registry: &MetricsRegistry,
) -> Result<Arc<dyn StreamedOutput>, BuildError> {
    build(config, resources, registry, "output")
}

fn build(
    config: &OutputConfig,
    resources: &Resources,
    registry: &MetricsRegistry,
    prefix: &str,
) -> Result<Arc<dyn StreamedOutput>, BuildError> {
    let name = format!("{prefix}.{}", config.type_name());
    let metrics = registry.register(&name);

    let output: Arc<dyn StreamedOutput> = match config {
        OutputConfig::Stdout(c) => Arc::new(stdout_output(c, metrics)),
        OutputConfig::Drop => Arc::new(drop_output(metrics)),
        OutputConfig::Cache(c) => Arc::new(cache_output(c, resources, metrics)?),
        OutputConfig::Websocket(c) => Arc::new(websocket_output(c, metrics)?),
        OutputConfig::DropOn(c) => {
            let child_config = c.output.as_deref().ok_or(BuildError::MissingChild)?;
            let child = build(child_config, resources, registry, &name)?;
            let conditions = DropConditions {
                on_error: c.error,
                back_pressure: c.back_pressure,
            };
            Arc::new(DropOn::new(conditions, child, metrics))
        }
    };

    tracing::debug!(output = %name, "output built");
    Ok(output)
}
