//! Input construction from configuration

use std::sync::Arc;

use ferry_config::InputConfig;
use ferry_core::{MetricsRegistry, StreamedInput};

use crate::error::InputError;
use crate::generate::generate_input;
use crate::stdin::stdin_input;

/// Build an input, registering its metrics under `input.<type>`
pub fn new_input(
    config: &InputConfig,
    registry: &MetricsRegistry,
) -> Result<Arc<dyn StreamedInput>, InputError> {
    let metrics = registry.register(&format!("input.{}", config.type_name()));

    let input: Arc<dyn StreamedInput> = match config {
        InputConfig::Generate(c) => Arc::new(generate_input(c, metrics)?),
        InputConfig::Stdin(c) => Arc::new(stdin_input(c, metrics)),
    };
    Ok(input)
}
