//! Stream assembly
//!
//! ```text
//! [InputWrapper] --> [ProcessorPipeline] --> [Output]
//! ```
//!
//! Shutdown cascades from the input: once the wrapper closes, its channel
//! closes, the pipeline workers drain and stop, and the output drains and
//! stops after them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ferry_config::{CacheConfig, Config, ResourcesConfig};
use ferry_core::{
    ComponentError, MemoryCache, MetricsRegistry, Resources, StreamedInput, StreamedOutput,
};
use ferry_inputs::{InputWrapper, new_input};
use ferry_outputs::new_output;
use ferry_processors::{ProcessorPipeline, default_registry};
use tokio::time::Instant;
use tracing::{info, warn};

/// How often `finished` re-arms its wait on the output
const FINISH_POLL: Duration = Duration::from_secs(3600);

/// A running input, pipeline and output
pub struct Stream {
    input: Arc<InputWrapper>,
    pipeline: Arc<ProcessorPipeline>,
    output: Arc<dyn StreamedOutput>,
    resources: Resources,
}

impl Stream {
    /// Build every component from `config` and start them
    ///
    /// With `keep_alive` the input wrapper outlives its input and waits for
    /// a replacement, otherwise the stream finishes with the input.
    pub fn start(config: &Config, metrics: &MetricsRegistry, keep_alive: bool) -> Result<Self> {
        let resources = build_resources(&config.resources);

        let output = new_output(&config.output, &resources, metrics)
            .context("failed to build output")?;

        let chain = default_registry()
            .chain(&config.pipeline)
            .context("failed to build processors")?;
        let pipeline = Arc::new(ProcessorPipeline::new(
            chain,
            config.pipeline.threads,
            metrics.register("pipeline"),
        ));

        let input = new_input(&config.input, metrics).context("failed to build input")?;
        let input = Arc::new(if keep_alive {
            InputWrapper::new(input)
        } else {
            InputWrapper::closing_when_exhausted(input)
        });

        pipeline.consume(input.transactions())?;
        output.consume(pipeline.transactions())?;

        info!(
            input = config.input.type_name(),
            output = config.output.type_name(),
            processors = config.pipeline.processors.len(),
            threads = config.pipeline.threads,
            "stream started"
        );

        Ok(Self {
            input,
            pipeline,
            output,
            resources,
        })
    }

    /// The wrapped input, for hot swapping
    pub fn input(&self) -> Arc<InputWrapper> {
        Arc::clone(&self.input)
    }

    pub fn output(&self) -> Arc<dyn StreamedOutput> {
        Arc::clone(&self.output)
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Resolves once the output has closed by itself
    pub async fn finished(&self) {
        while self.output.wait_for_close(FINISH_POLL).await.is_err() {}
    }

    /// Close the input and wait for everything downstream to drain
    ///
    /// Components still running at the deadline are told to stop and the
    /// call fails with [`ComponentError::Timeout`].
    pub async fn stop(&self, timeout: Duration) -> Result<(), ComponentError> {
        let deadline = Instant::now() + timeout;
        let remaining = || deadline.saturating_duration_since(Instant::now());

        self.input.close_async();

        let drained = async {
            self.input.wait_for_close(remaining()).await?;
            self.pipeline.wait_for_close(remaining()).await?;
            self.output.wait_for_close(remaining()).await
        }
        .await;

        if drained.is_err() {
            warn!(timeout = ?timeout, "stream did not drain in time, forcing close");
            self.pipeline.close_async();
            self.output.close_async();
            return Err(ComponentError::Timeout);
        }

        info!("stream stopped");
        Ok(())
    }
}

/// Build the named resources declared in config
pub fn build_resources(config: &ResourcesConfig) -> Resources {
    let mut resources = Resources::new();
    for (name, cache) in &config.caches {
        match cache {
            CacheConfig::Memory(c) => {
                resources.add_cache(name, Arc::new(MemoryCache::with_default_ttl(c.default_ttl)));
            }
        }
    }
    resources
}
