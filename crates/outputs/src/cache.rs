//! Cache output
//!
//! Stores every part in a cache resource under a key computed from a field
//! expression, with an optional per-message TTL expression. Single-part
//! batches use `set`; larger batches go through `set_multi` in one call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ferry_config::CacheOutputConfig;
use ferry_core::{Batch, Cache, ComponentMetrics, Field, Resources, TtlItem};

use crate::async_writer::AsyncWriter;
use crate::error::{BuildError, WriteError};
use crate::writer::Writer;

/// Writes message parts into a cache
#[derive(Clone)]
pub struct CacheWriter {
    target: String,
    cache: Arc<dyn Cache>,
    key: Field,
    ttl: Field,
}

impl CacheWriter {
    /// Build from config, resolving the target cache in `resources`
    pub fn new(config: &CacheOutputConfig, resources: &Resources) -> Result<Self, BuildError> {
        let key = Field::parse(&config.key).map_err(|e| BuildError::expression("key", e))?;
        let ttl = Field::parse(&config.ttl).map_err(|e| BuildError::expression("ttl", e))?;
        let cache = resources
            .cache(&config.target)
            .ok_or_else(|| BuildError::CacheNotFound(config.target.clone()))?;

        Ok(Self {
            target: config.target.clone(),
            cache,
            key,
            ttl,
        })
    }

    fn ttl_for(&self, index: usize, batch: &Batch) -> Result<Option<Duration>, WriteError> {
        let raw = self.ttl.string(index, batch);
        if raw.is_empty() {
            return Ok(None);
        }
        humantime::parse_duration(&raw).map(Some).map_err(|e| {
            tracing::debug!(cache = %self.target, error = %e, "invalid duration string for ttl field");
            WriteError::write(format!("ttl field: {e}"))
        })
    }
}

#[async_trait]
impl Writer for CacheWriter {
    async fn connect(&mut self) -> Result<(), WriteError> {
        tracing::info!(cache = %self.target, "writing message parts as items in cache");
        Ok(())
    }

    async fn write(&mut self, batch: &Batch) -> Result<(), WriteError> {
        if batch.len() > 1 {
            let mut items = HashMap::with_capacity(batch.len());
            for (i, part) in batch.iter().enumerate() {
                let ttl = self.ttl_for(i, batch)?;
                items.insert(self.key.string(i, batch), TtlItem::new(part.data().clone(), ttl));
            }
            self.cache.set_multi(items).await?;
            return Ok(());
        }

        let Some(part) = batch.get(0) else {
            return Ok(());
        };
        let ttl = self.ttl_for(0, batch)?;
        self.cache
            .set(&self.key.string(0, batch), part.data().clone(), ttl)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}

/// Build the cache output
pub fn cache_output(
    config: &CacheOutputConfig,
    resources: &Resources,
    metrics: Arc<ComponentMetrics>,
) -> Result<AsyncWriter, BuildError> {
    let writer = CacheWriter::new(config, resources)?;
    Ok(AsyncWriter::new(
        "cache",
        config.max_in_flight,
        move || writer.clone(),
        metrics,
    ))
}
