//! Decode processor
//!
//! Decodes selected parts of each batch. Parts that fail to decode are
//! logged and left as they were; the batch is always forwarded unless it is
//! empty.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ferry_config::{DecodeProcessorConfig, ProcessorConfig};
use ferry_core::Batch;

use crate::registry::ProcessorFactory;
use crate::{Processor, ProcessorError, ProcessorResult};

/// Supported decoding schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Standard base64 with padding
    Base64,
}

impl Scheme {
    fn decode(self, data: &[u8]) -> Result<Vec<u8>, String> {
        match self {
            Self::Base64 => {
                // Line breaks are tolerated, as in wrapped base64 output
                let compact: Vec<u8> = data
                    .iter()
                    .copied()
                    .filter(|b| !matches!(b, b'\r' | b'\n'))
                    .collect();
                STANDARD.decode(compact).map_err(|e| e.to_string())
            }
        }
    }
}

impl FromStr for Scheme {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(Self::Base64),
            other => Err(ProcessorError::config(format!(
                "decode scheme not recognised: {other}"
            ))),
        }
    }
}

/// Decode processor counters
#[derive(Debug, Default)]
pub struct DecodeMetrics {
    count: AtomicU64,
    success: AtomicU64,
    error: AtomicU64,
    skipped: AtomicU64,
    sent: AtomicU64,
    parts_sent: AtomicU64,
}

/// Point-in-time copy of [`DecodeMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSnapshot {
    /// Batches processed
    pub count: u64,
    /// Parts decoded
    pub success: u64,
    /// Parts that failed to decode
    pub error: u64,
    /// Empty batches dropped
    pub skipped: u64,
    /// Batches forwarded
    pub sent: u64,
    /// Parts forwarded
    pub parts_sent: u64,
}

impl DecodeMetrics {
    /// Take a snapshot
    pub fn snapshot(&self) -> DecodeSnapshot {
        DecodeSnapshot {
            count: self.count.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            parts_sent: self.parts_sent.load(Ordering::Relaxed),
        }
    }
}

/// Decodes message parts with a [`Scheme`]
#[derive(Debug)]
pub struct DecodeProcessor {
    scheme: Scheme,
    parts: Vec<isize>,
    metrics: DecodeMetrics,
}

impl DecodeProcessor {
    /// Build from config; fails on an unknown scheme
    pub fn new(config: &DecodeProcessorConfig) -> ProcessorResult<Self> {
        Ok(Self {
            scheme: config.scheme.parse()?,
            parts: config.parts.clone(),
            metrics: DecodeMetrics::default(),
        })
    }

    /// Processor counters
    pub fn metrics(&self) -> &DecodeMetrics {
        &self.metrics
    }

    fn targets(&self, batch: &Batch) -> Vec<usize> {
        if self.parts.is_empty() {
            return (0..batch.len()).collect();
        }
        self.parts
            .iter()
            .filter_map(|&index| batch.resolve_index(index))
            .collect()
    }
}

#[async_trait]
impl Processor for DecodeProcessor {
    async fn process(&self, mut batch: Batch) -> ProcessorResult<Vec<Batch>> {
        self.metrics.count.fetch_add(1, Ordering::Relaxed);

        for index in self.targets(&batch) {
            let Some(part) = batch.get_mut(index) else {
                continue;
            };
            match self.scheme.decode(part.data()) {
                Ok(decoded) => {
                    part.set_data(decoded);
                    self.metrics.success.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::error!(part = index, error = %e, "failed to decode message part");
                    self.metrics.error.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        if batch.is_empty() {
            self.metrics.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(Vec::new());
        }

        self.metrics.sent.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .parts_sent
            .fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(vec![batch])
    }

    fn name(&self) -> &'static str {
        "decode"
    }
}

/// Factory for [`DecodeProcessor`]
pub struct DecodeFactory;

impl ProcessorFactory for DecodeFactory {
    fn create(&self, config: &ProcessorConfig) -> ProcessorResult<Box<dyn Processor>> {
        match config {
            ProcessorConfig::Decode(c) => Ok(Box::new(DecodeProcessor::new(c)?)),
        }
    }

    fn name(&self) -> &'static str {
        "decode"
    }
}
