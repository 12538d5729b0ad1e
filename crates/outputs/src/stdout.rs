//! Stdout output
//!
//! Writes every part to stdout. With the `lines` codec each part is
//! followed by a newline and multi-part batches end with an extra empty line,
//! so a reader can tell batches apart.

use std::sync::Arc;

use async_trait::async_trait;
use ferry_config::{StdoutCodec, StdoutOutputConfig};
use ferry_core::{Batch, ComponentMetrics};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::async_writer::AsyncWriter;
use crate::error::WriteError;
use crate::writer::Writer;

/// Writes parts to an async byte sink
pub struct StdoutWriter<W> {
    sink: W,
    codec: StdoutCodec,
}

impl<W> StdoutWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a writer over `sink`
    pub fn new(sink: W, codec: StdoutCodec) -> Self {
        Self { sink, codec }
    }

    /// Return the underlying sink
    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[async_trait]
impl<W> Writer for StdoutWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    async fn write(&mut self, batch: &Batch) -> Result<(), WriteError> {
        let mut buf = Vec::with_capacity(batch.total_bytes() + batch.len() + 1);
        for part in batch {
            buf.extend_from_slice(part.data());
            if self.codec == StdoutCodec::Lines {
                buf.push(b'\n');
            }
        }
        if self.codec == StdoutCodec::Lines && batch.len() > 1 {
            buf.push(b'\n');
        }

        self.sink.write_all(&buf).await?;
        self.sink.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        self.sink.flush().await?;
        Ok(())
    }
}

/// Build the stdout output: one worker, finishes pending writes on shutdown
pub fn stdout_output(config: &StdoutOutputConfig, metrics: Arc<ComponentMetrics>) -> AsyncWriter {
    let codec = config.codec;
    AsyncWriter::new(
        "stdout",
        1,
        move || StdoutWriter::new(tokio::io::stdout(), codec),
        metrics,
    )
    .with_no_cancel()
}
