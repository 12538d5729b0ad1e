//! Stdin input
//!
//! Reads newline-delimited messages. Each line becomes a single-part batch;
//! with `multipart` consecutive lines are grouped into one batch that ends at
//! an empty line. A batch whose acknowledgement fails is sent again until it
//! succeeds or the input is closed.

use std::sync::Arc;
use std::time::Duration;

use ferry_config::StdinInputConfig;
use ferry_core::{Batch, ComponentMetrics, Part, TransactionSender};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::error::InputError;
use crate::task::{TaskInput, deliver};

/// Delay before resending a rejected batch
const RESEND_DELAY: Duration = Duration::from_millis(100);

/// Build the stdin input
pub fn stdin_input(config: &StdinInputConfig, metrics: Arc<ComponentMetrics>) -> TaskInput {
    reader_input(BufReader::new(tokio::io::stdin()), config, metrics)
}

/// Build a line input over any buffered reader
pub fn reader_input<R>(reader: R, config: &StdinInputConfig, metrics: Arc<ComponentMetrics>) -> TaskInput
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let lines = LineReader {
        reader,
        max_buffer: config.max_buffer,
    };
    let multipart = config.multipart;

    TaskInput::spawn("stdin", move |tx, stop| async move {
        read_loop(lines, multipart, tx, stop, metrics).await
    })
}

async fn read_loop<R>(
    mut lines: LineReader<R>,
    multipart: bool,
    tx: TransactionSender,
    stop: CancellationToken,
    metrics: Arc<ComponentMetrics>,
) -> Result<(), InputError>
where
    R: AsyncBufRead + Unpin,
{
    let mut pending: Vec<Part> = Vec::new();

    loop {
        let line = tokio::select! {
            _ = stop.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            // EOF flushes a partial multipart batch
            if !pending.is_empty() {
                send(&tx, &stop, Batch::new(pending), &metrics).await;
            }
            return Ok(());
        };

        if !multipart {
            if !line.is_empty() && !send(&tx, &stop, Batch::single(line), &metrics).await {
                return Ok(());
            }
            continue;
        }

        if !line.is_empty() {
            pending.push(Part::new(line));
        } else if !pending.is_empty() {
            let batch = Batch::new(std::mem::take(&mut pending));
            if !send(&tx, &stop, batch, &metrics).await {
                return Ok(());
            }
        }
    }
}

/// Send until acknowledged; false when stopping
async fn send(
    tx: &TransactionSender,
    stop: &CancellationToken,
    batch: Batch,
    metrics: &ComponentMetrics,
) -> bool {
    let batch = Arc::new(batch);
    metrics.record_received();

    loop {
        match deliver(tx, stop, Arc::clone(&batch)).await {
            None => return false,
            Some(Ok(())) => {
                metrics.record_sent();
                return true;
            }
            Some(Err(e)) => {
                metrics.record_failed();
                tracing::warn!(input = "stdin", error = %e, "message rejected, resending");
                tokio::select! {
                    _ = stop.cancelled() => return false,
                    _ = tokio::time::sleep(RESEND_DELAY) => {}
                }
            }
        }
    }
}

/// Newline framing with a per-line size limit
struct LineReader<R> {
    reader: R,
    max_buffer: usize,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Next line without its terminator, `None` at EOF
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, InputError> {
        let mut buf = Vec::new();
        let limit = self.max_buffer as u64 + 1;
        let n = (&mut self.reader).take(limit).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > self.max_buffer {
            return Err(InputError::LineTooLong {
                limit: self.max_buffer,
            });
        }
        Ok(Some(buf))
    }
}

#[cfg(test)]
#[path = "stdin_test.rs"]
mod stdin_test;
