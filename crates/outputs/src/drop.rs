//! Drop output - acknowledges and discards everything

use std::sync::Arc;

use async_trait::async_trait;
use ferry_core::{Batch, ComponentMetrics};

use crate::async_writer::AsyncWriter;
use crate::error::WriteError;
use crate::writer::Writer;

/// Writer that discards every batch
#[derive(Debug, Default, Clone, Copy)]
pub struct DropWriter;

#[async_trait]
impl Writer for DropWriter {
    async fn connect(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    async fn write(&mut self, _batch: &Batch) -> Result<(), WriteError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}

/// Build the drop output
pub fn drop_output(metrics: Arc<ComponentMetrics>) -> AsyncWriter {
    AsyncWriter::new("drop", 1, || DropWriter, metrics)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ferry_core::{StreamedOutput, Transaction, transaction_channel};

    use super::*;

    #[tokio::test]
    async fn test_drop_acknowledges_everything() {
        let metrics = Arc::new(ComponentMetrics::new());
        let output = drop_output(Arc::clone(&metrics));
        let (tx, rx) = transaction_channel();
        output.consume(rx).unwrap();

        for payload in ["a", "b", "c"] {
            let (tran, ack) = Transaction::new(Batch::single(payload));
            tx.send(tran).await.unwrap();
            assert_eq!(ack.await, Ok(()));
        }

        drop(tx);
        output.wait_for_close(Duration::from_secs(1)).await.unwrap();
        assert_eq!(metrics.snapshot().sent, 3);
    }
}
