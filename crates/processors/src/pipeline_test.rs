use super::*;

use ferry_core::{AckResult, Part};
use tokio::time::timeout;

use crate::{Processor, ProcessorError, ProcessorResult};

/// Splits a batch into one batch per part
struct Split;

#[async_trait]
impl Processor for Split {
    async fn process(&self, batch: Batch) -> ProcessorResult<Vec<Batch>> {
        Ok(batch.into_parts().into_iter().map(Batch::single).collect())
    }

    fn name(&self) -> &'static str {
        "split"
    }
}

/// Rejects batches whose first part is "bad"
struct RejectBad;

#[async_trait]
impl Processor for RejectBad {
    async fn process(&self, batch: Batch) -> ProcessorResult<Vec<Batch>> {
        match batch.get(0) {
            Some(part) if part.data().as_ref() == b"bad" => Err(ProcessorError::failed("bad input")),
            _ => Ok(vec![batch]),
        }
    }

    fn name(&self) -> &'static str {
        "reject_bad"
    }
}

struct Harness {
    pipeline: ProcessorPipeline,
    input: TransactionSender,
    output: TransactionReceiver,
    metrics: Arc<ComponentMetrics>,
    cancel: CancellationToken,
}

fn harness(processors: Vec<Box<dyn Processor>>, threads: usize) -> Harness {
    let metrics = Arc::new(ComponentMetrics::new());
    let pipeline = ProcessorPipeline::new(Chain::new(processors), threads, Arc::clone(&metrics));
    let (input, rx) = transaction_channel();
    pipeline.consume(rx).unwrap();
    let output = pipeline.transactions();

    Harness {
        pipeline,
        input,
        output,
        metrics,
        cancel: CancellationToken::new(),
    }
}

async fn submit(h: &Harness, batch: Batch) -> ferry_core::AckReceiver {
    let (tran, ack) = Transaction::new(batch);
    timeout(Duration::from_secs(1), h.input.send(tran))
        .await
        .unwrap()
        .unwrap();
    ack
}

async fn resolve(ack: ferry_core::AckReceiver) -> AckResult {
    timeout(Duration::from_secs(1), ack).await.expect("ack timed out")
}

async fn next(h: &Harness) -> Transaction {
    timeout(Duration::from_secs(1), h.output.recv())
        .await
        .expect("no output")
        .expect("output closed")
}

#[tokio::test]
async fn test_single_batch_keeps_original_ack() {
    let h = harness(Vec::new(), 1);
    let ack = submit(&h, Batch::single("a")).await;

    let tran = next(&h).await;
    assert_eq!(tran.payload().as_ref(), &Batch::single("a"));
    tran.ack(&h.cancel, Err(DeliveryError::write("downstream")))
        .unwrap();

    assert_eq!(resolve(ack).await, Err(DeliveryError::write("downstream")));
    assert_eq!(h.metrics.snapshot().sent, 1);
}

#[tokio::test]
async fn test_zero_batches_acks_success() {
    struct DropAll;

    #[async_trait]
    impl Processor for DropAll {
        async fn process(&self, _batch: Batch) -> ProcessorResult<Vec<Batch>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "drop_all"
        }
    }

    let h = harness(vec![Box::new(DropAll)], 1);
    let ack = submit(&h, Batch::single("gone")).await;

    assert_eq!(resolve(ack).await, Ok(()));
    assert!(h.output.is_empty());
    assert_eq!(h.metrics.snapshot().dropped, 1);
}

#[tokio::test]
async fn test_split_resolves_after_all_parts() {
    let h = harness(vec![Box::new(Split)], 1);
    let batch = Batch::new(vec![Part::from("a"), Part::from("b"), Part::from("c")]);
    let mut ack = submit(&h, batch).await;

    let mut children = Vec::new();
    for expected in ["a", "b", "c"] {
        let tran = next(&h).await;
        assert_eq!(tran.payload().get(0).unwrap().data().as_ref(), expected.as_bytes());
        children.push(tran);
    }

    let last = children.pop().unwrap();
    for tran in children {
        tran.ack(&h.cancel, Ok(())).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(ack.try_recv().is_none());

    last.ack(&h.cancel, Ok(())).unwrap();
    assert_eq!(resolve(ack).await, Ok(()));
}

#[tokio::test]
async fn test_split_first_failure_wins() {
    let h = harness(vec![Box::new(Split)], 1);
    let ack = submit(&h, Batch::from_payloads(["a", "b", "c"])).await;

    let results = [
        Ok(()),
        Err(DeliveryError::write("first")),
        Err(DeliveryError::write("second")),
    ];
    for result in results {
        next(&h).await.ack(&h.cancel, result).unwrap();
    }

    assert_eq!(resolve(ack).await, Err(DeliveryError::write("first")));
    assert_eq!(h.metrics.snapshot().failed, 1);
}

#[tokio::test]
async fn test_processing_error_fails_transaction() {
    let h = harness(vec![Box::new(RejectBad)], 1);

    let ack = submit(&h, Batch::single("bad")).await;
    assert_eq!(
        resolve(ack).await,
        Err(DeliveryError::processing("processing failed: bad input"))
    );

    let ack = submit(&h, Batch::single("good")).await;
    next(&h).await.ack(&h.cancel, Ok(())).unwrap();
    assert_eq!(resolve(ack).await, Ok(()));
}

#[tokio::test]
async fn test_workers_run_concurrently() {
    let h = harness(Vec::new(), 3);

    // Transactions held downstream do not stall the stage
    let mut acks = Vec::new();
    let mut held = Vec::new();
    for i in 0..3 {
        acks.push(submit(&h, Batch::single(format!("m{i}").into_bytes())).await);
        held.push(next(&h).await);
    }
    for tran in held {
        tran.ack(&h.cancel, Ok(())).unwrap();
    }
    for ack in acks {
        assert_eq!(resolve(ack).await, Ok(()));
    }
}

#[tokio::test]
async fn test_closing_inbound_closes_outbound() {
    let h = harness(Vec::new(), 2);
    drop(h.input);

    assert!(timeout(Duration::from_secs(1), h.output.recv()).await.unwrap().is_err());
    h.pipeline
        .wait_for_close(Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!h.pipeline.connected());
}

#[tokio::test]
async fn test_consume_twice_fails() {
    let h = harness(Vec::new(), 1);
    let (_tx, rx) = transaction_channel();
    assert_eq!(h.pipeline.consume(rx), Err(ComponentError::AlreadyStarted));
}

#[tokio::test]
async fn test_close_before_consume_closes_outbound() {
    let pipeline = ProcessorPipeline::new(Chain::empty(), 1, Arc::new(ComponentMetrics::new()));
    let output = pipeline.transactions();

    pipeline.close_async();
    pipeline
        .wait_for_close(Duration::from_millis(100))
        .await
        .unwrap();
    assert!(output.recv().await.is_err());
}
