use super::*;

use ferry_core::{DeliveryError, StreamedInput, TransactionReceiver};
use tokio::time::timeout;

fn input(text: &'static str, multipart: bool, max_buffer: usize) -> TaskInput {
    let config = StdinInputConfig {
        multipart,
        max_buffer,
    };
    reader_input(text.as_bytes(), &config, Arc::new(ComponentMetrics::new()))
}

async fn next(rx: &TransactionReceiver) -> Option<ferry_core::Transaction> {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("recv timed out")
        .ok()
}

fn payloads(tran: &ferry_core::Transaction) -> Vec<String> {
    tran.payload()
        .iter()
        .map(|p| String::from_utf8_lossy(p.data()).into_owned())
        .collect()
}

#[tokio::test]
async fn test_one_batch_per_line() {
    let input = input("foo\r\nbar\n\nbaz", false, 1024);
    let rx = input.transactions();
    let cancel = CancellationToken::new();

    for expected in ["foo", "bar", "baz"] {
        let tran = next(&rx).await.unwrap();
        assert_eq!(payloads(&tran), vec![expected]);
        tran.ack(&cancel, Ok(())).unwrap();
    }
    assert!(next(&rx).await.is_none());
    input.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_multipart_batches_end_at_blank_line() {
    let input = input("a\nb\n\nc\n\n\nd\ne", true, 1024);
    let rx = input.transactions();
    let cancel = CancellationToken::new();

    for expected in [vec!["a", "b"], vec!["c"], vec!["d", "e"]] {
        let tran = next(&rx).await.unwrap();
        assert_eq!(payloads(&tran), expected);
        tran.ack(&cancel, Ok(())).unwrap();
    }
    assert!(next(&rx).await.is_none());
}

#[tokio::test]
async fn test_rejected_batch_is_resent() {
    let input = input("only\n", false, 1024);
    let rx = input.transactions();
    let cancel = CancellationToken::new();

    let first = next(&rx).await.unwrap();
    first
        .ack(&cancel, Err(DeliveryError::write("nope")))
        .unwrap();

    let again = next(&rx).await.unwrap();
    assert_eq!(payloads(&again), vec!["only"]);
    again.ack(&cancel, Ok(())).unwrap();
    assert!(next(&rx).await.is_none());
}

#[tokio::test]
async fn test_line_too_long_stops_input() {
    let input = input("short\nthis line is too long\nnever\n", false, 8);
    let rx = input.transactions();

    let tran = next(&rx).await.unwrap();
    assert_eq!(payloads(&tran), vec!["short"]);
    tran.ack(&CancellationToken::new(), Ok(())).unwrap();

    assert!(next(&rx).await.is_none());
    input.wait_for_close(Duration::from_secs(1)).await.unwrap();
    assert!(!input.connected());
}

#[tokio::test]
async fn test_line_reader_limit_is_inclusive() {
    let mut lines = LineReader {
        reader: "12345678\n".as_bytes(),
        max_buffer: 8,
    };
    assert_eq!(lines.next_line().await.unwrap(), Some(b"12345678".to_vec()));
    assert_eq!(lines.next_line().await.unwrap(), None);
}

#[tokio::test]
async fn test_close_stops_pending_send() {
    let input = input("a\nb\n", false, 1024);
    tokio::time::sleep(Duration::from_millis(10)).await;

    input.close_async();
    input.wait_for_close(Duration::from_secs(1)).await.unwrap();
}
