//! Outputs built from configuration, driven end to end

use std::sync::Arc;
use std::time::Duration;

use ferry_config::{CacheOutputConfig, DropOnOutputConfig, OutputConfig, WebsocketOutputConfig};
use ferry_core::{
    Batch, Cache, MemoryCache, MetricsRegistry, Part, Resources, Transaction, transaction_channel,
};
use ferry_outputs::{BuildError, new_output};
use tokio::time::timeout;

fn cache_config(target: &str) -> OutputConfig {
    OutputConfig::Cache(CacheOutputConfig {
        target: target.into(),
        key: r#"${! meta("id") }"#.into(),
        max_in_flight: 2,
        ..CacheOutputConfig::default()
    })
}

#[tokio::test]
async fn test_drop_on_cache_delivers_to_resource() {
    let cache = Arc::new(MemoryCache::new());
    let resources = Resources::new().with_cache("store", cache.clone());
    let registry = MetricsRegistry::new();

    let config = OutputConfig::DropOn(DropOnOutputConfig {
        error: true,
        back_pressure: Some(Duration::from_secs(1)),
        output: Some(Box::new(cache_config("store"))),
    });
    let output = new_output(&config, &resources, &registry).unwrap();

    let (tx, rx) = transaction_channel();
    output.consume(rx).unwrap();

    for id in ["a", "b", "c"] {
        let (tran, ack) = Transaction::new(Batch::single(
            Part::from(format!("value-{id}").into_bytes()).with_metadata("id", id),
        ));
        tx.send(tran).await.unwrap();
        let result = timeout(Duration::from_secs(2), ack).await.unwrap();
        assert_eq!(result, Ok(()));
    }

    assert_eq!(cache.get("b").await.unwrap().as_ref(), b"value-b");

    let snapshot = registry.snapshot();
    assert_eq!(snapshot["output.drop_on"].sent, 3);
    assert_eq!(snapshot["output.drop_on.cache"].sent, 3);

    output.close_async();
    output.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_unknown_cache_is_a_build_error() {
    let err = new_output(
        &cache_config("absent"),
        &Resources::new(),
        &MetricsRegistry::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, BuildError::CacheNotFound(name) if name == "absent"));
}

#[tokio::test]
async fn test_drop_on_requires_child() {
    let config = OutputConfig::DropOn(DropOnOutputConfig::default());
    let err = new_output(&config, &Resources::new(), &MetricsRegistry::new())
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::MissingChild));
}

#[tokio::test]
async fn test_websocket_starts_disconnected() {
    let config = OutputConfig::Websocket(WebsocketOutputConfig {
        url: "ws://127.0.0.1:9/ingest".into(),
    });
    let output = new_output(&config, &Resources::new(), &MetricsRegistry::new()).unwrap();
    assert!(!output.connected());
    output.close_async();
    output.wait_for_close(Duration::from_secs(1)).await.unwrap();
}
