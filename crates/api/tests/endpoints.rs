//! Admin API endpoint tests, driven through the router without a socket

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use ferry_api::{AdminApi, endpoint_handler};
use ferry_config::{Config, HttpConfig};
use ferry_core::{
    MetricsRegistry, Result, StreamedInput, StreamedOutput, TransactionReceiver,
    TransactionSender, transaction_channel,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct Probe {
    connected: AtomicBool,
    _tx: TransactionSender,
    rx: TransactionReceiver,
}

impl Probe {
    fn new(connected: bool) -> Arc<Self> {
        let (tx, rx) = transaction_channel();
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            _tx: tx,
            rx,
        })
    }
}

#[async_trait]
impl StreamedInput for Probe {
    fn transactions(&self) -> TransactionReceiver {
        self.rx.clone()
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn close_async(&self) {}

    async fn wait_for_close(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl StreamedOutput for Probe {
    fn consume(&self, _transactions: TransactionReceiver) -> Result<()> {
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn close_async(&self) {}

    async fn wait_for_close(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

async fn get(api: &AdminApi, path: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = api.router().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn api() -> AdminApi {
    let api = AdminApi::new(&HttpConfig::default());
    api.register_defaults("1.2.3");
    api
}

#[tokio::test]
async fn test_ping_under_both_paths() {
    let api = api();

    assert_eq!(get(&api, "/ping").await, (StatusCode::OK, "pong".to_string()));
    assert_eq!(
        get(&api, "/ferry/ping").await,
        (StatusCode::OK, "pong".to_string())
    );
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let api = api();

    let (status, body) = get(&api, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("NOT_FOUND"));

    // The prefix alone is not an endpoint
    let (status, _) = get(&api, "/ferryping").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_version() {
    let api = api();

    let (status, body) = get(&api, "/version").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["version"], "1.2.3");
}

#[tokio::test]
async fn test_endpoints_lists_registrations() {
    let api = api();
    api.register_endpoint(
        "/custom",
        "A custom endpoint.",
        endpoint_handler(|_| async { "custom" }),
    );

    let (status, body) = get(&api, "/endpoints").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["/custom"], "A custom endpoint.");
    assert_eq!(json["/ping"], "Ping me.");
}

#[tokio::test]
async fn test_register_replaces_at_runtime() {
    let api = api();
    let router = api.router();

    api.register_endpoint("/ping", "Ping me.", endpoint_handler(|_| async { "PONG" }));

    let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"PONG");
}

#[tokio::test]
async fn test_ready_reflects_components() {
    let api = api();
    let input = Probe::new(false);
    let output = Probe::new(true);
    api.register_readiness(input.clone(), output.clone());

    let (status, body) = get(&api, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("input not connected"));

    input.connected.store(true, Ordering::Relaxed);
    output.connected.store(false, Ordering::Relaxed);
    let (status, body) = get(&api, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("output not connected"));

    output.connected.store(true, Ordering::Relaxed);
    assert_eq!(get(&api, "/ready").await, (StatusCode::OK, "OK".to_string()));
}

#[tokio::test]
async fn test_metrics_snapshot() {
    let api = api();
    let metrics = Arc::new(MetricsRegistry::new());
    let output = metrics.register("output.stdout");
    output.record_received();
    output.record_sent();
    api.register_metrics(Arc::clone(&metrics));

    for path in ["/stats", "/metrics"] {
        let (status, body) = get(&api, path).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["output.stdout"]["sent"], 1);
        assert_eq!(json["output.stdout"]["received"], 1);
    }
}

#[tokio::test]
async fn test_debug_config_only_when_enabled() {
    let config = Arc::new(Config::default());

    let api = api();
    api.register_debug_config(Arc::clone(&config));
    assert_eq!(get(&api, "/debug/config/json").await.0, StatusCode::NOT_FOUND);

    let http = HttpConfig {
        debug_endpoints: true,
        ..HttpConfig::default()
    };
    let api = AdminApi::new(&http);
    api.register_debug_config(config);

    let (status, body) = get(&api, "/debug/config/json").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["http"]["root_path"], "/ferry");

    let (status, body) = get(&api, "/ferry/debug/config/toml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("[http]"));
}

#[tokio::test]
async fn test_disabled_server_returns_on_cancel() {
    let http = HttpConfig {
        enabled: false,
        ..HttpConfig::default()
    };
    let api = AdminApi::new(&http);
    let cancel = CancellationToken::new();

    let serve = {
        let cancel = cancel.clone();
        async move { api.serve(cancel).await }
    };
    let handle = tokio::spawn(serve);
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_serve_reports_bind_failure() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http = HttpConfig {
        address: taken.local_addr().unwrap().to_string(),
        ..HttpConfig::default()
    };
    let api = AdminApi::new(&http);

    let result = api.serve(CancellationToken::new()).await;
    assert!(matches!(result, Err(ferry_api::ApiError::Bind { .. })));
}
