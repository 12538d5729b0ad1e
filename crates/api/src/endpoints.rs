//! Built-in endpoints

use std::sync::{Arc, Weak};

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use ferry_config::Config;
use ferry_core::{MetricsRegistry, StreamedInput, StreamedOutput};
use serde::Serialize;

use crate::error::ApiError;
use crate::server::{AdminApi, Registry, endpoint_handler};

/// Body of `/version`
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// Service version
    pub version: String,
}

impl AdminApi {
    /// Register `/ping`, `/version` and `/endpoints`
    pub fn register_defaults(&self, version: &str) {
        self.register_endpoint("/ping", "Ping me.", endpoint_handler(|_| async { "pong" }));

        let version = version.to_string();
        self.register_endpoint(
            "/version",
            "Returns the service version.",
            endpoint_handler(move |_| {
                let body = VersionResponse {
                    version: version.clone(),
                };
                async move { Json(body) }
            }),
        );

        let registry: Weak<Registry> = Arc::downgrade(self.registry());
        self.register_endpoint(
            "/endpoints",
            "Returns this map of endpoints.",
            endpoint_handler(move |_| {
                let registry = registry.upgrade();
                async move {
                    match registry {
                        Some(registry) => Json(registry.descriptions()).into_response(),
                        None => ApiError::internal("endpoint registry dropped").into_response(),
                    }
                }
            }),
        );
    }

    /// Register `/stats` and `/metrics`
    pub fn register_metrics(&self, metrics: Arc<MetricsRegistry>) {
        for path in ["/stats", "/metrics"] {
            let metrics = Arc::clone(&metrics);
            self.register_endpoint(
                path,
                "Returns a JSON object of service metrics.",
                endpoint_handler(move |_| {
                    let snapshot = metrics.snapshot();
                    async move { Json(snapshot) }
                }),
            );
        }
    }

    /// Register `/ready`, answering 200 once both ends are connected
    pub fn register_readiness(
        &self,
        input: Arc<dyn StreamedInput>,
        output: Arc<dyn StreamedOutput>,
    ) {
        self.register_endpoint(
            "/ready",
            "Returns 200 OK if the input and output are connected, otherwise 503.",
            endpoint_handler(move |_| {
                let result = if !input.connected() {
                    Err(ApiError::Unavailable("input not connected".into()))
                } else if !output.connected() {
                    Err(ApiError::Unavailable("output not connected".into()))
                } else {
                    Ok((StatusCode::OK, "OK"))
                };
                async move { result }
            }),
        );
    }

    /// Register `/debug/config/json` and `/debug/config/toml`
    ///
    /// Does nothing unless `debug_endpoints` is enabled.
    pub fn register_debug_config(&self, config: Arc<Config>) {
        if !self.debug_endpoints() {
            return;
        }

        let json_config = Arc::clone(&config);
        self.register_endpoint(
            "/debug/config/json",
            "DEBUG: Returns the loaded config as JSON.",
            endpoint_handler(move |_| {
                let rendered = json_config.to_json();
                async move {
                    rendered
                        .map(|body| ([(header::CONTENT_TYPE, "application/json")], body))
                        .map_err(|e| ApiError::internal(e.to_string()))
                }
            }),
        );

        self.register_endpoint(
            "/debug/config/toml",
            "DEBUG: Returns the loaded config as TOML.",
            endpoint_handler(move |_| {
                let rendered = config.to_toml();
                async move {
                    rendered
                        .map(|body| ([(header::CONTENT_TYPE, "application/toml")], body))
                        .map_err(|e| ApiError::internal(e.to_string()))
                }
            }),
        );
    }
}
