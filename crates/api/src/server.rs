//! Admin API server
//!
//! Endpoints live in a registry consulted on every request, so they can be
//! added or replaced while the server runs. Every endpoint answers both at
//! its own path and under `root_path`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use ferry_config::HttpConfig;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Request handler stored in the endpoint registry
pub type EndpointHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async function as an [`EndpointHandler`]
pub fn endpoint_handler<F, Fut, R>(f: F) -> EndpointHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |request| {
        let fut = f(request);
        Box::pin(async move { fut.await.into_response() })
    })
}

struct Endpoint {
    description: String,
    handler: EndpointHandler,
}

pub(crate) struct Registry {
    root_path: String,
    endpoints: RwLock<BTreeMap<String, Endpoint>>,
}

impl Registry {
    fn lookup(&self, path: &str) -> Option<EndpointHandler> {
        let endpoints = self.endpoints.read();
        if let Some(endpoint) = endpoints.get(path) {
            return Some(Arc::clone(&endpoint.handler));
        }
        if self.root_path.is_empty() {
            return None;
        }
        path.strip_prefix(self.root_path.as_str())
            .filter(|rest| rest.starts_with('/'))
            .and_then(|rest| endpoints.get(rest))
            .map(|endpoint| Arc::clone(&endpoint.handler))
    }

    pub(crate) fn descriptions(&self) -> BTreeMap<String, String> {
        self.endpoints
            .read()
            .iter()
            .map(|(path, endpoint)| (path.clone(), endpoint.description.clone()))
            .collect()
    }
}

/// The admin HTTP API
pub struct AdminApi {
    config: HttpConfig,
    registry: Arc<Registry>,
}

impl AdminApi {
    /// Create the API with no endpoints registered
    pub fn new(config: &HttpConfig) -> Self {
        let root_path = config.root_path.trim_end_matches('/').to_string();
        Self {
            config: config.clone(),
            registry: Arc::new(Registry {
                root_path,
                endpoints: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Add an endpoint, replacing any handler already at `path`
    pub fn register_endpoint(
        &self,
        path: impl Into<String>,
        description: impl Into<String>,
        handler: EndpointHandler,
    ) {
        let path = path.into();
        let replaced = self
            .registry
            .endpoints
            .write()
            .insert(
                path.clone(),
                Endpoint {
                    description: description.into(),
                    handler,
                },
            )
            .is_some();
        tracing::debug!(path = %path, replaced, "registered endpoint");
    }

    /// Registered paths and their descriptions
    pub fn endpoints(&self) -> BTreeMap<String, String> {
        self.registry.descriptions()
    }

    /// Whether debug endpoints should be exposed
    pub fn debug_endpoints(&self) -> bool {
        self.config.debug_endpoints
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Build the router serving the registry
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&self.registry));

        if !self.config.read_timeout.is_zero() {
            router = router.layer(TimeoutLayer::new(self.config.read_timeout));
        }
        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::DELETE]),
            );
        }
        router
    }

    /// Serve until `cancel` fires
    ///
    /// When the API is disabled this only waits for cancellation.
    pub async fn serve(&self, cancel: CancellationToken) -> Result<(), ApiError> {
        if !self.config.enabled {
            tracing::info!("HTTP server disabled");
            cancel.cancelled().await;
            return Ok(());
        }

        let listener = TcpListener::bind(&self.config.address)
            .await
            .map_err(|source| ApiError::Bind {
                address: self.config.address.clone(),
                source,
            })?;
        tracing::info!(
            address = %self.config.address,
            root_path = %self.registry.root_path,
            "HTTP server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(ApiError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(registry): State<Arc<Registry>>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    match registry.lookup(&path) {
        Some(handler) => handler(request).await,
        None => ApiError::NotFound(path).into_response(),
    }
}
