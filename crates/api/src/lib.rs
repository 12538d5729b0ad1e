//! Ferry - Admin API
//!
//! A small HTTP API for operating a running pipeline.
//!
//! # Endpoints
//!
//! | Path | Description |
//! |------|-------------|
//! | `/ping` | liveness, answers `pong` |
//! | `/version` | service version |
//! | `/endpoints` | map of registered paths to descriptions |
//! | `/ready` | 200 when the input and output are connected, else 503 |
//! | `/stats`, `/metrics` | component counters as JSON |
//! | `/debug/config/json`, `/debug/config/toml` | loaded config (`debug_endpoints` only) |
//!
//! Every path is also served under the configured `root_path`, so with the
//! default `/ferry` both `/ping` and `/ferry/ping` work.
//!
//! # Example
//!
//! ```ignore
//! let api = AdminApi::new(&config.http);
//! api.register_defaults(env!("CARGO_PKG_VERSION"));
//! api.register_metrics(metrics);
//! api.serve(cancel).await?;
//! ```

mod endpoints;
mod error;
mod server;

pub use endpoints::VersionResponse;
pub use error::{ApiError, ErrorResponse};
pub use server::{AdminApi, EndpointHandler, endpoint_handler};
