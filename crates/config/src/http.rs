//! Admin HTTP API configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Admin HTTP API configuration
///
/// # Example
///
/// ```toml
/// [http]
/// enabled = true                 # default
/// address = "0.0.0.0:4195"       # default
/// root_path = "/ferry"           # default
/// read_timeout = "5s"            # default
/// debug_endpoints = false        # default
/// enable_cors = false            # default
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Serve the admin API
    /// Default: true
    pub enabled: bool,

    /// Listen address
    /// Default: "0.0.0.0:4195"
    pub address: String,

    /// Prefix every endpoint is also served under
    /// Default: "/ferry"
    pub root_path: String,

    /// Maximum time to handle a request
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Expose `/debug/config/*` endpoints
    /// Default: false
    pub debug_endpoints: bool,

    /// Allow cross-origin requests
    /// Default: false
    pub enable_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0:4195".to_string(),
            root_path: "/ferry".to_string(),
            read_timeout: Duration::from_secs(5),
            debug_endpoints: false,
            enable_cors: false,
        }
    }
}
