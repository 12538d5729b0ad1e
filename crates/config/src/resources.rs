//! Shared resource configuration

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named resources shared between components
///
/// ```toml
/// [resources.caches.main]
/// type = "memory"
/// default_ttl = "5m"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Caches by name
    pub caches: BTreeMap<String, CacheConfig>,
}

/// Configuration for a single cache
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheConfig {
    /// In-process cache
    Memory(MemoryCacheConfig),
}

/// Memory cache configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// TTL applied to items stored without one. Unset means no expiry.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache() {
        let toml = r#"
[caches.a]
type = "memory"

[caches.b]
type = "memory"
default_ttl = "1m"
"#;
        let config: ResourcesConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.caches["a"],
            CacheConfig::Memory(MemoryCacheConfig { default_ttl: None })
        );
        assert_eq!(
            config.caches["b"],
            CacheConfig::Memory(MemoryCacheConfig {
                default_ttl: Some(Duration::from_secs(60))
            })
        );
    }
}
