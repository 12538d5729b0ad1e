//! Metrics reporting configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metrics reporting configuration
///
/// Counters are always collected and served by the admin API; this only
/// controls the periodic log report.
///
/// ```toml
/// [metrics]
/// interval = "60s"   # "0s" disables the report
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Reporting interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl MetricsConfig {
    /// Whether the periodic report runs
    pub fn enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_disables() {
        let config: MetricsConfig = toml::from_str("interval = \"0s\"").unwrap();
        assert!(!config.enabled());
        assert!(MetricsConfig::default().enabled());
    }
}
