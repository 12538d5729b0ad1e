//! Component metrics
//!
//! Lock-free counters every component updates on its hot path, plus a
//! registry that hands out one counter set per component name so the admin
//! API and the reporter can read them without knowing the component types.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

/// Counters for a single component
///
/// All fields use relaxed atomics; readers get a consistent-enough view via
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ComponentMetrics {
    /// Batches received from upstream
    pub received: AtomicU64,
    /// Batches delivered (acknowledged as successful)
    pub sent: AtomicU64,
    /// Batches that failed delivery
    pub failed: AtomicU64,
    /// Batches given up on (back pressure, errors turned into drops)
    pub dropped: AtomicU64,
    /// Successful connection attempts
    pub connects: AtomicU64,
    /// Failed connection attempts
    pub connect_failures: AtomicU64,
}

impl ComponentMetrics {
    /// Create metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ComponentMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
    pub connects: u64,
    pub connect_failures: u64,
}

/// Metrics for all components, keyed by component name
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    components: RwLock<BTreeMap<String, Arc<ComponentMetrics>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the counters for `name`
    ///
    /// Registering the same name twice returns the same counters, so a
    /// component rebuilt on reload keeps counting where it left off.
    pub fn register(&self, name: &str) -> Arc<ComponentMetrics> {
        if let Some(existing) = self.components.read().get(name) {
            return Arc::clone(existing);
        }
        Arc::clone(
            self.components
                .write()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(ComponentMetrics::new())),
        )
    }

    /// Snapshot every registered component
    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.components
            .read()
            .iter()
            .map(|(name, m)| (name.clone(), m.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = ComponentMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_sent();
        metrics.record_failed();
        metrics.record_dropped();
        metrics.record_connect();
        metrics.record_connect_failure();

        let snap = metrics.snapshot();
        assert_eq!(snap.received, 2);
        assert_eq!(snap.sent, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.connects, 1);
        assert_eq!(snap.connect_failures, 1);
    }

    #[test]
    fn test_registry_reuses_counters() {
        let registry = MetricsRegistry::new();
        let a = registry.register("output");
        a.record_sent();

        let again = registry.register("output");
        again.record_sent();
        registry.register("input");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["output"].sent, 2);
        assert_eq!(snapshot["input"], MetricsSnapshot::default());
    }
}
