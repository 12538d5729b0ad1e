//! Cache capability
//!
//! Outputs that write into a key/value store go through the [`Cache`] trait so
//! the store can be swapped without touching the writer. [`MemoryCache`] is the
//! in-process implementation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;

/// Cache errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Key not present (or expired)
    #[error("key does not exist")]
    NotFound,

    /// The backing store failed
    #[error("cache backend: {0}")]
    Backend(String),
}

/// A value with an optional per-item TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlItem {
    pub value: Bytes,
    pub ttl: Option<Duration>,
}

impl TtlItem {
    /// Create an item
    pub fn new(value: impl Into<Bytes>, ttl: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            ttl,
        }
    }
}

/// Key/value store used by cache outputs
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a value
    async fn get(&self, key: &str) -> Result<Bytes, CacheError>;

    /// Store a value, overwriting any existing one
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Store several values
    ///
    /// The default implementation calls `set` for each item and stops at the
    /// first failure.
    async fn set_multi(&self, items: HashMap<String, TtlItem>) -> Result<(), CacheError> {
        for (key, item) in items {
            self.set(&key, item.value, item.ttl).await?;
        }
        Ok(())
    }

    /// Remove a value
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: Bytes,
    expires: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// In-memory cache with optional expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    /// Create a cache whose items never expire unless given a TTL
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with a TTL applied to items stored without one
    pub fn with_default_ttl(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the cache holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, entries: &mut HashMap<String, Entry>, key: String, item: TtlItem) {
        let expires = item
            .ttl
            .or(self.default_ttl)
            .map(|ttl| Instant::now() + ttl);
        entries.insert(
            key,
            Entry {
                value: item.value,
                expires,
            },
        );
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Bytes, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Err(CacheError::NotFound),
                Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict lazily
        self.entries.write().remove(key);
        Err(CacheError::NotFound)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        self.insert(&mut entries, key.to_string(), TtlItem { value, ttl });
        Ok(())
    }

    async fn set_multi(&self, items: HashMap<String, TtlItem>) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        for (key, item) in items {
            self.insert(&mut entries, key, item);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("a", Bytes::from_static(b"1"), None).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Bytes::from_static(b"1"));
        assert_eq!(cache.get("b").await, Err(CacheError::NotFound));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_set_multi_and_delete() {
        let cache = MemoryCache::new();
        let items = HashMap::from([
            ("a".to_string(), TtlItem::new("1", None)),
            ("b".to_string(), TtlItem::new("2", None)),
        ]);
        cache.set_multi(items).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get("a").await, Err(CacheError::NotFound));
        assert_eq!(cache.get("b").await.unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_item_ttl_expires() {
        let cache = MemoryCache::new();
        cache
            .set("short", Bytes::from_static(b"x"), Some(Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("short").await, Err(CacheError::NotFound));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_default_ttl_applies_when_item_has_none() {
        let cache = MemoryCache::with_default_ttl(Some(Duration::from_millis(10)));
        cache.set("k", Bytes::from_static(b"v"), None).await.unwrap();
        cache
            .set("long", Bytes::from_static(b"v"), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await, Err(CacheError::NotFound));
        assert!(cache.get("long").await.is_ok());
    }
}
