//! Shared resources
//!
//! Named capabilities (currently caches) that components look up at
//! construction time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::Cache;

/// Named resources shared between components
#[derive(Clone, Default)]
pub struct Resources {
    caches: HashMap<String, Arc<dyn Cache>>,
}

impl Resources {
    /// Create an empty resource set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache under `name`, replacing any previous one
    #[must_use]
    pub fn with_cache(mut self, name: impl Into<String>, cache: Arc<dyn Cache>) -> Self {
        self.caches.insert(name.into(), cache);
        self
    }

    /// Register a cache under `name`, replacing any previous one
    pub fn add_cache(&mut self, name: impl Into<String>, cache: Arc<dyn Cache>) {
        self.caches.insert(name.into(), cache);
    }

    /// Whether a cache named `name` exists
    pub fn probe_cache(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Look up a cache by name
    pub fn cache(&self, name: &str) -> Option<Arc<dyn Cache>> {
        self.caches.get(name).cloned()
    }

    /// Registered cache names, sorted
    pub fn cache_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.caches.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("caches", &self.cache_names())
            .finish()
    }
}
