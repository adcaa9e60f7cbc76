//! Caller-owned cache of object store connections.
//!
//! Connections are keyed by `(profile, endpoint, region)` and created lazily
//! through the factory handed to [`BackendCache::new`]. The cache lives as long
//! as the caller keeps it; nothing is shared across independent caches.

use crate::error::Result;
use crate::io::cloud::store::ObjectStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identity of one remote storage connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BackendKey {
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl BackendKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

type StoreFactory = Box<dyn Fn(&BackendKey) -> Result<Arc<dyn ObjectStore>> + Send + Sync>;

pub struct BackendCache {
    factory: StoreFactory,
    stores: Mutex<HashMap<BackendKey, Arc<dyn ObjectStore>>>,
}

impl BackendCache {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&BackendKey) -> Result<Arc<dyn ObjectStore>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached store for `key`, creating it on first use.
    ///
    /// # Errors
    /// Returns whatever the factory returns when creating a new connection.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the cache is poisoned.
    pub fn get(&self, key: &BackendKey) -> Result<Arc<dyn ObjectStore>> {
        let mut stores = self.stores.lock().expect("backend cache mutex poisoned");
        if let Some(store) = stores.get(key) {
            return Ok(Arc::clone(store));
        }
        log::debug!("opening object store connection for {key:?}");
        let store = (self.factory)(key)?;
        stores.insert(key.clone(), Arc::clone(&store));
        Ok(store)
    }

    /// Number of live connections.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the cache is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.lock().expect("backend cache mutex poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cloud::MemoryObjectStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn creates_once_per_key() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let cache = BackendCache::new(move |_key| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryObjectStore::new()) as Arc<dyn ObjectStore>)
        });

        let east = BackendKey::new().with_region("us-east-1");
        let west = BackendKey::new().with_region("us-west-2");
        cache.get(&east).unwrap();
        cache.get(&east).unwrap();
        cache.get(&west).unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }
}
