//! Explicit registry of named caches.
//!
//! Created once at process start and passed to whoever needs a cache. Each
//! entry is type-erased and recovered by downcasting on lookup.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("cache '{key}' is registered with a different type than {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("no cache is registered under '{key}'")]
    NotRegistered { key: String },
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct CacheRegistry {
    caches: RwLock<HashMap<String, Entry>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cache registered under `key`, creating it with `init` if
    /// absent. `init` runs at most once per key.
    pub fn get_or_init<C, F>(&self, key: &str, init: F) -> Result<Arc<C>, RegistryError>
    where
        C: Any + Send + Sync,
        F: FnOnce() -> C,
    {
        if let Some(existing) = self.get::<C>(key)? {
            return Ok(existing);
        }

        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        // Check again: another caller may have registered it meanwhile.
        if let Some(entry) = caches.get(key) {
            return downcast(key, Arc::clone(entry));
        }

        let cache = Arc::new(init());
        caches.insert(key.to_string(), Arc::clone(&cache) as Entry);
        tracing::debug!(key, cache_type = type_name::<C>(), "cache registered");
        Ok(cache)
    }

    /// Look up an existing cache. `Ok(None)` when nothing is registered under
    /// `key`.
    pub fn get<C>(&self, key: &str) -> Result<Option<Arc<C>>, RegistryError>
    where
        C: Any + Send + Sync,
    {
        let entry = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Arc::clone);
        entry.map(|e| downcast(key, e)).transpose()
    }

    /// Like [`get`](Self::get), but a missing entry is an error.
    pub fn require<C>(&self, key: &str) -> Result<Arc<C>, RegistryError>
    where
        C: Any + Send + Sync,
    {
        self.get::<C>(key)?.ok_or_else(|| RegistryError::NotRegistered {
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.caches.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<C: Any + Send + Sync>(key: &str, entry: Entry) -> Result<Arc<C>, RegistryError> {
    entry.downcast::<C>().map_err(|_| RegistryError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<C>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn init_runs_once_per_key() {
        let registry = CacheRegistry::new();
        let inits = AtomicUsize::new(0);

        let a = registry
            .get_or_init("status", || {
                inits.fetch_add(1, Ordering::SeqCst);
                String::from("a")
            })
            .unwrap();
        let b = registry
            .get_or_init("status", || {
                inits.fetch_add(1, Ordering::SeqCst);
                String::from("b")
            })
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, "a");
        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_key_is_none() {
        let registry = CacheRegistry::new();
        assert!(registry.get::<String>("status").unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn require_reports_missing_key() {
        let registry = CacheRegistry::new();
        let err = registry.require::<String>("status").unwrap_err();
        assert_eq!(err, RegistryError::NotRegistered { key: "status".into() });

        registry.get_or_init("status", || String::from("a")).unwrap();
        assert_eq!(*registry.require::<String>("status").unwrap(), "a");
    }

    #[test]
    fn wrong_type_is_rejected() {
        let registry = CacheRegistry::new();
        registry.get_or_init("status", || 7_u64).unwrap();

        let err = registry.get::<String>("status").unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { ref key, .. } if key == "status"));
        assert!(registry.get_or_init("status", String::new).is_err());
        assert!(registry.contains("status"));
    }
}
