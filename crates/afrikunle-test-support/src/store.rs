//! Test stores — in-memory `KeyValueStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use afrikunle_core::error::ClientError;
use afrikunle_core::storage::KeyValueStore;
use async_trait::async_trait;

/// A store backed by a `HashMap`. Share it through an `Arc` to simulate an
/// application restart over the same device storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let store = Self::new();
        store.entries.lock().unwrap().extend(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
        );
        store
    }

    /// Returns the persisted value for `key`, bypassing the trait.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Returns every write received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_owned(), value.to_owned()));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// A store that fails every read and write. Useful for testing that storage
/// failures never reach the caller.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, ClientError> {
        Err(ClientError::CacheUnavailable("storage quota exceeded".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), ClientError> {
        Err(ClientError::CacheUnavailable("storage quota exceeded".into()))
    }
}
