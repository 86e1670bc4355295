//! Keyed persistence for the small amount of learning state the pipeline
//! keeps between requests: the last-visit marker, the moment history table,
//! and the suggestion/rejection recency lists.
//!
//! Implementations must be safe to share across threads. Callers that serve
//! many users wrap one backing store in a [`ScopedStore`] per user.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

/// Get/set interface over string values.
pub trait LearningStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local store, used by tests and short-lived embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LearningStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Prefixes every key so several users can share one backing store.
pub struct ScopedStore {
    inner: Arc<dyn LearningStore>,
    prefix: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn LearningStore>, scope: impl AsRef<str>) -> Self {
        Self {
            inner,
            prefix: format!("{}/", scope.as_ref()),
        }
    }
}

impl LearningStore for ScopedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&format!("{}{key}", self.prefix))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(&format!("{}{key}", self.prefix), value)
    }
}

/// Read a JSON value, falling back to `T::default()` when the key is absent,
/// unreadable or malformed. Learning state is advisory, so a broken entry
/// must never take a recommendation pass down with it.
pub fn load_json<T>(store: &dyn LearningStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "discarding malformed learning state");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "learning store read failed");
            T::default()
        }
    }
}

/// Write a JSON value.
pub fn save_json<T: Serialize>(
    store: &dyn LearningStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Malformed {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &raw)
}
