//! In-memory and unavailable store implementations

use bbtimer_host_api::Response;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::{CacheStorage, KeyValueStore, StoreError, StoreResult};

/// Generation contents, kept in insertion order
type Generation = Vec<(String, Response)>;

/// In-memory store.
///
/// Used when the on-disk store cannot be opened, so settings still work
/// for the rest of the session.
#[derive(Default)]
pub struct MemoryStore {
    settings: Mutex<HashMap<String, String>>,
    generations: Mutex<BTreeMap<String, Generation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn settings(&self) -> StoreResult<MutexGuard<'_, HashMap<String, String>>> {
        self.settings
            .lock()
            .map_err(|_| StoreError::Unavailable("settings lock poisoned".into()))
    }

    fn generations(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, Generation>>> {
        self.generations
            .lock()
            .map_err(|_| StoreError::Unavailable("cache lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.settings()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.settings()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

impl CacheStorage for MemoryStore {
    fn generation_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.generations()?.keys().cloned().collect())
    }

    fn has_generation(&self, generation: &str) -> StoreResult<bool> {
        Ok(self.generations()?.contains_key(generation))
    }

    fn write_generation(&self, generation: &str, entries: &[(String, Response)]) -> StoreResult<()> {
        let mut contents: Generation = Vec::with_capacity(entries.len());
        for (key, response) in entries {
            contents.retain(|(k, _)| k != key);
            contents.push((key.clone(), response.clone()));
        }
        self.generations()?.insert(generation.to_string(), contents);
        Ok(())
    }

    fn lookup(&self, generation: &str, request_key: &str) -> StoreResult<Option<Response>> {
        Ok(self
            .generations()?
            .get(generation)
            .and_then(|g| g.iter().find(|(k, _)| k == request_key))
            .map(|(_, r)| r.clone()))
    }

    fn entry_keys(&self, generation: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .generations()?
            .get(generation)
            .map(|g| g.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    fn delete_generation(&self, generation: &str) -> StoreResult<bool> {
        Ok(self.generations()?.remove(generation).is_some())
    }
}

/// A store that is never available (storage disabled by the platform).
///
/// Every call fails, which callers must treat as "use defaults".
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn error() -> StoreError {
        StoreError::Unavailable("storage disabled".into())
    }
}

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(Self::error())
    }

    fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(Self::error())
    }

    fn is_healthy(&self) -> bool {
        false
    }
}

impl CacheStorage for UnavailableStore {
    fn generation_keys(&self) -> StoreResult<Vec<String>> {
        Err(Self::error())
    }

    fn has_generation(&self, _generation: &str) -> StoreResult<bool> {
        Err(Self::error())
    }

    fn write_generation(&self, _generation: &str, _entries: &[(String, Response)]) -> StoreResult<()> {
        Err(Self::error())
    }

    fn lookup(&self, _generation: &str, _request_key: &str) -> StoreResult<Option<Response>> {
        Err(Self::error())
    }

    fn entry_keys(&self, _generation: &str) -> StoreResult<Vec<String>> {
        Err(Self::error())
    }

    fn delete_generation(&self, _generation: &str) -> StoreResult<bool> {
        Err(Self::error())
    }
}
