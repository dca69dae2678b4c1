//! Store trait definitions

use bbtimer_host_api::Response;

use crate::StoreResult;

/// Durable string key-value store (settings persistence)
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Storage for versioned cache generations.
///
/// A generation maps request keys to stored responses. Generations are
/// written whole, so readers never observe a partially populated one.
pub trait CacheStorage: Send + Sync {
    /// Keys of every stored generation
    fn generation_keys(&self) -> StoreResult<Vec<String>>;

    /// Whether a generation exists
    fn has_generation(&self, generation: &str) -> StoreResult<bool>;

    /// Create or replace a generation with exactly `entries`, atomically
    fn write_generation(&self, generation: &str, entries: &[(String, Response)]) -> StoreResult<()>;

    /// Look up one stored response
    fn lookup(&self, generation: &str, request_key: &str) -> StoreResult<Option<Response>>;

    /// Request keys stored in a generation, in insertion order
    fn entry_keys(&self, generation: &str) -> StoreResult<Vec<String>>;

    /// Delete a generation and its entries; returns whether it existed
    fn delete_generation(&self, generation: &str) -> StoreResult<bool>;
}
