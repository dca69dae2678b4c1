//! Offline asset cache for bbtimer
//!
//! Keeps exactly one versioned generation of the app's assets:
//! - `install` precaches every manifest URL, all-or-nothing
//! - `activate` purges every other generation and claims open clients
//! - `handle` answers requests cache-first, falling back to the network,
//!   then to the cached fallback page, then to a synthetic 408
//!
//! The cache is only ever populated at install time. Responses fetched
//! while handling requests are never stored, so a deployment that changes
//! assets must bump the manifest version for clients to see them.

mod offline;

pub use offline::*;

use bbtimer_host_api::NetworkError;
use bbtimer_store::StoreError;
use thiserror::Error;

/// An asset could not be precached; the install attempt is abandoned
#[derive(Debug, Error)]
pub enum PrecacheError {
    #[error("Cannot cache {url} (status {status})")]
    BadStatus { url: String, status: u16 },

    #[error("Cannot cache {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: NetworkError,
    },
}

/// Offline cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Precache(#[from] PrecacheError),

    #[error("Generation {0} is not installed")]
    NotInstalled(String),

    #[error("Cache storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type CacheResult<T> = Result<T, CacheError>;
