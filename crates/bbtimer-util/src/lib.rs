//! Shared utilities for bbtimer
//!
//! This crate provides:
//! - ID types (CacheVersion, RunId)
//! - Epoch-millisecond time and countdown arithmetic
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
