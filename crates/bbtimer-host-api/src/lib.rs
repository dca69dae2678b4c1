//! Platform capability traits for bbtimer
//!
//! This crate defines the capability-based interface between the timer core,
//! the offline cache and the platform they run on. It contains no platform
//! code itself; see `bbtimer-host-native` for concrete adapters and [`mock`]
//! for recording test doubles.

mod capabilities;
mod mock;
mod traits;
mod types;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
pub use types::*;
