//! Native host adapters for bbtimer
//!
//! Provides:
//! - HTTP fetches against the configured origin (reqwest)
//! - Sound playback through an external player command
//! - Speech through espeak-ng, including voice listing
//! - A worker host for the single-process daemon

mod audio;
mod network;
mod speech;
mod worker;

pub use audio::*;
pub use network::*;
pub use speech::*;
pub use worker::*;
