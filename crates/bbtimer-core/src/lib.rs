//! Countdown state machine and settings model for bbtimer
//!
//! This crate is the heart of bbtimer, containing:
//! - The countdown state machine (Ready -> Running -> Expired -> Ready)
//! - Warning and end notifications at exact second offsets
//! - The settings model, its validation and best-effort persistence
//! - Voice discovery and the free-running backup counter
//!
//! The engine never reads the clock or schedules anything itself: callers
//! pass the current time in and drive the periodic tasks, which keeps every
//! transition deterministic.

mod engine;
mod events;
mod persistence;
mod session;
mod settings;
mod voices;

pub use engine::*;
pub use events::*;
pub use persistence::*;
pub use session::*;
pub use settings::*;
pub use voices::*;
