//! Core events emitted by the engine for the view layer

use crate::TimerState;

/// Events emitted by the timer engine
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Countdown changed state
    StateChanged { from: TimerState, to: TimerState },

    /// Displayed whole seconds remaining changed
    RemainingChanged { remaining: u32 },

    /// Warning offset reached
    WarningIssued { warn_seconds: u32 },

    /// Countdown reached zero
    Expired,

    /// Backup counter advanced; value is always two digits
    CounterChanged { display: String },

    /// Voice list is stable and the catalog has been populated
    VoicesReady {
        count: usize,
        selected: Option<String>,
    },

    /// Settings surface opened
    SettingsOpened,

    /// New settings committed and persisted
    SettingsCommitted,

    /// Edits discarded
    SettingsCancelled,

    /// Theme changed (committed or previewed)
    ThemeChanged { dark: bool },

    /// Backup counter visibility changed
    CounterVisibilityChanged { visible: bool },
}
