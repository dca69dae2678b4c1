//! Time utilities for bbtimer
//!
//! The countdown is measured against wall-clock epoch milliseconds, the same
//! way the installed web app computed it from `Date.getTime()`. Callers pass
//! the current time in explicitly so transitions stay deterministic in tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point in wall-clock time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self` (negative if `earlier` is later)
    pub fn millis_since(self, earlier: EpochMillis) -> i64 {
        self.0 - earlier.0
    }

    /// Move this instant back by `secs` whole seconds
    pub fn backdated_by_secs(self, secs: u32) -> Self {
        Self(self.0 - i64::from(secs) * 1000)
    }
}

impl std::ops::Add<Duration> for EpochMillis {
    type Output = EpochMillis;

    fn add(self, rhs: Duration) -> Self::Output {
        EpochMillis(self.0 + rhs.as_millis() as i64)
    }
}

/// Current wall-clock time
#[allow(clippy::disallowed_methods)] // The one place that reads the system clock
pub fn now() -> EpochMillis {
    EpochMillis(chrono::Utc::now().timestamp_millis())
}

/// Whole seconds left on a countdown of `full_secs` started at `start`.
///
/// Rounds up, so a countdown shows `full_secs` for its first second and
/// reaches zero exactly when the full duration has elapsed. Never negative,
/// and never above `full_secs` if the clock steps backwards.
pub fn remaining_seconds(full_secs: u32, start: EpochMillis, now: EpochMillis) -> u32 {
    let full_ms = i64::from(full_secs) * 1000;
    let left_ms = full_ms - now.millis_since(start);

    if left_ms <= 0 {
        return 0;
    }

    let secs = (left_ms + 999) / 1000;
    secs.min(i64::from(full_secs)) as u32
}

/// Format the backup counter as exactly two digits
pub fn format_counter(value: u8) -> String {
    format!("{:02}", value % 100)
}
