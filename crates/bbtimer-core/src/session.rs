//! Countdown session and backup counter

use bbtimer_util::{EpochMillis, RunId, format_counter, remaining_seconds};

/// Countdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerState {
    Ready,
    Running,
    Expired,
}

/// Handle of the periodic timer tick.
///
/// Each start of a countdown gets a fresh handle; a tick carrying any other
/// handle is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// One countdown run
#[derive(Debug, Clone)]
pub struct TimerSession {
    run_id: RunId,
    state: TimerState,
    start: Option<EpochMillis>,
    full_seconds: u32,
    warn_seconds: u32,
    warning_fired: bool,
    remaining: u32,
    tick: Option<TickHandle>,
}

impl TimerSession {
    /// A session waiting for its first tap
    pub fn ready(full_seconds: u32, warn_seconds: u32) -> Self {
        Self {
            run_id: RunId::new(),
            state: TimerState::Ready,
            start: None,
            full_seconds,
            warn_seconds,
            warning_fired: false,
            remaining: full_seconds,
            tick: None,
        }
    }

    /// A running session whose countdown began at `start`
    pub fn running(full_seconds: u32, warn_seconds: u32, start: EpochMillis, tick: TickHandle) -> Self {
        let mut session = Self::ready(full_seconds, warn_seconds);
        session.state = TimerState::Running;
        session.start = Some(start);
        session.tick = Some(tick);
        session
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn start(&self) -> Option<EpochMillis> {
        self.start
    }

    pub fn full_seconds(&self) -> u32 {
        self.full_seconds
    }

    pub fn warn_seconds(&self) -> u32 {
        self.warn_seconds
    }

    pub fn warning_fired(&self) -> bool {
        self.warning_fired
    }

    /// Last computed whole seconds remaining
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn tick(&self) -> Option<TickHandle> {
        self.tick
    }

    /// Recompute remaining time. Returns true if the displayed value changed.
    pub fn update_remaining(&mut self, now: EpochMillis) -> bool {
        let Some(start) = self.start else {
            return false;
        };
        let remaining = remaining_seconds(self.full_seconds, start, now);
        let changed = remaining != self.remaining;
        self.remaining = remaining;
        changed
    }

    /// True exactly once per run, once remaining time reaches the warn offset.
    /// A late tick that lands past the offset still warns, unless time is up.
    pub fn should_warn(&self) -> bool {
        self.state == TimerState::Running
            && !self.warning_fired
            && self.remaining > 0
            && self.remaining <= self.warn_seconds
    }

    pub fn mark_warning_fired(&mut self) {
        self.warning_fired = true;
    }

    /// Stop the tick and enter Expired
    pub fn mark_expired(&mut self) {
        self.state = TimerState::Expired;
        self.remaining = 0;
        self.tick = None;
    }

    /// Show a different full duration while Ready
    pub(crate) fn reset_display(&mut self, full_seconds: u32, warn_seconds: u32) {
        if self.state == TimerState::Ready {
            self.full_seconds = full_seconds;
            self.warn_seconds = warn_seconds;
            self.remaining = full_seconds;
        }
    }
}

/// Source of fresh tick handles
#[derive(Debug, Default)]
pub(crate) struct TickHandles {
    next: u64,
}

impl TickHandles {
    pub(crate) fn next(&mut self) -> TickHandle {
        self.next += 1;
        TickHandle(self.next)
    }
}

/// Free-running two-digit counter, shown as a fallback when the
/// countdown display is hard to read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupCounter {
    value: u8,
}

impl BackupCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one, wrapping from 99 to 0
    pub fn advance(&mut self) -> u8 {
        self.value = (self.value + 1) % 100;
        self.value
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn display(&self) -> String {
        format_counter(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> EpochMillis {
        EpochMillis::from_millis(ms)
    }

    #[test]
    fn test_ready_session() {
        let session = TimerSession::ready(15, 5);
        assert_eq!(session.state(), TimerState::Ready);
        assert_eq!(session.remaining(), 15);
        assert!(session.tick().is_none());
        assert!(session.start().is_none());
    }

    #[test]
    fn test_running_session_counts_down() {
        let mut handles = TickHandles::default();
        let mut session = TimerSession::running(15, 5, at(0), handles.next());

        assert!(!session.update_remaining(at(100)));
        assert_eq!(session.remaining(), 15);

        assert!(session.update_remaining(at(1_100)));
        assert_eq!(session.remaining(), 14);
    }

    #[test]
    fn test_warning_fires_once() {
        let mut handles = TickHandles::default();
        let mut session = TimerSession::running(15, 5, at(0), handles.next());

        session.update_remaining(at(10_000));
        assert_eq!(session.remaining(), 5);
        assert!(session.should_warn());

        session.mark_warning_fired();
        session.update_remaining(at(10_100));
        assert!(!session.should_warn());
    }

    #[test]
    fn test_late_tick_still_warns() {
        let mut handles = TickHandles::default();
        let mut session = TimerSession::running(15, 5, at(0), handles.next());

        session.update_remaining(at(8_900));
        assert!(!session.should_warn());

        // Stalled past the 5 second mark
        session.update_remaining(at(12_500));
        assert_eq!(session.remaining(), 3);
        assert!(session.should_warn());

        session.update_remaining(at(15_000));
        assert!(!session.should_warn());
    }

    #[test]
    fn test_expire_clears_tick() {
        let mut handles = TickHandles::default();
        let mut session = TimerSession::running(15, 5, at(0), handles.next());
        session.mark_expired();

        assert_eq!(session.state(), TimerState::Expired);
        assert_eq!(session.remaining(), 0);
        assert!(session.tick().is_none());
    }

    #[test]
    fn test_tick_handles_are_unique() {
        let mut handles = TickHandles::default();
        let a = handles.next();
        let b = handles.next();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_counter_wraps() {
        let mut counter = BackupCounter::new();
        assert_eq!(counter.display(), "00");

        for _ in 0..99 {
            counter.advance();
        }
        assert_eq!(counter.display(), "99");

        counter.advance();
        assert_eq!(counter.value(), 0);
        assert_eq!(counter.display(), "00");
    }
}
