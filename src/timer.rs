// src/timer.rs
//
// Single-shot deadline timers for the dispatch loop.
//
// Timers never fire on their own: the event loop asks each owner for its
// earliest deadline, sleeps until then, and delivers `TimerFired`. Re-arming
// replaces the deadline, so a fire for an older deadline finds the timer
// not yet due and is ignored.

use std::time::{Duration, Instant};

/// Echo settle delay after the last forwarded keystroke.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Retry delay for a read deferred while the console is busy.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Identifies which timer a `TimerFired` event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Console settle timer (forces a fresh line after a pause in typing)
    EchoSettle,
    /// Session read-retry timer
    ReadRetry,
}

/// Durations used by the console and the session read path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub settle: Duration,
    pub read_retry: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: SETTLE_DELAY,
            read_retry: READ_RETRY_DELAY,
        }
    }
}

/// A timer that fires at most once per `start`.
#[derive(Clone, Debug, Default)]
pub struct SingleShotTimer {
    deadline: Option<Instant>,
}

impl SingleShotTimer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer, cancelling any pending fire.
    pub fn start(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(d) if d <= now)
    }

    /// Disarm and return true if the deadline has passed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_starts_inactive() {
        let timer = SingleShotTimer::new();
        assert!(!timer.is_active());
        assert!(!timer.is_due(Instant::now()));
    }

    #[test]
    fn test_timer_expires_once() {
        let t0 = Instant::now();
        let mut timer = SingleShotTimer::new();
        timer.start(t0, Duration::from_millis(100));

        assert!(!timer.expire(t0 + Duration::from_millis(99)));
        assert!(timer.is_active());
        assert!(timer.expire(t0 + Duration::from_millis(100)));
        assert!(!timer.is_active());
        assert!(!timer.expire(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_restart_replaces_deadline() {
        let t0 = Instant::now();
        let mut timer = SingleShotTimer::new();
        timer.start(t0, Duration::from_secs(5));
        timer.start(t0 + Duration::from_secs(3), Duration::from_secs(5));

        // The first deadline no longer fires
        assert!(!timer.expire(t0 + Duration::from_secs(5)));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(8)));
    }

    #[test]
    fn test_default_timing() {
        let timing = Timing::default();
        assert_eq!(timing.settle, Duration::from_secs(5));
        assert_eq!(timing.read_retry, Duration::from_millis(100));
    }
}
