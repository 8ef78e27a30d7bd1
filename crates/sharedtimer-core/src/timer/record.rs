//! Per-appliance timer record and wall-clock reconciliation.
//!
//! Remaining time is never decremented tick by tick. Every recomputation
//! derives it from the recorded start instant:
//!
//! ```text
//! remaining = max(0, basis - (now - started_at))
//! ```
//!
//! so a late or skipped tick (a backgrounded mobile app, a suspended laptop)
//! cannot drift the countdown: correctness depends only on `now` and the
//! recorded start instant, not on how many ticks actually fired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::format::clock_label;

/// Lifecycle of one appliance timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    /// Armed with a duration (or never set); not counting.
    Idle,
    /// Actively counting down.
    Running,
    /// Stopped partway; remaining keeps its partial progress.
    Paused,
    /// Reached zero on its own.
    Expired,
}

impl TimerPhase {
    pub fn is_running(self) -> bool {
        self == TimerPhase::Running
    }
}

/// State of a single appliance countdown.
///
/// Owned by the engine; collaborators read snapshots or go through the
/// documented operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceTimer {
    pub appliance_id: String,
    pub phase: TimerPhase,
    /// Duration the timer was most recently set to, in seconds. Mutated only
    /// by `set_duration` and `adjust`, never by the tick.
    pub base_secs: u64,
    /// Last computed remaining seconds (the display value).
    pub remaining_secs: u64,
    /// Instant of the last (re)start. `None` unless running.
    pub started_at: Option<DateTime<Utc>>,
    /// Remaining seconds at the instant of the last (re)start. Resuming
    /// counts down from here, not from `base_secs`, so pause/resume keeps
    /// partial progress.
    pub(crate) basis_secs: u64,
    /// `HH:MM` wall-clock label of the (preview) start instant.
    pub start_label: Option<String>,
    /// `HH:MM` wall-clock label of the projected finish instant.
    pub finish_label: Option<String>,
}

impl ApplianceTimer {
    /// Fresh idle record with no duration set.
    pub fn new(appliance_id: impl Into<String>) -> Self {
        Self {
            appliance_id: appliance_id.into(),
            phase: TimerPhase::Idle,
            base_secs: 0,
            remaining_secs: 0,
            started_at: None,
            basis_secs: 0,
            start_label: None,
            finish_label: None,
        }
    }

    /// Recompute remaining time from the recorded start instant.
    ///
    /// Pure: the result depends only on `self` and `now`, so reconciling
    /// twice with the same instant yields the same record. A running record
    /// that reaches zero flips to `Expired` in the same step as the clamp.
    /// Non-running records pass through unchanged.
    #[must_use]
    pub fn reconcile(&self, now: DateTime<Utc>) -> Self {
        if self.phase != TimerPhase::Running {
            return self.clone();
        }
        let started = match self.started_at {
            Some(t) => t,
            None => return self.clone(),
        };
        let elapsed = (now - started).num_seconds().max(0) as u64;
        let mut next = self.clone();
        next.remaining_secs = self.basis_secs.saturating_sub(elapsed);
        if next.remaining_secs == 0 {
            next.phase = TimerPhase::Expired;
            next.started_at = None;
        }
        next
    }

    /// Recompute the `HH:MM` start/finish labels for a (synthetic) start at
    /// `start` with `remaining` seconds to go.
    pub(crate) fn relabel(&mut self, start: DateTime<Utc>, remaining: u64) {
        let span = chrono::Duration::seconds(i64::try_from(remaining).unwrap_or(i64::MAX));
        self.start_label = Some(clock_label(start));
        self.finish_label = Some(clock_label(start + span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap()
    }

    fn running(secs: u64) -> ApplianceTimer {
        let mut timer = ApplianceTimer::new("washingMachine");
        timer.phase = TimerPhase::Running;
        timer.base_secs = secs;
        timer.remaining_secs = secs;
        timer.basis_secs = secs;
        timer.started_at = Some(t0());
        timer
    }

    #[test]
    fn reconcile_derives_remaining_from_start_instant() {
        let timer = running(300);
        let later = timer.reconcile(t0() + chrono::Duration::seconds(120));
        assert_eq!(later.remaining_secs, 180);
        assert_eq!(later.phase, TimerPhase::Running);
    }

    #[test]
    fn reconcile_is_idempotent_for_equal_now() {
        let timer = running(300);
        let now = t0() + chrono::Duration::seconds(42);
        let once = timer.reconcile(now);
        let twice = once.reconcile(now);
        assert_eq!(once.remaining_secs, twice.remaining_secs);
        assert_eq!(once.phase, twice.phase);
    }

    #[test]
    fn reconcile_clamps_and_expires_atomically() {
        let timer = running(300);
        let done = timer.reconcile(t0() + chrono::Duration::seconds(301));
        assert_eq!(done.remaining_secs, 0);
        assert_eq!(done.phase, TimerPhase::Expired);
        assert!(done.started_at.is_none());
    }

    #[test]
    fn reconcile_ignores_non_running_records() {
        let mut timer = running(300);
        timer.phase = TimerPhase::Paused;
        timer.started_at = None;
        timer.remaining_secs = 100;
        let later = timer.reconcile(t0() + chrono::Duration::seconds(1000));
        assert_eq!(later.remaining_secs, 100);
        assert_eq!(later.phase, TimerPhase::Paused);
    }

    #[test]
    fn reconcile_tolerates_clock_before_start() {
        let timer = running(300);
        let earlier = timer.reconcile(t0() - chrono::Duration::seconds(10));
        assert_eq!(earlier.remaining_secs, 300);
        assert_eq!(earlier.phase, TimerPhase::Running);
    }
}
