//! Timer engine: the single source of truth for every appliance countdown.
//!
//! The engine holds one [`ApplianceTimer`] per catalog appliance and is a
//! wall-clock-based state machine. It does not tick itself - a caller (the
//! CLI, or the shared [`TimerService`](super::TimerService) ticker) invokes
//! `tick()` periodically.
//!
//! ## State transitions per appliance
//!
//! ```text
//! Idle ──start──▶ Running ──pause──▶ Paused ──start──▶ Running (resume)
//!                 Running ──tick reaches 0──▶ Expired
//!                 any ──set_duration──▶ re-armed
//! ```
//!
//! Every mutation recomputes remaining time from `(basis, started_at, now)`
//! rather than applying a delta to a possibly-stale cached value, so an
//! operation and a pending tick can interleave in any order without losing
//! an update.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::events::Event;

use super::record::{ApplianceTimer, TimerPhase};

/// Per-appliance countdown state machine over a fixed catalog.
///
/// Records are created once at construction and never removed;
/// `set_duration` re-arms them. Serializable so the CLI can persist the
/// whole engine between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    timers: BTreeMap<String, ApplianceTimer>,
}

impl TimerEngine {
    /// One idle record per appliance in `catalog`.
    pub fn new(catalog: &Catalog) -> Self {
        let timers = catalog
            .appliances()
            .iter()
            .map(|a| (a.id.clone(), ApplianceTimer::new(a.id.clone())))
            .collect();
        Self { timers }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timer(&self, appliance_id: &str) -> Option<&ApplianceTimer> {
        self.timers.get(appliance_id)
    }

    pub fn timers(&self) -> impl Iterator<Item = &ApplianceTimer> {
        self.timers.values()
    }

    /// True when at least one appliance is counting down. The shared ticker
    /// is scheduled exactly while this holds.
    pub fn any_running(&self) -> bool {
        self.timers.values().any(|t| t.phase.is_running())
    }

    // ── Operations ───────────────────────────────────────────────────
    // Wall-clock wrappers delegate to the `*_at` variants, which take an
    // explicit instant. Tests and deterministic replay drive the latter.

    /// Re-arm `appliance_id` with a duration of `secs`.
    ///
    /// Base and remaining both become `secs` and the labels preview a start
    /// at the current instant. A running timer stays running on the new
    /// duration; any other phase returns to `Idle`.
    pub fn set_duration(&mut self, appliance_id: &str, secs: u64) -> Result<Event, EngineError> {
        self.set_duration_at(appliance_id, secs, Utc::now())
    }

    pub fn set_duration_at(
        &mut self,
        appliance_id: &str,
        secs: u64,
        now: DateTime<Utc>,
    ) -> Result<Event, EngineError> {
        let timer = self.get_mut(appliance_id)?;
        timer.base_secs = secs;
        timer.remaining_secs = secs;
        timer.basis_secs = secs;
        if timer.phase.is_running() {
            timer.started_at = Some(now);
        } else {
            timer.phase = TimerPhase::Idle;
            timer.started_at = None;
        }
        timer.relabel(now, secs);
        Ok(Event::TimerSet {
            appliance_id: appliance_id.to_string(),
            duration_secs: secs,
            start_label: timer.start_label.clone().unwrap_or_default(),
            finish_label: timer.finish_label.clone().unwrap_or_default(),
            at: now,
        })
    }

    /// Start counting down, or resume a paused remainder.
    ///
    /// Resuming uses the current `remaining_secs` as the new countdown
    /// basis, not `base_secs`, so paused progress is kept.
    pub fn start(&mut self, appliance_id: &str) -> Result<Event, EngineError> {
        self.start_at(appliance_id, Utc::now())
    }

    pub fn start_at(
        &mut self,
        appliance_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Event, EngineError> {
        let timer = self.get_mut(appliance_id)?;
        if timer.phase.is_running() {
            return Err(EngineError::AlreadyRunning {
                appliance_id: appliance_id.to_string(),
            });
        }
        if timer.remaining_secs == 0 {
            return Err(EngineError::ZeroDuration {
                appliance_id: appliance_id.to_string(),
            });
        }
        timer.phase = TimerPhase::Running;
        timer.started_at = Some(now);
        timer.basis_secs = timer.remaining_secs;
        timer.relabel(now, timer.remaining_secs);
        Ok(Event::TimerStarted {
            appliance_id: appliance_id.to_string(),
            remaining_secs: timer.remaining_secs,
            finish_label: timer.finish_label.clone().unwrap_or_default(),
            at: now,
        })
    }

    /// Stop a running countdown, reconciling remaining time one final time
    /// at the boundary so no time is lost or gained.
    pub fn pause(&mut self, appliance_id: &str) -> Result<Event, EngineError> {
        self.pause_at(appliance_id, Utc::now())
    }

    pub fn pause_at(
        &mut self,
        appliance_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Event, EngineError> {
        let timer = self.get_mut(appliance_id)?;
        if !timer.phase.is_running() {
            return Err(EngineError::NotRunning {
                appliance_id: appliance_id.to_string(),
            });
        }
        let mut next = timer.reconcile(now);
        let event = if next.phase == TimerPhase::Expired {
            // The countdown ran out before the pause landed.
            Event::TimerExpired {
                appliance_id: appliance_id.to_string(),
                at: now,
            }
        } else {
            next.phase = TimerPhase::Paused;
            next.started_at = None;
            Event::TimerPaused {
                appliance_id: appliance_id.to_string(),
                remaining_secs: next.remaining_secs,
                at: now,
            }
        };
        *timer = next;
        Ok(event)
    }

    /// Add (or remove, for negative `delta_secs`) time, running or not.
    ///
    /// A running timer is reconciled on its old basis first, then restarted
    /// with a fresh start instant at `now` - without the restart the span
    /// elapsed before the adjustment would be counted twice. Clamping to
    /// zero while running expires the timer, the same terminal transition as
    /// natural expiry.
    pub fn adjust(&mut self, appliance_id: &str, delta_secs: i64) -> Result<Event, EngineError> {
        self.adjust_at(appliance_id, delta_secs, Utc::now())
    }

    pub fn adjust_at(
        &mut self,
        appliance_id: &str,
        delta_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Event, EngineError> {
        let timer = self.get_mut(appliance_id)?;
        let was_running = timer.phase.is_running();
        let mut next = timer.reconcile(now);

        next.remaining_secs = apply_delta(next.remaining_secs, delta_secs);
        next.base_secs = apply_delta(next.base_secs, delta_secs);
        next.basis_secs = next.remaining_secs;
        next.relabel(now, next.remaining_secs);

        let event = if was_running && next.remaining_secs == 0 {
            next.phase = TimerPhase::Expired;
            next.started_at = None;
            Event::TimerExpired {
                appliance_id: appliance_id.to_string(),
                at: now,
            }
        } else {
            if was_running {
                next.phase = TimerPhase::Running;
                next.started_at = Some(now);
            }
            Event::TimerAdjusted {
                appliance_id: appliance_id.to_string(),
                delta_secs,
                remaining_secs: next.remaining_secs,
                base_secs: next.base_secs,
                at: now,
            }
        };
        *timer = next;
        Ok(event)
    }

    // ── Tick ─────────────────────────────────────────────────────────

    /// Reconcile every running appliance from scratch.
    ///
    /// Returns the expiry events produced this cycle. Idempotent for a given
    /// `now`; a cycle that fires late simply reconciles over the longer
    /// elapsed span.
    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(Utc::now())
    }

    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut expired = Vec::new();
        for timer in self.timers.values_mut() {
            if !timer.phase.is_running() {
                continue;
            }
            let next = timer.reconcile(now);
            if next.phase == TimerPhase::Expired {
                expired.push(Event::TimerExpired {
                    appliance_id: next.appliance_id.clone(),
                    at: now,
                });
            }
            *timer = next;
        }
        expired
    }

    fn get_mut(&mut self, appliance_id: &str) -> Result<&mut ApplianceTimer, EngineError> {
        self.timers
            .get_mut(appliance_id)
            .ok_or_else(|| EngineError::NotFound {
                appliance_id: appliance_id.to_string(),
            })
    }
}

fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::clock_label;
    use chrono::{Duration, TimeZone};

    const WM: &str = "washingMachine";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn engine() -> TimerEngine {
        TimerEngine::new(&Catalog::builtin())
    }

    #[test]
    fn set_duration_arms_idle_timer() {
        let mut engine = engine();
        engine.set_duration_at(WM, 3000, t0()).unwrap();
        let timer = engine.timer(WM).unwrap();
        assert_eq!(timer.remaining_secs, 3000);
        assert_eq!(timer.base_secs, 3000);
        assert_eq!(timer.phase, TimerPhase::Idle);
        assert_eq!(timer.start_label.as_deref(), Some(clock_label(t0()).as_str()));
    }

    #[test]
    fn unknown_appliance_is_reported_not_mutated() {
        let mut engine = engine();
        let err = engine.set_duration_at("jacuzzi", 60, t0()).unwrap_err();
        assert_eq!(
            err,
            EngineError::NotFound {
                appliance_id: "jacuzzi".into()
            }
        );
        assert!(engine.timer("jacuzzi").is_none());
    }

    #[test]
    fn start_requires_remaining_time() {
        let mut engine = engine();
        let err = engine.start_at(WM, t0()).unwrap_err();
        assert_eq!(
            err,
            EngineError::ZeroDuration {
                appliance_id: WM.into()
            }
        );
    }

    #[test]
    fn start_twice_is_rejected_without_state_change() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        let err = engine.start_at(WM, at(5)).unwrap_err();
        assert_eq!(
            err,
            EngineError::AlreadyRunning {
                appliance_id: WM.into()
            }
        );
        // The original start instant still governs reconciliation.
        assert_eq!(engine.timer(WM).unwrap().started_at, Some(t0()));
    }

    #[test]
    fn tick_counts_down_from_the_start_instant() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        assert!(engine.tick_at(at(10)).is_empty());
        let timer = engine.timer(WM).unwrap();
        assert_eq!(timer.remaining_secs, 590);
        assert!(timer.phase.is_running());
    }

    #[test]
    fn tick_is_idempotent_for_equal_now() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        engine.tick_at(at(42));
        let first = engine.timer(WM).unwrap().remaining_secs;
        engine.tick_at(at(42));
        assert_eq!(engine.timer(WM).unwrap().remaining_secs, first);
    }

    #[test]
    fn tick_expires_and_stops_atomically() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        let events = engine.tick_at(at(600));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::TimerExpired { appliance_id, .. } if appliance_id == WM));
        let timer = engine.timer(WM).unwrap();
        assert_eq!(timer.remaining_secs, 0);
        assert_eq!(timer.phase, TimerPhase::Expired);
        // A later tick reports nothing new.
        assert!(engine.tick_at(at(700)).is_empty());
    }

    #[test]
    fn pause_reconciles_at_the_boundary() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        let event = engine.pause_at(WM, at(10)).unwrap();
        assert!(matches!(event, Event::TimerPaused { remaining_secs: 590, .. }));
        let timer = engine.timer(WM).unwrap();
        assert_eq!(timer.phase, TimerPhase::Paused);
        assert!(timer.started_at.is_none());
    }

    #[test]
    fn pause_when_not_running_is_rejected() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        let err = engine.pause_at(WM, t0()).unwrap_err();
        assert_eq!(
            err,
            EngineError::NotRunning {
                appliance_id: WM.into()
            }
        );
    }

    #[test]
    fn resume_continues_from_paused_remainder() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        engine.pause_at(WM, at(10)).unwrap();

        engine.start_at(WM, at(100)).unwrap();
        engine.tick_at(at(105));
        // 10s before the pause plus 5s after the resume; the 90s gap in
        // between does not count.
        assert_eq!(engine.timer(WM).unwrap().remaining_secs, 585);
    }

    #[test]
    fn adjust_while_paused_moves_base_and_remaining() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        engine.pause_at(WM, at(10)).unwrap();

        let event = engine.adjust_at(WM, 60, at(20)).unwrap();
        assert!(matches!(
            event,
            Event::TimerAdjusted {
                remaining_secs: 650,
                base_secs: 660,
                ..
            }
        ));
        assert_eq!(engine.timer(WM).unwrap().phase, TimerPhase::Paused);
    }

    #[test]
    fn adjust_while_running_restarts_the_basis() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();

        // 10s elapsed, then +60: remaining becomes 590 + 60 = 650 with a
        // fresh start instant, so the 10s already spent is not recounted.
        engine.adjust_at(WM, 60, at(10)).unwrap();
        let timer = engine.timer(WM).unwrap();
        assert!(timer.phase.is_running());
        assert_eq!(timer.remaining_secs, 650);
        assert_eq!(timer.started_at, Some(at(10)));

        engine.tick_at(at(15));
        assert_eq!(engine.timer(WM).unwrap().remaining_secs, 645);
    }

    #[test]
    fn adjust_below_zero_clamps_and_expires_a_running_timer() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();

        let remaining = engine.timer(WM).unwrap().remaining_secs as i64;
        let event = engine.adjust_at(WM, -(remaining + 100), at(1)).unwrap();
        assert!(matches!(event, Event::TimerExpired { .. }));
        let timer = engine.timer(WM).unwrap();
        assert_eq!(timer.remaining_secs, 0);
        assert_eq!(timer.phase, TimerPhase::Expired);
    }

    #[test]
    fn adjust_below_zero_while_stopped_just_clamps() {
        let mut engine = engine();
        engine.set_duration_at(WM, 60, t0()).unwrap();
        let event = engine.adjust_at(WM, -500, at(1)).unwrap();
        assert!(matches!(
            event,
            Event::TimerAdjusted {
                remaining_secs: 0,
                base_secs: 0,
                ..
            }
        ));
        assert_eq!(engine.timer(WM).unwrap().phase, TimerPhase::Idle);
    }

    #[test]
    fn set_duration_while_running_keeps_it_running() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();

        engine.set_duration_at(WM, 1200, at(30)).unwrap();
        let timer = engine.timer(WM).unwrap();
        assert!(timer.phase.is_running());
        assert_eq!(timer.remaining_secs, 1200);
        assert_eq!(timer.started_at, Some(at(30)));

        engine.tick_at(at(40));
        assert_eq!(engine.timer(WM).unwrap().remaining_secs, 1190);
    }

    #[test]
    fn appliances_count_down_independently() {
        let mut engine = engine();
        engine.set_duration_at(WM, 600, t0()).unwrap();
        engine.set_duration_at("dishwasher", 300, t0()).unwrap();
        engine.start_at(WM, t0()).unwrap();
        engine.start_at("dishwasher", at(100)).unwrap();

        engine.tick_at(at(150));
        assert_eq!(engine.timer(WM).unwrap().remaining_secs, 450);
        assert_eq!(engine.timer("dishwasher").unwrap().remaining_secs, 250);
        assert!(engine.any_running());

        engine.pause_at(WM, at(200)).unwrap();
        assert!(engine.any_running());
        engine.pause_at("dishwasher", at(200)).unwrap();
        assert!(!engine.any_running());
    }
}
