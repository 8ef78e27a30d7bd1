//! Property tests for the reconciliation algorithm.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use sharedtimer_core::{Catalog, TimerEngine};

const WM: &str = "washingMachine";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
}

fn running_engine(base: u64) -> TimerEngine {
    let mut engine = TimerEngine::new(&Catalog::builtin());
    engine.set_duration_at(WM, base, t0()).unwrap();
    engine.start_at(WM, t0()).unwrap();
    engine
}

proptest! {
    #[test]
    fn reconcile_is_idempotent(base in 1u64..=86_400, k in 0i64..=200_000) {
        let mut engine = running_engine(base);
        let now = t0() + Duration::seconds(k);
        engine.tick_at(now);
        let first = engine.timer(WM).unwrap().remaining_secs;
        engine.tick_at(now);
        prop_assert_eq!(engine.timer(WM).unwrap().remaining_secs, first);
    }

    #[test]
    fn remaining_never_increases_while_running(
        base in 1u64..=86_400,
        k1 in 0i64..=100_000,
        k2 in 0i64..=100_000,
    ) {
        let mut engine = running_engine(base);
        let (early, late) = (k1.min(k2), k1.max(k2));
        engine.tick_at(t0() + Duration::seconds(early));
        let at_early = engine.timer(WM).unwrap().remaining_secs;
        engine.tick_at(t0() + Duration::seconds(late));
        prop_assert!(engine.timer(WM).unwrap().remaining_secs <= at_early);
    }

    #[test]
    fn remaining_matches_elapsed_exactly(base in 1u64..=86_400, k in 0u64..=200_000) {
        let mut engine = running_engine(base);
        engine.tick_at(t0() + Duration::seconds(k as i64));
        prop_assert_eq!(engine.timer(WM).unwrap().remaining_secs, base.saturating_sub(k));
    }

    #[test]
    fn expiry_and_running_flag_agree(base in 1u64..=86_400, k in 0u64..=200_000) {
        let mut engine = running_engine(base);
        engine.tick_at(t0() + Duration::seconds(k as i64));
        let timer = engine.timer(WM).unwrap();
        prop_assert_eq!(timer.phase.is_running(), timer.remaining_secs > 0);
    }

    #[test]
    fn adjust_clamps_at_zero(base in 1u64..=86_400, extra in 0i64..=100_000) {
        let mut engine = running_engine(base);
        let delta = -(base as i64 + extra);
        engine.adjust_at(WM, delta, t0() + Duration::seconds(1)).unwrap();
        let timer = engine.timer(WM).unwrap();
        prop_assert_eq!(timer.remaining_secs, 0);
        prop_assert!(!timer.phase.is_running());
    }

    #[test]
    fn adjust_up_then_down_is_neutral_while_paused(base in 1u64..=86_400, delta in 1i64..=50_000) {
        let mut engine = TimerEngine::new(&Catalog::builtin());
        engine.set_duration_at(WM, base, t0()).unwrap();
        engine.adjust_at(WM, delta, t0()).unwrap();
        engine.adjust_at(WM, -delta, t0()).unwrap();
        let timer = engine.timer(WM).unwrap();
        prop_assert_eq!(timer.remaining_secs, base);
        prop_assert_eq!(timer.base_secs, base);
    }
}
