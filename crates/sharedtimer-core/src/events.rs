//! Engine events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every timer state change produces an Event.
/// The CLI prints them; the service broadcasts them to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A timer was (re-)armed with a new duration.
    TimerSet {
        appliance_id: String,
        duration_secs: u64,
        start_label: String,
        finish_label: String,
        at: DateTime<Utc>,
    },
    /// A countdown started, or resumed from a paused remainder.
    TimerStarted {
        appliance_id: String,
        remaining_secs: u64,
        finish_label: String,
        at: DateTime<Utc>,
    },
    TimerPaused {
        appliance_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Time was added or removed; while running the countdown basis restarts
    /// at `at` so the elapsed span before the adjustment is not recounted.
    TimerAdjusted {
        appliance_id: String,
        delta_secs: i64,
        remaining_secs: u64,
        base_secs: u64,
        at: DateTime<Utc>,
    },
    /// A running countdown reached zero on its own.
    TimerExpired {
        appliance_id: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The appliance this event concerns.
    pub fn appliance_id(&self) -> &str {
        match self {
            Event::TimerSet { appliance_id, .. }
            | Event::TimerStarted { appliance_id, .. }
            | Event::TimerPaused { appliance_id, .. }
            | Event::TimerAdjusted { appliance_id, .. }
            | Event::TimerExpired { appliance_id, .. } => appliance_id,
        }
    }

    /// The instant the event was produced.
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TimerSet { at, .. }
            | Event::TimerStarted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerAdjusted { at, .. }
            | Event::TimerExpired { at, .. } => *at,
        }
    }
}
