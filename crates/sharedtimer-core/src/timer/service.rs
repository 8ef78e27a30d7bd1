//! Shared ticker service.
//!
//! One recurring tokio task drives [`TimerEngine::tick`] for all running
//! appliances - never one interval per appliance. The task exists only
//! while at least one appliance is counting down: it is spawned on demand
//! by `start`, stops itself when the running set drains, is aborted eagerly
//! when an operation empties the running set, and is aborted on drop so no
//! recurring work outlives the service.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{EngineError, LockError};
use crate::events::Event;
use crate::lock::ApplianceLock;

use super::engine::TimerEngine;
use super::record::ApplianceTimer;

/// Result of [`TimerService::start`].
///
/// `lock_warning` carries the advisory lock failure, if any. The local
/// countdown is authoritative; a failed lock never rolls it back.
#[derive(Debug)]
pub struct StartOutcome {
    pub event: Event,
    pub lock_warning: Option<LockError>,
}

/// Owns the engine, the lock collaborator and the single shared ticker.
///
/// All engine mutations go through one mutex, so an operation and a pending
/// tick are serialized; reconciliation from the start instant makes their
/// order irrelevant.
pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    locks: Arc<dyn ApplianceLock>,
    events: broadcast::Sender<Event>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
}

impl TimerService {
    /// Service with the default 1-second tick cadence.
    pub fn new(engine: TimerEngine, locks: Arc<dyn ApplianceLock>) -> Self {
        Self::with_tick_interval(engine, locks, Duration::from_secs(1))
    }

    pub fn with_tick_interval(
        engine: TimerEngine,
        locks: Arc<dyn ApplianceLock>,
        tick_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            locks,
            events,
            ticker: Mutex::new(None),
            tick_interval,
        }
    }

    /// Subscribe to engine events (expiries arrive from the ticker task).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn any_running(&self) -> bool {
        lock_engine(&self.engine).any_running()
    }

    /// Clone of the current engine state, for persistence or display.
    pub fn engine_snapshot(&self) -> TimerEngine {
        lock_engine(&self.engine).clone()
    }

    /// Reconciled view of all appliance timers as of now.
    pub fn timers(&self) -> Vec<ApplianceTimer> {
        let now = Utc::now();
        lock_engine(&self.engine)
            .timers()
            .map(|t| t.reconcile(now))
            .collect()
    }

    /// Whether the shared ticker task is currently scheduled.
    pub fn ticker_active(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    // ── Operations ───────────────────────────────────────────────────

    pub fn set_duration(&self, appliance_id: &str, secs: u64) -> Result<Event, EngineError> {
        let event = lock_engine(&self.engine).set_duration(appliance_id, secs)?;
        let _ = self.events.send(event.clone());
        self.sync_ticker();
        Ok(event)
    }

    /// Start (or resume) a countdown and record the advisory lock.
    ///
    /// The lock call is best-effort: on failure the countdown still runs and
    /// the error comes back as `lock_warning`.
    pub fn start(
        &self,
        appliance_id: &str,
        profile_name: &str,
        user_id: &str,
    ) -> Result<StartOutcome, EngineError> {
        let event = lock_engine(&self.engine).start(appliance_id)?;
        let lock_warning = match self.locks.acquire(appliance_id, profile_name, user_id) {
            Ok(()) => None,
            Err(e) => {
                warn!(appliance = appliance_id, error = %e, "appliance lock not acquired");
                Some(e)
            }
        };
        let _ = self.events.send(event.clone());
        self.sync_ticker();
        Ok(StartOutcome { event, lock_warning })
    }

    pub fn pause(&self, appliance_id: &str) -> Result<Event, EngineError> {
        let event = lock_engine(&self.engine).pause(appliance_id)?;
        if matches!(event, Event::TimerExpired { .. }) {
            self.release_lock(appliance_id);
        }
        let _ = self.events.send(event.clone());
        self.sync_ticker();
        Ok(event)
    }

    pub fn adjust(&self, appliance_id: &str, delta_secs: i64) -> Result<Event, EngineError> {
        let event = lock_engine(&self.engine).adjust(appliance_id, delta_secs)?;
        if matches!(event, Event::TimerExpired { .. }) {
            self.release_lock(appliance_id);
        }
        let _ = self.events.send(event.clone());
        self.sync_ticker();
        Ok(event)
    }

    // ── Ticker lifecycle ─────────────────────────────────────────────

    /// Spawn or stop the shared ticker to match the running set.
    ///
    /// Called after every operation; call it once after constructing the
    /// service from persisted state so a countdown started by a previous
    /// process resumes ticking. Must run inside a tokio runtime.
    pub fn sync_ticker(&self) {
        if self.any_running() {
            self.ensure_ticker();
        } else {
            self.stop_ticker();
        }
    }

    fn ensure_ticker(&self) {
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        let alive = slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        if alive {
            return;
        }
        debug!("spawning shared ticker");
        *slot = Some(tokio::spawn(run_ticker(
            Arc::clone(&self.engine),
            Arc::clone(&self.locks),
            self.events.clone(),
            self.tick_interval,
        )));
    }

    fn stop_ticker(&self) {
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
            debug!("shared ticker stopped");
        }
    }

    fn release_lock(&self, appliance_id: &str) {
        if let Err(e) = self.locks.release(appliance_id) {
            warn!(appliance = appliance_id, error = %e, "appliance lock not released");
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

fn lock_engine(engine: &Arc<Mutex<TimerEngine>>) -> MutexGuard<'_, TimerEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_ticker(
    engine: Arc<Mutex<TimerEngine>>,
    locks: Arc<dyn ApplianceLock>,
    events: broadcast::Sender<Event>,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    // Reconciliation derives remaining time from the start instant, so
    // missed cycles need no catch-up bursts.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let expired = lock_engine(&engine).tick_at(Utc::now());
        for event in expired {
            if let Event::TimerExpired { appliance_id, .. } = &event {
                if let Err(e) = locks.release(appliance_id) {
                    warn!(appliance = %appliance_id, error = %e, "appliance lock not released on expiry");
                }
            }
            let _ = events.send(event);
        }
        if !lock_engine(&engine).any_running() {
            debug!("no appliances running; shared ticker exiting");
            break;
        }
    }
}
