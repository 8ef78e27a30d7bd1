//! # SharedTimer Core Library
//!
//! This library provides the core business logic for SharedTimer, a shared
//! countdown timer for household appliances. Multiple household members
//! ("profiles") under one account start, pause, and adjust appliance timers,
//! see who is currently using an appliance, and read start/finish times.
//! All operations are available via a standalone CLI binary; any GUI is a
//! thin display layer over this same core library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine holding one record
//!   per appliance. It does not tick itself - a caller (or the shared
//!   [`TimerService`] ticker) invokes `tick()` periodically, and remaining
//!   time is always recomputed from the recorded start instant rather than
//!   decremented, so delayed or skipped ticks cannot drift the countdown.
//! - **Catalog**: The fixed appliance list plus washing-machine program
//!   presets.
//! - **Locks**: Advisory "who is using what" markers, best-effort by
//!   contract - a lock failure never rolls back local timer state.
//! - **Storage**: SQLite-based household storage (profiles, locks, persisted
//!   engine state) and TOML-based configuration.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core per-appliance timer state machine
//! - [`TimerService`]: Single shared ticker over all running appliances
//! - [`Catalog`]: Fixed appliance list consulted once at startup
//! - [`Database`]: Profiles, locks and key-value persistence
//! - [`Config`]: Application configuration management

pub mod catalog;
pub mod error;
pub mod events;
pub mod lock;
pub mod storage;
pub mod timer;

pub use catalog::{Appliance, Catalog, WashProgram};
pub use error::{ConfigError, CoreError, EngineError, LockError, StorageError};
pub use events::Event;
pub use lock::{ApplianceLock, LockHolder, MemoryLocks};
pub use storage::{Config, Database, Profile, SqliteLocks};
pub use timer::{ApplianceTimer, StartOutcome, TimerEngine, TimerPhase, TimerService};
