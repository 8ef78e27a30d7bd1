//! Core error types for sharedtimer-core.
//!
//! Engine operations never panic and never raise unrecoverable faults: the
//! worst case is a no-op with a reported reason. Callers decide how to
//! present failures (banner, log line, exit code).

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by [`TimerEngine`](crate::timer::TimerEngine) operations.
///
/// All variants are non-fatal and leave timer state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Operation referenced an appliance id that is not in the catalog.
    #[error("unknown appliance '{appliance_id}'")]
    NotFound { appliance_id: String },

    /// `start` called while the appliance is already counting down.
    #[error("appliance '{appliance_id}' is already running")]
    AlreadyRunning { appliance_id: String },

    /// `pause` called while the appliance is not counting down.
    #[error("appliance '{appliance_id}' is not running")]
    NotRunning { appliance_id: String },

    /// `start` called with zero remaining time - nothing to count down.
    #[error("appliance '{appliance_id}' has no remaining time; set a duration first")]
    ZeroDuration { appliance_id: String },
}

/// Errors from the advisory lock collaborator.
///
/// During `start` these are warnings: the local timer transition stands and
/// the failure is surfaced alongside it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The lock backend reported an error.
    #[error("lock backend error: {0}")]
    Backend(String),

    /// The lock backend returned no data for the appliance.
    #[error("lock backend returned no data for appliance '{appliance_id}'")]
    NoData { appliance_id: String },

    /// A lock needs a profile name to attribute the hold to.
    #[error("profile name is required to hold an appliance")]
    MissingProfile,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to prepare the data directory.
    #[error("failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open the database file.
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed.
    #[error("database migration failed: {0}")]
    MigrationFailed(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration.
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration.
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// The dotted key path does not name a configuration value.
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Umbrella error type for sharedtimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timer engine errors
    #[error("timer error: {0}")]
    Engine(#[from] EngineError),

    /// Advisory lock errors
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Storage errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
