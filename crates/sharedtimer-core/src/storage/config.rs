//! TOML-based application configuration.
//!
//! Stores:
//! - Shared ticker cadence
//! - Household account identity reported to the lock backend
//! - The appliance a bare `timer` command targets
//!
//! Configuration is stored at `~/.config/sharedtimer/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

use super::data_dir;

/// Timer-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Shared ticker cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Household-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdConfig {
    /// Account identifier reported to the lock backend.
    #[serde(default)]
    pub user_id: String,
    /// Appliance used when a command names none.
    #[serde(default = "default_appliance")]
    pub default_appliance: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/sharedtimer/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub household: HouseholdConfig,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_appliance() -> String {
    "washingMachine".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            default_appliance: default_appliance(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            household: HouseholdConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = match Self::path() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "config directory unavailable; using defaults");
                return Self::default();
            }
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&path, &text),
            Err(_) => Self::default(),
        }
    }

    fn parse(path: &std::path::Path, text: &str) -> Self {
        match toml::from_str(text) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config file unparsable; using defaults");
                Self::default()
            }
        }
    }

    /// Save the configuration to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    fn path() -> Result<PathBuf, crate::error::StorageError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// The shared ticker cadence.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timer.tick_interval_ms.max(1))
    }

    /// Look up a value by dotted key path, e.g. `timer.tick_interval_ms`.
    pub fn get(&self, key: &str) -> Option<String> {
        let root = serde_json::to_value(self).ok()?;
        let mut current = &root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(match current {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Set a value by dotted key path, preserving the existing value's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut root =
            serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let mut current = &mut root;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            let obj = current
                .as_object_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let slot = obj
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            if parts.peek().is_none() {
                *slot = coerce(slot, key, value)?;
                break;
            }
            current = slot;
        }

        *self = serde_json::from_value(root).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// Parse `value` with the same JSON type as `existing`.
fn coerce(
    existing: &serde_json::Value,
    key: &str,
    value: &str,
) -> Result<serde_json::Value, ConfigError> {
    match existing {
        serde_json::Value::Bool(_) => value
            .parse::<bool>()
            .map(serde_json::Value::Bool)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("cannot parse '{value}' as bool"),
            }),
        serde_json::Value::Number(_) => value
            .parse::<u64>()
            .map(|n| serde_json::Value::Number(n.into()))
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("cannot parse '{value}' as number"),
            }),
        serde_json::Value::String(_) => Ok(serde_json::Value::String(value.to_string())),
        _ => Err(ConfigError::UnknownKey(key.to_string())),
    }
}
