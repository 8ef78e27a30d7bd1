//! Advisory appliance locks.
//!
//! A lock records which profile currently "owns" a running appliance so
//! other household members can see who is using it. Locks are advisory by
//! contract: the local timer state is the source of truth for the countdown,
//! and a lock failure never rolls back an engine transition.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// Who holds an appliance, and since when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub profile_name: String,
    /// Account the profile belongs to.
    pub user_id: String,
    pub acquired_at: DateTime<Utc>,
}

/// Backend that records which profile holds which appliance.
///
/// Implementations are free to overwrite an existing hold - the last writer
/// wins, matching the shared-household model where anyone may restart an
/// idle appliance.
pub trait ApplianceLock: Send + Sync {
    /// Mark `appliance_id` as held by `profile_name` under account `user_id`.
    fn acquire(&self, appliance_id: &str, profile_name: &str, user_id: &str)
        -> Result<(), LockError>;

    /// Clear the hold on `appliance_id` (explicit stop or natural expiry).
    fn release(&self, appliance_id: &str) -> Result<(), LockError>;

    /// Current holder of `appliance_id`, if any.
    fn holder(&self, appliance_id: &str) -> Result<Option<LockHolder>, LockError>;
}

/// In-process lock table. Default backend for the service and for tests.
#[derive(Debug, Default)]
pub struct MemoryLocks {
    held: Mutex<HashMap<String, LockHolder>>,
}

impl MemoryLocks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplianceLock for MemoryLocks {
    fn acquire(
        &self,
        appliance_id: &str,
        profile_name: &str,
        user_id: &str,
    ) -> Result<(), LockError> {
        if profile_name.is_empty() {
            return Err(LockError::MissingProfile);
        }
        let mut held = self
            .held
            .lock()
            .map_err(|_| LockError::Backend("lock table poisoned".into()))?;
        held.insert(
            appliance_id.to_string(),
            LockHolder {
                profile_name: profile_name.to_string(),
                user_id: user_id.to_string(),
                acquired_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn release(&self, appliance_id: &str) -> Result<(), LockError> {
        let mut held = self
            .held
            .lock()
            .map_err(|_| LockError::Backend("lock table poisoned".into()))?;
        held.remove(appliance_id);
        Ok(())
    }

    fn holder(&self, appliance_id: &str) -> Result<Option<LockHolder>, LockError> {
        let held = self
            .held
            .lock()
            .map_err(|_| LockError::Backend("lock table poisoned".into()))?;
        Ok(held.get(appliance_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release() {
        let locks = MemoryLocks::new();
        assert!(locks.holder("washingMachine").unwrap().is_none());

        locks.acquire("washingMachine", "Alice", "acct-1").unwrap();
        let holder = locks.holder("washingMachine").unwrap().unwrap();
        assert_eq!(holder.profile_name, "Alice");
        assert_eq!(holder.user_id, "acct-1");

        locks.release("washingMachine").unwrap();
        assert!(locks.holder("washingMachine").unwrap().is_none());
    }

    #[test]
    fn acquire_overwrites_previous_holder() {
        let locks = MemoryLocks::new();
        locks.acquire("oven", "Alice", "acct-1").unwrap();
        locks.acquire("oven", "Bob", "acct-1").unwrap();
        assert_eq!(locks.holder("oven").unwrap().unwrap().profile_name, "Bob");
    }

    #[test]
    fn acquire_requires_profile_name() {
        let locks = MemoryLocks::new();
        assert_eq!(
            locks.acquire("oven", "", "acct-1"),
            Err(LockError::MissingProfile)
        );
        assert!(locks.holder("oven").unwrap().is_none());
    }
}
