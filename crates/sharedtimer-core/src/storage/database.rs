//! SQLite-based household storage.
//!
//! Provides persistent storage for:
//! - Household profiles (who shares the account)
//! - Advisory appliance locks (who is using what)
//! - Key-value store for application state (the persisted timer engine)

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LockError, StorageError};
use crate::lock::{ApplianceLock, LockHolder};

use super::data_dir;

/// A household member sharing the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite database for household storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/sharedtimer/sharedtimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("sharedtimer.db");
        let conn =
            Connection::open(&path).map_err(|source| StorageError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS profiles (
                    id         TEXT PRIMARY KEY,
                    name       TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS locks (
                    appliance_id TEXT PRIMARY KEY,
                    profile_name TEXT NOT NULL,
                    user_id      TEXT NOT NULL,
                    acquired_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))
    }

    // ── Profiles ─────────────────────────────────────────────────────

    /// Insert a new profile. Names are unique per household.
    pub fn create_profile(&self, name: &str) -> Result<Profile, StorageError> {
        let profile = Profile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO profiles (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                profile.id.to_string(),
                profile.name,
                profile.created_at.to_rfc3339()
            ],
        )?;
        Ok(profile)
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM profiles ORDER BY created_at")?;
        let rows = stmt.query_map([], row_to_profile)?;
        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    pub fn get_profile(&self, name: &str) -> Result<Option<Profile>, StorageError> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM profiles WHERE name = ?1",
                params![name],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Delete a profile by name. Returns whether a row was removed.
    pub fn delete_profile(&self, name: &str) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM profiles WHERE name = ?1", params![name])?;
        Ok(affected > 0)
    }

    // ── Key-value store ──────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    // ── Locks ────────────────────────────────────────────────────────

    pub fn lock_set(&self, appliance_id: &str, holder: &LockHolder) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO locks (appliance_id, profile_name, user_id, acquired_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(appliance_id) DO UPDATE SET
                 profile_name = excluded.profile_name,
                 user_id      = excluded.user_id,
                 acquired_at  = excluded.acquired_at",
            params![
                appliance_id,
                holder.profile_name,
                holder.user_id,
                holder.acquired_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn lock_get(&self, appliance_id: &str) -> Result<Option<LockHolder>, StorageError> {
        let holder = self
            .conn
            .query_row(
                "SELECT profile_name, user_id, acquired_at FROM locks WHERE appliance_id = ?1",
                params![appliance_id],
                |row| {
                    let profile_name: String = row.get(0)?;
                    let user_id: String = row.get(1)?;
                    let acquired_at: String = row.get(2)?;
                    Ok((profile_name, user_id, acquired_at))
                },
            )
            .optional()?;
        match holder {
            Some((profile_name, user_id, acquired_at)) => Ok(Some(LockHolder {
                profile_name,
                user_id,
                acquired_at: parse_rfc3339(&acquired_at)?,
            })),
            None => Ok(None),
        }
    }

    pub fn lock_clear(&self, appliance_id: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM locks WHERE appliance_id = ?1",
            params![appliance_id],
        )?;
        Ok(())
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let created_at: String = row.get(2)?;
    Ok(Profile {
        id: Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        name,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc),
    })
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::QueryFailed(format!("bad timestamp '{value}': {e}")))
}

/// [`ApplianceLock`] over the sqlite `locks` table - the household's shared
/// "who is using what" view.
pub struct SqliteLocks {
    db: Mutex<Database>,
}

impl SqliteLocks {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl ApplianceLock for SqliteLocks {
    fn acquire(
        &self,
        appliance_id: &str,
        profile_name: &str,
        user_id: &str,
    ) -> Result<(), LockError> {
        if profile_name.is_empty() {
            return Err(LockError::MissingProfile);
        }
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.lock_set(
            appliance_id,
            &LockHolder {
                profile_name: profile_name.to_string(),
                user_id: user_id.to_string(),
                acquired_at: Utc::now(),
            },
        )
        .map_err(|e| LockError::Backend(e.to_string()))
    }

    fn release(&self, appliance_id: &str) -> Result<(), LockError> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.lock_clear(appliance_id)
            .map_err(|e| LockError::Backend(e.to_string()))
    }

    fn holder(&self, appliance_id: &str) -> Result<Option<LockHolder>, LockError> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.lock_get(appliance_id)
            .map_err(|e| LockError::Backend(e.to_string()))
    }
}
