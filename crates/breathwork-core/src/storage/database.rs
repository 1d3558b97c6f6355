//! SQLite-based local storage.
//!
//! Provides persistent storage for:
//! - Custom routines (versioned JSON bodies, see [`super::record`])
//! - Completed session summaries
//! - Key-value store for small bits of application state

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::record::{decode_routine, encode_routine};
use super::{data_dir, RoutineRepository};
use crate::error::{StorageError, ValidationError};
use crate::routine::{is_preset_id, Routine};
use crate::session::{SessionRecorder, SessionSummary};
use crate::stats::PracticeStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub routine_id: String,
    pub routine_name: String,
    pub duration_min: u32,
    pub completed_at: DateTime<Utc>,
}

/// SQLite database for routines and completed sessions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/breathwork.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("breathwork.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS routines (
                id          TEXT PRIMARY KEY,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                routine_id   TEXT NOT NULL,
                routine_name TEXT NOT NULL DEFAULT '',
                duration_min INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Load one stored routine. Malformed bodies are reported, not skipped.
    pub fn get_routine(&self, id: &str) -> Result<Routine, StorageError> {
        let mut stmt = self.conn.prepare("SELECT body FROM routines WHERE id = ?1")?;
        let result = stmt.query_row(params![id], |row| row.get::<_, String>(0));
        match result {
            Ok(body) => decode_routine(id, &body),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(StorageError::NotFound(format!("routine '{id}'")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store a raw routine body. Only used to exercise decode failures.
    #[cfg(test)]
    fn put_raw_routine(&self, id: &str, body: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO routines (id, body, created_at) VALUES (?1, ?2, ?3)",
            params![id, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record a completed session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_session(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (routine_id, routine_name, duration_min, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                summary.routine_id,
                summary.routine_name,
                summary.duration_minutes,
                summary.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Completed sessions, newest first.
    pub fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<SessionRecord>, StorageError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(
            "SELECT id, routine_id, routine_name, duration_min, completed_at
             FROM sessions
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let completed_at: String = row.get(4)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Utc);
            Ok(SessionRecord {
                id: row.get(0)?,
                routine_id: row.get(1)?,
                routine_name: row.get(2)?,
                duration_min: row.get(3)?,
                completed_at,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Practice statistics as of `today`.
    pub fn stats(&self, today: NaiveDate) -> Result<PracticeStats, StorageError> {
        let sessions = self.list_sessions(None)?;
        Ok(PracticeStats::from_sessions(&sessions, today))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key. Returns whether it existed.
    pub fn kv_delete(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

impl RoutineRepository for Database {
    /// Undecodable rows are logged and left out of the listing.
    fn list_routines(&self) -> Result<Vec<Routine>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM routines ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut routines = Vec::new();
        for row in rows {
            let (id, body) = row?;
            match decode_routine(&id, &body) {
                Ok(routine) => routines.push(routine),
                Err(e) => warn!("Skipping stored routine: {e}"),
            }
        }
        Ok(routines)
    }

    fn save_routine(&self, routine: &Routine) -> Result<(), StorageError> {
        if routine.is_preset || is_preset_id(&routine.id) {
            return Err(ValidationError::PresetReadOnly(routine.id.clone()).into());
        }
        routine.validate()?;
        let body = encode_routine(routine)?;
        self.conn.execute(
            "INSERT INTO routines (id, body, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            params![routine.id, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete_routine(&self, id: &str) -> Result<(), StorageError> {
        if is_preset_id(id) {
            return Err(ValidationError::PresetReadOnly(id.to_string()).into());
        }
        let removed = self
            .conn
            .execute("DELETE FROM routines WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(StorageError::NotFound(format!("routine '{id}'")));
        }
        Ok(())
    }
}

impl SessionRecorder for Database {
    fn record_session(&mut self, summary: &SessionSummary) -> Result<(), StorageError> {
        self.insert_session(summary).map(|_| ())
    }
}
