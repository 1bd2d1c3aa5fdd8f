//! SQLite-based history and catalog storage.
//!
//! Provides persistent storage for:
//! - Finished breathing sessions (history)
//! - Custom routines and combos
//! - Key-value store for application state

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::catalog::{is_builtin_combo, is_builtin_routine, Catalog, Combo, Routine};
use crate::error::{DatabaseError, Result, ValidationError};
use crate::sinks::{HistoryEntry, HistorySink};
use crate::timer::PhaseKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub name: String,
    pub actual_duration_secs: f64,
    pub total_target_secs: f64,
    pub completed: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistoryStats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub total_secs: f64,
    pub today_sessions: u64,
    pub today_secs: f64,
}

/// SQLite database for history and custom catalog entries.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/breathroom/breathroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("breathroom.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                name                 TEXT NOT NULL,
                actual_duration_secs REAL NOT NULL,
                total_target_secs    REAL NOT NULL,
                completed            INTEGER NOT NULL,
                recorded_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS custom_routines (
                id               TEXT PRIMARY KEY,
                name             TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                inhale           REAL NOT NULL,
                hold_in          REAL NOT NULL,
                exhale           REAL NOT NULL,
                hold_out         REAL NOT NULL,
                phase_labels     TEXT NOT NULL DEFAULT '{}',
                created_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS combos (
                id               TEXT PRIMARY KEY,
                name             TEXT NOT NULL,
                routines         TEXT NOT NULL,
                transition_sound TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_recorded_at ON history(recorded_at);",
        )?;
        Ok(())
    }

    // ── History ──────────────────────────────────────────────────────

    /// Record a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_history(&self, entry: &HistoryEntry) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO history (name, actual_duration_secs, total_target_secs, completed, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.name,
                entry.actual_duration_secs,
                entry.total_target_secs,
                entry.completed,
                stamp(entry.timestamp),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent entries first.
    pub fn list_history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, actual_duration_secs, total_target_secs, completed, recorded_at
             FROM history
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, actual, target, completed, recorded_at) = row?;
            records.push(HistoryRecord {
                id,
                name,
                actual_duration_secs: actual,
                total_target_secs: target,
                completed,
                recorded_at: parse_timestamp("history", &recorded_at)?,
            });
        }
        Ok(records)
    }

    pub fn history_stats(&self) -> Result<HistoryStats> {
        let (total_sessions, completed_sessions, total_secs) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0), COALESCE(SUM(actual_duration_secs), 0.0)
             FROM history",
            [],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            },
        )?;

        // Today's sessions
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let (today_sessions, today_secs) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(actual_duration_secs), 0.0)
             FROM history
             WHERE recorded_at >= ?1",
            params![format!("{today}T00:00:00+00:00")],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, f64>(1)?)),
        )?;

        Ok(HistoryStats {
            total_sessions,
            completed_sessions,
            total_secs,
            today_sessions,
            today_secs,
        })
    }

    /// Delete every history entry. Returns how many were removed.
    pub fn clear_history(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM history", [])?)
    }

    // ── Custom routines ──────────────────────────────────────────────

    /// Insert or replace a custom routine.
    pub fn save_routine(&self, routine: &Routine) -> Result<()> {
        if is_builtin_routine(&routine.id) {
            return Err(ValidationError::BuiltIn(routine.id.clone()).into());
        }
        let labels = serde_json::to_string(&routine.phase_labels)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO custom_routines
                (id, name, duration_minutes, inhale, hold_in, exhale, hold_out, phase_labels, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                routine.id,
                routine.name,
                routine.duration_minutes,
                routine.inhale,
                routine.hold_in,
                routine.exhale,
                routine.hold_out,
                labels,
                stamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Custom routines in creation order.
    pub fn custom_routines(&self) -> Result<Vec<Routine>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, duration_minutes, inhale, hold_in, exhale, hold_out, phase_labels
             FROM custom_routines
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                Routine {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    duration_minutes: row.get(2)?,
                    inhale: row.get(3)?,
                    hold_in: row.get(4)?,
                    exhale: row.get(5)?,
                    hold_out: row.get(6)?,
                    phase_labels: BTreeMap::new(),
                },
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut routines = Vec::new();
        for row in rows {
            let (mut routine, labels) = row?;
            routine.phase_labels = serde_json::from_str::<BTreeMap<PhaseKey, String>>(&labels)
                .map_err(|e| DatabaseError::CorruptRow {
                    table: "custom_routines".into(),
                    message: e.to_string(),
                })?;
            routines.push(routine);
        }
        Ok(routines)
    }

    /// Delete a custom routine. Built-ins are rejected; returns `false`
    /// when no such routine exists.
    pub fn delete_routine(&self, id: &str) -> Result<bool> {
        if is_builtin_routine(id) {
            return Err(ValidationError::BuiltIn(id.to_string()).into());
        }
        let n = self
            .conn
            .execute("DELETE FROM custom_routines WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // ── Combos ───────────────────────────────────────────────────────

    pub fn save_combo(&self, combo: &Combo) -> Result<()> {
        if is_builtin_combo(&combo.id) {
            return Err(ValidationError::BuiltIn(combo.id.clone()).into());
        }
        let routines = serde_json::to_string(&combo.routines)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO combos (id, name, routines, transition_sound, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                combo.id,
                combo.name,
                routines,
                combo.transition_sound,
                stamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// User combos in creation order.
    pub fn combos(&self) -> Result<Vec<Combo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, routines, transition_sound
             FROM combos
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut combos = Vec::new();
        for row in rows {
            let (id, name, routines, transition_sound) = row?;
            let routines = serde_json::from_str(&routines).map_err(|e| DatabaseError::CorruptRow {
                table: "combos".into(),
                message: e.to_string(),
            })?;
            combos.push(Combo {
                id,
                name,
                routines,
                transition_sound,
            });
        }
        Ok(combos)
    }

    pub fn delete_combo(&self, id: &str) -> Result<bool> {
        if is_builtin_combo(id) {
            return Err(ValidationError::BuiltIn(id.to_string()).into());
        }
        let n = self
            .conn
            .execute("DELETE FROM combos WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Built-ins followed by everything the user created.
    pub fn load_catalog(&self) -> Result<Catalog> {
        Ok(Catalog::builtin()
            .with_custom_routines(self.custom_routines()?)
            .with_custom_combos(self.combos()?))
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl HistorySink for Database {
    fn submit_history(&mut self, entry: &HistoryEntry) -> Result<()> {
        self.record_history(entry).map(|_| ())
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn parse_timestamp(table: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::CorruptRow {
                table: table.to_string(),
                message: format!("bad timestamp '{raw}': {e}"),
            }
            .into()
        })
}
