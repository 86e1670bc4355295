//! SQLite-backed learning state and behavior log.
//!
//! Provides persistent storage for:
//! - Key-value learning state (implements [`LearningStore`])
//! - The behavior event log, pruned to a fixed capacity on append

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::behavior::{BehaviorEvent, BehaviorLog};
use crate::error::{CoreError, StorageError};
use crate::store::LearningStore;

use super::data_dir;

/// SQLite database for learning state.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/laterly/laterly.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("laterly.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS behavior_events (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                action    TEXT NOT NULL,
                item_id   TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                payload   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_behavior_events_timestamp ON behavior_events(timestamp);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Append an event, then drop the oldest rows beyond `capacity`.
    pub fn append_event(&self, event: &BehaviorEvent, capacity: usize) -> Result<(), StorageError> {
        let payload = serde_json::to_string(event).map_err(|e| StorageError::Malformed {
            key: "behavior_events".to_string(),
            message: e.to_string(),
        })?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO behavior_events (action, item_id, timestamp, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.action.as_str(),
                event.item.id,
                event.timestamp.to_rfc3339(),
                payload,
            ],
        )?;
        conn.execute(
            "DELETE FROM behavior_events
             WHERE id NOT IN (SELECT id FROM behavior_events ORDER BY id DESC LIMIT ?1)",
            params![capacity.max(1) as i64],
        )?;
        Ok(())
    }

    /// The newest `capacity` events as a log, oldest first. Rows that no
    /// longer decode are skipped.
    pub fn load_log(&self, capacity: usize) -> Result<BehaviorLog, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload FROM (
                SELECT id, payload FROM behavior_events ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![capacity.max(1) as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            match serde_json::from_str::<BehaviorEvent>(&payload) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(id, error = %e, "skipping undecodable behavior event"),
            }
        }
        Ok(BehaviorLog::from_events(events, capacity))
    }

    pub fn event_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM behavior_events", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl LearningStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.kv_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.kv_set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Action;
    use crate::context::Context;
    use crate::item::{Category, Item};
    use chrono::{Duration, TimeZone, Utc};

    fn event(minute: i64) -> BehaviorEvent {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap() + Duration::minutes(minute);
        let item = Item::new(format!("i{minute}"), Category::Life, now - Duration::days(2));
        BehaviorEvent::new(Action::Read, &item, &Context::at(now, false))
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "again").unwrap();
        assert_eq!(db.get("test").unwrap().as_deref(), Some("again"));
    }

    #[test]
    fn append_prunes_to_capacity() {
        let db = Database::open_memory().unwrap();
        for minute in 0..6 {
            db.append_event(&event(minute), 4).unwrap();
        }
        assert_eq!(db.event_count().unwrap(), 4);

        let log = db.load_log(4).unwrap();
        let ids: Vec<_> = log.events().map(|e| e.item.id.clone()).collect();
        assert_eq!(ids, vec!["i2", "i3", "i4", "i5"]);
    }

    #[test]
    fn load_log_returns_newest_slice_in_order() {
        let db = Database::open_memory().unwrap();
        for minute in 0..5 {
            db.append_event(&event(minute), 100).unwrap();
        }
        let log = db.load_log(2).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.recent(1)[0].item.id, "i4");
        assert_eq!(log.to_vec()[0], event(3));
    }

    #[test]
    fn undecodable_rows_are_skipped() {
        let db = Database::open_memory().unwrap();
        db.append_event(&event(0), 10).unwrap();
        db.conn()
            .unwrap()
            .execute(
                "INSERT INTO behavior_events (action, item_id, timestamp, payload)
                 VALUES ('read', 'x', '2026-10-19T09:00:00Z', 'not json')",
                [],
            )
            .unwrap();
        assert_eq!(db.load_log(10).unwrap().len(), 1);
    }
}
