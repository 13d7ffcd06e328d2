//! SQLite database connection and schema management for player statistics
//!
//! Manages the `stats.db` database file. One row per player plus one row
//! per achieved milestone; see [`SCHEMA_SQL`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Database wrapper shared across components
#[derive(Clone)]
pub struct StatsDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl StatsDb {
    /// Open or create the stats database at the default location
    /// (`~/.playtally/stats.db`)
    pub fn open_default() -> Result<Self> {
        let db_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".playtally")
            .join("stats.db");
        Self::open(&db_path)
    }

    /// Open or create the stats database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create stats dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open stats db: {}", path.display()))?;

        // WAL mode keeps concurrent event-thread reads from blocking writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a reference to the connection (for queries)
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Stats DB lock poisoned")
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }
}

/// SQL schema for the stats database
const SCHEMA_SQL: &str = r#"
-- Player statistics (one row per identity)
CREATE TABLE IF NOT EXISTS players (
    uuid TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    time_played INTEGER NOT NULL DEFAULT 0,
    session_start INTEGER NOT NULL DEFAULT 0,
    kills INTEGER NOT NULL DEFAULT 0,
    deaths INTEGER NOT NULL DEFAULT 0,
    chat_messages INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_players_username ON players(username COLLATE NOCASE);

-- Achieved milestones; the composite key makes awards idempotent
CREATE TABLE IF NOT EXISTS milestones (
    uuid TEXT NOT NULL,
    milestone_type TEXT NOT NULL,
    milestone_value INTEGER NOT NULL,
    achieved_at TEXT NOT NULL,
    PRIMARY KEY (uuid, milestone_type, milestone_value)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_stats.db");
        let db = StatsDb::open(&db_path).unwrap();

        // Verify tables exist
        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"players".to_string()));
        assert!(tables.contains(&"milestones".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_stats.db");
        StatsDb::open(&db_path).unwrap();
        // A second open against the same file must not fail on the schema
        StatsDb::open(&db_path).unwrap();
    }
}
