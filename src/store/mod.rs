//! Player statistics persistence
//!
//! [`StatsStore`] is the narrow interface every other component goes
//! through: record reads, connect/disconnect session bookkeeping, atomic
//! counter increments, and the idempotent milestone ledger. An absent
//! record is an `Ok(None)`, never an error.
//!
//! All read-modify-write operations happen SQL-side (`kills = kills + 1`,
//! `ON CONFLICT ... DO UPDATE`) so concurrent event threads cannot lose
//! updates.

mod db;
mod models;

pub use db::StatsDb;
pub use models::{PlayerRecord, StatCategory};

use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::session;

/// Narrow persistence interface over the stats database
#[derive(Clone)]
pub struct StatsStore {
    db: StatsDb,
}

impl StatsStore {
    pub fn new(db: StatsDb) -> Self {
        Self { db }
    }

    /// Fetch a player's record by identity.
    pub fn player(&self, player: Uuid) -> Result<Option<PlayerRecord>> {
        let conn = self.db.conn();
        let record = conn
            .query_row(
                "SELECT uuid, username, first_seen, last_seen, time_played, session_start,
                        kills, deaths, chat_messages
                 FROM players WHERE uuid = ?1",
                [player.to_string()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Fetch a player's record by latest-known display name,
    /// case-insensitively. Picks the most recently seen row when several
    /// players have held the name.
    pub fn player_by_username(&self, username: &str) -> Result<Option<PlayerRecord>> {
        let conn = self.db.conn();
        let record = conn
            .query_row(
                "SELECT uuid, username, first_seen, last_seen, time_played, session_start,
                        kills, deaths, chat_messages
                 FROM players WHERE username = ?1 COLLATE NOCASE
                 ORDER BY last_seen DESC LIMIT 1",
                [username],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Create or refresh a record on connect and open a session.
    ///
    /// A second call without an intervening [`Self::close_session`]
    /// simply resets the session start (rejoin without a clean
    /// disconnect). `first_seen` is only ever written on insert.
    pub fn upsert_on_connect(&self, player: Uuid, username: &str, now_ms: i64) -> Result<()> {
        let now = session::wall_clock_string(now_ms);
        let conn = self.db.conn();
        conn.execute(
            r#"INSERT INTO players (uuid, username, first_seen, last_seen, session_start)
               VALUES (?1, ?2, ?3, ?3, ?4)
               ON CONFLICT(uuid) DO UPDATE SET
                   username = ?2, last_seen = ?3, session_start = ?4"#,
            params![player.to_string(), username, now, now_ms],
        )?;
        Ok(())
    }

    /// Fold the open session into `time_played` and mark the player
    /// offline. No-op when no session is open or the record is absent.
    pub fn close_session(&self, player: Uuid, now_ms: i64) -> Result<()> {
        let now = session::wall_clock_string(now_ms);
        let conn = self.db.conn();
        // The zero floor keeps a skewed clock from shrinking time_played
        conn.execute(
            r#"UPDATE players
               SET last_seen = ?1,
                   time_played = time_played + MAX(?2 - session_start, 0),
                   session_start = 0
               WHERE uuid = ?3 AND session_start > 0"#,
            params![now, now_ms, player.to_string()],
        )?;
        Ok(())
    }

    /// Stored playtime plus the open session's elapsed time, if the
    /// record exists.
    pub fn live_time_played(&self, player: Uuid, now_ms: i64) -> Result<Option<i64>> {
        Ok(self.player(player)?.map(|r| r.live_time_played(now_ms)))
    }

    pub fn increment_kills(&self, player: Uuid) -> Result<()> {
        self.increment(player, "kills")
    }

    pub fn increment_deaths(&self, player: Uuid) -> Result<()> {
        self.increment(player, "deaths")
    }

    pub fn increment_chat_messages(&self, player: Uuid) -> Result<()> {
        self.increment(player, "chat_messages")
    }

    fn increment(&self, player: Uuid, column: &'static str) -> Result<()> {
        let conn = self.db.conn();
        conn.execute(
            &format!("UPDATE players SET {column} = {column} + 1 WHERE uuid = ?1"),
            [player.to_string()],
        )?;
        Ok(())
    }

    /// Whether a milestone has already been achieved.
    pub fn has_milestone(&self, player: Uuid, kind: &str, value: i64) -> Result<bool> {
        let conn = self.db.conn();
        let found = conn
            .query_row(
                "SELECT 1 FROM milestones
                 WHERE uuid = ?1 AND milestone_type = ?2 AND milestone_value = ?3",
                params![player.to_string(), kind, value],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Record a milestone as achieved. Idempotent: the composite primary
    /// key absorbs a repeat insert.
    pub fn add_milestone(&self, player: Uuid, kind: &str, value: i64) -> Result<()> {
        let achieved_at = session::wall_clock_string(session::now_millis());
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO milestones (uuid, milestone_type, milestone_value, achieved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![player.to_string(), kind, value, achieved_at],
        )?;
        Ok(())
    }

    /// Identities with an open session, for the shutdown flush.
    pub fn open_sessions(&self) -> Result<Vec<Uuid>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT uuid FROM players WHERE session_start > 0")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|raw| Uuid::parse_str(&raw).ok())
            .collect();
        Ok(ids)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PlayerRecord> {
    let raw: String = row.get(0)?;
    let uuid = Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PlayerRecord {
        uuid,
        username: row.get(1)?,
        first_seen: row.get(2)?,
        last_seen: row.get(3)?,
        time_played_ms: row.get(4)?,
        session_start_ms: row.get(5)?,
        kills: row.get(6)?,
        deaths: row.get(7)?,
        chat_messages: row.get(8)?,
    })
}
