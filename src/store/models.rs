//! Data models for player statistics

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session;

/// One player's persisted statistics row.
///
/// Counters are monotonically non-decreasing over the record's life;
/// the record itself is never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub uuid: Uuid,
    /// Latest known display name.
    pub username: String,
    /// Wall-clock string, set once on first connect.
    pub first_seen: String,
    /// Wall-clock string, refreshed on connect and on session close.
    pub last_seen: String,
    /// Cumulative closed-session playtime in milliseconds.
    pub time_played_ms: i64,
    /// Epoch millis of the open session start; 0 when offline.
    pub session_start_ms: i64,
    pub kills: i64,
    pub deaths: i64,
    pub chat_messages: i64,
}

impl PlayerRecord {
    pub fn is_online(&self) -> bool {
        self.session_start_ms > 0
    }

    /// Stored playtime plus the open session's elapsed time.
    pub fn live_time_played(&self, now_ms: i64) -> i64 {
        session::live_time_played(self.time_played_ms, self.session_start_ms, now_ms)
    }

    /// Whole hours played, floored.
    pub fn hours_played(&self, now_ms: i64) -> i64 {
        session::hours_played(self.time_played_ms, self.session_start_ms, now_ms)
    }

    pub fn formatted_time_played(&self, now_ms: i64) -> String {
        session::format_duration(self.live_time_played(now_ms))
    }

    pub fn formatted_first_seen(&self) -> String {
        session::iso8601_string(&self.first_seen)
    }

    pub fn formatted_last_seen(&self) -> String {
        session::iso8601_string(&self.last_seen)
    }
}

/// Statistic categories that can earn milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatCategory {
    TimePlayed,
    Kills,
    Deaths,
}

impl StatCategory {
    /// Milestone kind key for configured reward tiers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TimePlayed => "timeplayed",
            Self::Kills => "kills",
            Self::Deaths => "deaths",
        }
    }

    /// Milestone kind key for the every-1000 progress markers.
    pub fn thousand_kind(&self) -> &'static str {
        match self {
            Self::TimePlayed => "timeplayed_1000h",
            Self::Kills => "kills_1000",
            Self::Deaths => "deaths_1000",
        }
    }
}
