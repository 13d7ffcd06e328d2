//! Read-only formatted query surface
//!
//! One-line stat summaries in the shape the host's command and relay
//! surfaces expect. Plain strings only; styling stays with the host.

use anyhow::Result;
use uuid::Uuid;

use crate::session;
use crate::store::{PlayerRecord, StatsStore};

/// Stat kinds the query surface can render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    FirstSeen,
    LastSeen,
    TimePlayed,
    Kills,
    Deaths,
    Chatter,
}

pub struct StatsApi {
    store: StatsStore,
}

impl StatsApi {
    pub fn new(store: StatsStore) -> Self {
        Self { store }
    }

    pub fn player(&self, player: Uuid) -> Result<Option<PlayerRecord>> {
        self.store.player(player)
    }

    pub fn player_by_name(&self, username: &str) -> Result<Option<PlayerRecord>> {
        self.store.player_by_username(username)
    }

    pub fn is_online(&self, username: &str) -> Result<bool> {
        Ok(self
            .store
            .player_by_username(username)?
            .is_some_and(|r| r.is_online()))
    }

    /// One-line stat summary, with a distinct message for players that
    /// never joined.
    pub fn formatted_stat(&self, username: &str, kind: StatKind) -> Result<String> {
        let Some(record) = self.store.player_by_username(username)? else {
            return Ok(format!("Player '{username}' has never joined the server!"));
        };

        let now = session::now_millis();
        Ok(match kind {
            StatKind::FirstSeen => format!(
                "{} first joined on {}",
                record.username,
                record.formatted_first_seen()
            ),
            StatKind::LastSeen => {
                if record.is_online() {
                    format!("{} is currently online.", record.username)
                } else {
                    format!(
                        "{} was last seen on {}",
                        record.username,
                        record.formatted_last_seen()
                    )
                }
            }
            StatKind::TimePlayed => format!(
                "{} has played for {}",
                record.username,
                record.formatted_time_played(now)
            ),
            StatKind::Kills => format!("{} has {} kills.", record.username, record.kills),
            StatKind::Deaths => format!("{} has died {} times.", record.username, record.deaths),
            StatKind::Chatter => format!(
                "{} has sent {} chat messages.",
                record.username, record.chat_messages
            ),
        })
    }
}
