//! Event-facing coordinator for statistics tracking
//!
//! The host's event dispatch layer calls one handler per raw
//! notification (join, quit, kill, death, chat). Everything downstream
//! hangs off this context: session bookkeeping in the store, farming
//! admission, and milestone evaluation. Constructed once at startup and
//! shared across the host's notification threads.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::farming::FarmingGuard;
use crate::milestones::{AwardEvent, MilestoneEngine, RewardDispatch};
use crate::session;
use crate::store::{StatCategory, StatsDb, StatsStore};

pub struct StatsTracker {
    store: StatsStore,
    guard: Arc<FarmingGuard>,
    engine: MilestoneEngine,
    sweep_interval: Duration,
}

impl StatsTracker {
    pub fn new(db: StatsDb, config: Config, dispatch: RewardDispatch) -> Self {
        let store = StatsStore::new(db);
        let guard = Arc::new(FarmingGuard::new(&config.anti_farming));
        let sweep_interval = config.anti_farming.cleanup_interval();
        let engine = MilestoneEngine::new(store.clone(), config.milestones, dispatch);
        Self {
            store,
            guard,
            engine,
            sweep_interval,
        }
    }

    pub fn store(&self) -> &StatsStore {
        &self.store
    }

    /// Player connected: open the session and re-check playtime
    /// milestones.
    pub fn handle_connect(&self, player: Uuid, username: &str) -> Result<Vec<AwardEvent>> {
        let now = session::now_millis();
        self.store
            .upsert_on_connect(player, username, now)
            .inspect_err(|e| {
                tracing::error!("Failed to record connect for {}: {:#}", username, e);
            })?;
        tracing::debug!("Session opened for {} ({})", username, player);
        Ok(self.evaluate_guarded(player, StatCategory::TimePlayed, now))
    }

    /// Player disconnected: fold the open session into time played.
    pub fn handle_disconnect(&self, player: Uuid) -> Result<()> {
        self.store
            .close_session(player, session::now_millis())
            .inspect_err(|e| {
                tracing::error!("Failed to record disconnect for {}: {:#}", player, e);
            })
    }

    /// Player died. The counter only increments when the farming guard
    /// admits the event; a rejected event changes nothing.
    pub fn handle_death(&self, player: Uuid) -> Result<Vec<AwardEvent>> {
        let now = session::now_millis();
        if !self.guard.admit_death(player, now) {
            return Ok(Vec::new());
        }
        self.store.increment_deaths(player).inspect_err(|e| {
            tracing::error!("Failed to increment deaths for {}: {:#}", player, e);
        })?;
        Ok(self.evaluate_guarded(player, StatCategory::Deaths, now))
    }

    /// Something died to this player. `victim` carries the identity only
    /// for player victims; kills of non-player targets always count.
    pub fn handle_kill(&self, killer: Uuid, victim: Option<Uuid>) -> Result<Vec<AwardEvent>> {
        let now = session::now_millis();
        if !self.guard.admit_kill(killer, victim, now) {
            return Ok(Vec::new());
        }
        self.store.increment_kills(killer).inspect_err(|e| {
            tracing::error!("Failed to increment kills for {}: {:#}", killer, e);
        })?;
        Ok(self.evaluate_guarded(killer, StatCategory::Kills, now))
    }

    /// Player sent a chat message. No milestones are tied to chat.
    pub fn handle_chat(&self, player: Uuid) -> Result<()> {
        self.store
            .increment_chat_messages(player)
            .inspect_err(|e| {
                tracing::error!("Failed to increment chat messages for {}: {:#}", player, e);
            })
    }

    /// One player's failed evaluation must not block statistics
    /// accounting for anyone, so engine errors stop here.
    fn evaluate_guarded(&self, player: Uuid, category: StatCategory, now_ms: i64) -> Vec<AwardEvent> {
        match self.engine.evaluate_current(player, category, now_ms) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    "Milestone evaluation failed for {} ({}): {:#}",
                    player,
                    category.kind(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Close every open session, tolerating records that are already
    /// closed or gone. Call before dropping the store on shutdown.
    pub fn shutdown(&self) {
        let now = session::now_millis();
        let open = match self.store.open_sessions() {
            Ok(open) => open,
            Err(e) => {
                tracing::error!("Failed to list open sessions during shutdown: {:#}", e);
                return;
            }
        };
        for player in open {
            if let Err(e) = self.store.close_session(player, now) {
                tracing::warn!("Failed to close session for {} during shutdown: {:#}", player, e);
            }
        }
    }

    /// Spawn the periodic farming-window sweep at the configured
    /// interval. Abort the handle on shutdown.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        FarmingGuard::spawn_sweeper(Arc::clone(&self.guard), self.sweep_interval)
    }
}
