//! Reward and announcement dispatch for milestone awards
//!
//! Each integration is a capability the host may or may not supply at
//! startup. A missing capability is a silent no-op; a failing one is
//! logged and swallowed, so a broken integration can never block the
//! award that triggered it.

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

/// Grants extra home slots (home integration).
pub trait HomeGrantor: Send + Sync {
    fn grant_home_slots(&self, player: Uuid, count: u32) -> Result<()>;
}

/// Raises a player's maximum hearts (lifesteal integration).
pub trait HeartGrantor: Send + Sync {
    fn grant_max_hearts(&self, player: Uuid, count: u32) -> Result<()>;
}

/// Grants vote-style tokens (token integration).
pub trait TokenGrantor: Send + Sync {
    fn grant_tokens(&self, player: Uuid, count: u32) -> Result<()>;
}

/// Delivers one announcement line to a chat surface. Used for both the
/// local broadcast and the external relay slots.
pub trait MessageRelay: Send + Sync {
    fn send_message(&self, message: &str) -> Result<()>;
}

/// The set of reward integrations present in this deployment
#[derive(Clone, Default)]
pub struct RewardDispatch {
    homes: Option<Arc<dyn HomeGrantor>>,
    hearts: Option<Arc<dyn HeartGrantor>>,
    tokens: Option<Arc<dyn TokenGrantor>>,
    broadcast: Option<Arc<dyn MessageRelay>>,
    relay: Option<Arc<dyn MessageRelay>>,
}

impl RewardDispatch {
    /// A dispatch with no integrations; every call is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_home_grantor(mut self, grantor: Arc<dyn HomeGrantor>) -> Self {
        self.homes = Some(grantor);
        self
    }

    pub fn with_heart_grantor(mut self, grantor: Arc<dyn HeartGrantor>) -> Self {
        self.hearts = Some(grantor);
        self
    }

    pub fn with_token_grantor(mut self, grantor: Arc<dyn TokenGrantor>) -> Self {
        self.tokens = Some(grantor);
        self
    }

    /// Chat surface visible to connected players.
    pub fn with_local_broadcast(mut self, relay: Arc<dyn MessageRelay>) -> Self {
        self.broadcast = Some(relay);
        self
    }

    /// External relay (e.g. a chat bridge) for the same announcements.
    pub fn with_external_relay(mut self, relay: Arc<dyn MessageRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub(crate) fn grant_home_slots(&self, player: Uuid, count: u32) {
        let Some(homes) = &self.homes else { return };
        match homes.grant_home_slots(player, count) {
            Ok(()) => tracing::info!("Awarded {} home slot(s) to {}", count, player),
            Err(e) => tracing::warn!("Failed to award home slots to {}: {:#}", player, e),
        }
    }

    pub(crate) fn grant_max_hearts(&self, player: Uuid, count: u32) {
        let Some(hearts) = &self.hearts else { return };
        match hearts.grant_max_hearts(player, count) {
            Ok(()) => tracing::info!("Awarded {} max heart(s) to {}", count, player),
            Err(e) => tracing::warn!("Failed to award max hearts to {}: {:#}", player, e),
        }
    }

    pub(crate) fn grant_tokens(&self, player: Uuid, count: u32) {
        let Some(tokens) = &self.tokens else { return };
        match tokens.grant_tokens(player, count) {
            Ok(()) => tracing::info!("Awarded {} token(s) to {}", count, player),
            Err(e) => tracing::warn!("Failed to award tokens to {}: {:#}", player, e),
        }
    }

    /// Send an announcement to the local broadcast and the external
    /// relay, independently.
    pub(crate) fn announce(&self, message: &str) {
        if let Some(broadcast) = &self.broadcast {
            if let Err(e) = broadcast.send_message(message) {
                tracing::warn!("Failed to broadcast announcement: {:#}", e);
            }
        }
        if let Some(relay) = &self.relay {
            if let Err(e) = relay.send_message(message) {
                tracing::warn!("Failed to relay announcement: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRelay {
        messages: Mutex<Vec<String>>,
    }

    impl MessageRelay for RecordingRelay {
        fn send_message(&self, message: &str) -> Result<()> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct FailingHomes;

    impl HomeGrantor for FailingHomes {
        fn grant_home_slots(&self, _player: Uuid, _count: u32) -> Result<()> {
            anyhow::bail!("integration offline")
        }
    }

    #[test]
    fn test_empty_dispatch_is_a_noop() {
        let dispatch = RewardDispatch::new();
        let player = Uuid::new_v4();
        dispatch.grant_home_slots(player, 1);
        dispatch.grant_max_hearts(player, 1);
        dispatch.grant_tokens(player, 5);
        dispatch.announce("nothing listens");
    }

    #[test]
    fn test_failing_grantor_is_swallowed() {
        let dispatch = RewardDispatch::new().with_home_grantor(Arc::new(FailingHomes));
        dispatch.grant_home_slots(Uuid::new_v4(), 1);
    }

    #[test]
    fn test_announce_reaches_both_sinks() {
        let local = Arc::new(RecordingRelay::default());
        let external = Arc::new(RecordingRelay::default());
        let dispatch = RewardDispatch::new()
            .with_local_broadcast(local.clone())
            .with_external_relay(external.clone());

        dispatch.announce("hello");

        assert_eq!(*local.messages.lock().unwrap(), vec!["hello"]);
        assert_eq!(*external.messages.lock().unwrap(), vec!["hello"]);
    }
}
