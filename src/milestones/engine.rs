//! Milestone evaluation engine
//!
//! Converts accumulated counters into exactly-once award events. The
//! milestone record is persisted before its reward is dispatched, so a
//! failed grant can never be retried into a double award; the record is
//! simply spent. Alongside the configured reward tiers, every multiple
//! of 1000 earns a progress announcement, suppressed when a tier award
//! already announced in the same pass.

use anyhow::Result;
use uuid::Uuid;

use super::rewards::RewardDispatch;
use crate::config::{MilestonesSettings, RewardTier};
use crate::store::{StatCategory, StatsStore};

/// Interval for implicit progress announcements, independent of the
/// configured reward tiers.
const PROGRESS_INTERVAL: i64 = 1000;

/// Reward granted by a configured milestone tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    HomeSlots(u32),
    MaxHearts(u32),
    Tokens(u32),
}

/// One milestone transition produced by an evaluation pass
#[derive(Debug, Clone)]
pub struct AwardEvent {
    pub player: Uuid,
    pub category: StatCategory,
    /// The configured threshold, or the floored 1000-multiple for
    /// progress announcements.
    pub value: i64,
    /// `None` for plain progress announcements.
    pub reward: Option<Reward>,
}

/// Evaluates counters against configured thresholds and dispatches
/// rewards
pub struct MilestoneEngine {
    store: StatsStore,
    settings: MilestonesSettings,
    dispatch: RewardDispatch,
}

impl MilestoneEngine {
    pub fn new(store: StatsStore, settings: MilestonesSettings, dispatch: RewardDispatch) -> Self {
        Self {
            store,
            settings,
            dispatch,
        }
    }

    /// Load the player's current counter for `category` and evaluate it.
    /// An absent record yields no events.
    pub fn evaluate_current(
        &self,
        player: Uuid,
        category: StatCategory,
        now_ms: i64,
    ) -> Result<Vec<AwardEvent>> {
        let Some(record) = self.store.player(player)? else {
            return Ok(Vec::new());
        };
        let value = match category {
            StatCategory::TimePlayed => record.hours_played(now_ms),
            StatCategory::Kills => record.kills,
            StatCategory::Deaths => record.deaths,
        };
        self.evaluate(player, &record.username, category, value)
    }

    /// Evaluate one category against a counter value.
    ///
    /// Emits at most one award per configured threshold over the
    /// record's lifetime, plus the every-1000 progress marker, which
    /// only announces when no tier award fired in the same pass.
    pub fn evaluate(
        &self,
        player: Uuid,
        username: &str,
        category: StatCategory,
        value: i64,
    ) -> Result<Vec<AwardEvent>> {
        let settings = self.settings.category(category);
        if !settings.enabled {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for (key, tier) in &settings.rewards {
            let threshold: i64 = match key.parse() {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!("Invalid milestone key in {} rewards: {}", category.kind(), key);
                    continue;
                }
            };
            if value < threshold || self.store.has_milestone(player, category.kind(), threshold)? {
                continue;
            }
            let reward = self.award(player, username, category, threshold, tier)?;
            events.push(AwardEvent {
                player,
                category,
                value: threshold,
                reward: Some(reward),
            });
        }

        if value >= PROGRESS_INTERVAL {
            let floored = (value / PROGRESS_INTERVAL) * PROGRESS_INTERVAL;
            if !self
                .store
                .has_milestone(player, category.thousand_kind(), floored)?
            {
                self.store
                    .add_milestone(player, category.thousand_kind(), floored)?;
                // A tier award this pass already announced the round number
                if events.is_empty() {
                    self.dispatch
                        .announce(&progress_message(username, category, floored));
                    events.push(AwardEvent {
                        player,
                        category,
                        value: floored,
                        reward: None,
                    });
                }
            }
        }

        Ok(events)
    }

    /// Persist the milestone, then dispatch its reward and announcement.
    fn award(
        &self,
        player: Uuid,
        username: &str,
        category: StatCategory,
        threshold: i64,
        tier: &RewardTier,
    ) -> Result<Reward> {
        self.store.add_milestone(player, category.kind(), threshold)?;
        if threshold >= PROGRESS_INTERVAL && threshold % PROGRESS_INTERVAL == 0 {
            // A tier on a round thousand also claims the progress marker
            self.store
                .add_milestone(player, category.thousand_kind(), threshold)?;
        }

        let reward = match category {
            StatCategory::TimePlayed => Reward::HomeSlots(tier.home_slots_or_default()),
            StatCategory::Kills => Reward::MaxHearts(tier.max_hearts_or_default()),
            StatCategory::Deaths => Reward::Tokens(tier.tokens_or_default()),
        };
        match reward {
            Reward::HomeSlots(count) => self.dispatch.grant_home_slots(player, count),
            Reward::MaxHearts(count) => self.dispatch.grant_max_hearts(player, count),
            Reward::Tokens(count) => self.dispatch.grant_tokens(player, count),
        }
        self.dispatch
            .announce(&award_message(username, threshold, reward));
        Ok(reward)
    }
}

fn award_message(username: &str, value: i64, reward: Reward) -> String {
    match reward {
        Reward::HomeSlots(slots) => format!(
            "{username} has reached {value} {} of playtime and received +{slots} {}.",
            plural(value, "hour"),
            plural(slots as i64, "home slot")
        ),
        Reward::MaxHearts(hearts) => format!(
            "{username} has reached {value} {} and received +{hearts} {}.",
            plural(value, "kill"),
            plural(hearts as i64, "max heart")
        ),
        Reward::Tokens(tokens) => format!(
            "{username} has died {value} {} and received {tokens} {} for their trouble.",
            plural(value, "time"),
            plural(tokens as i64, "token")
        ),
    }
}

fn progress_message(username: &str, category: StatCategory, value: i64) -> String {
    match category {
        StatCategory::TimePlayed => format!(
            "{username} has reached {value} {} of playtime.",
            plural(value, "hour")
        ),
        StatCategory::Kills => {
            format!("{username} has reached {value} {}.", plural(value, "kill"))
        }
        StatCategory::Deaths => {
            format!("{username} has died {value} {}.", plural(value, "time"))
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MilestoneCategorySettings;
    use crate::milestones::rewards::{HeartGrantor, MessageRelay};
    use crate::store::StatsDb;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

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

    #[derive(Default)]
    struct RecordingHearts {
        grants: Mutex<Vec<(Uuid, u32)>>,
    }

    impl HeartGrantor for RecordingHearts {
        fn grant_max_hearts(&self, player: Uuid, count: u32) -> Result<()> {
            self.grants.lock().unwrap().push((player, count));
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        engine: MilestoneEngine,
        relay: Arc<RecordingRelay>,
        hearts: Arc<RecordingHearts>,
    }

    fn harness(kills_rewards: &[(&str, u32)]) -> Harness {
        let dir = tempdir().unwrap();
        let db = StatsDb::open(&dir.path().join("stats.db")).unwrap();
        let store = StatsStore::new(db);

        let mut rewards = BTreeMap::new();
        for (key, hearts) in kills_rewards {
            rewards.insert(
                key.to_string(),
                RewardTier {
                    max_hearts: Some(*hearts),
                    ..Default::default()
                },
            );
        }
        let settings = MilestonesSettings {
            kills: MilestoneCategorySettings {
                enabled: true,
                rewards,
            },
            ..Default::default()
        };

        let relay = Arc::new(RecordingRelay::default());
        let hearts = Arc::new(RecordingHearts::default());
        let dispatch = RewardDispatch::new()
            .with_local_broadcast(relay.clone())
            .with_heart_grantor(hearts.clone());

        Harness {
            _dir: dir,
            engine: MilestoneEngine::new(store, settings, dispatch),
            relay,
            hearts,
        }
    }

    #[test]
    fn test_tier_awards_exactly_once() {
        let h = harness(&[("50", 2)]);
        let player = Uuid::new_v4();

        // Below the threshold: nothing
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 49).unwrap();
        assert!(events.is_empty());

        // Crossing it: exactly one award with the configured hearts
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 50).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 50);
        assert_eq!(events[0].reward, Some(Reward::MaxHearts(2)));
        assert_eq!(h.hearts.grants.lock().unwrap().as_slice(), &[(player, 2)]);

        // Counting past it: never again
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 51).unwrap();
        assert!(events.is_empty());
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 999).unwrap();
        assert!(events.is_empty());
        assert_eq!(h.hearts.grants.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_award_message_wording() {
        let h = harness(&[("50", 2)]);
        let player = Uuid::new_v4();
        h.engine.evaluate(player, "Alex", StatCategory::Kills, 50).unwrap();

        assert_eq!(
            h.relay.messages.lock().unwrap().as_slice(),
            &["Alex has reached 50 kills and received +2 max hearts."]
        );
    }

    #[test]
    fn test_multiple_thresholds_in_one_pass() {
        let h = harness(&[("10", 1), ("25", 2)]);
        let player = Uuid::new_v4();

        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 30).unwrap();
        let mut values: Vec<i64> = events.iter().map(|e| e.value).collect();
        values.sort_unstable();
        assert_eq!(values, vec![10, 25]);
    }

    #[test]
    fn test_invalid_key_is_skipped() {
        let h = harness(&[("fifty", 9), ("10", 1)]);
        let player = Uuid::new_v4();

        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 100).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 10);
    }

    #[test]
    fn test_disabled_category_emits_nothing() {
        let mut h = harness(&[("50", 2)]);
        h.engine.settings.kills.enabled = false;

        let events = h
            .engine
            .evaluate(Uuid::new_v4(), "Alex", StatCategory::Kills, 50)
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_progress_announcement_fires_once() {
        let h = harness(&[]);
        let player = Uuid::new_v4();

        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 1_234).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 1_000);
        assert_eq!(events[0].reward, None);
        assert_eq!(
            h.relay.messages.lock().unwrap().as_slice(),
            &["Alex has reached 1000 kills."]
        );

        // Same floored value again: silent
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 1_500).unwrap();
        assert!(events.is_empty());

        // Next multiple fires anew
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 2_000).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 2_000);
    }

    #[test]
    fn test_progress_suppressed_when_tier_fired_same_pass() {
        let h = harness(&[("1000", 3)]);
        let player = Uuid::new_v4();

        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 1_000).unwrap();
        // One tier award, no separate progress announcement
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reward, Some(Reward::MaxHearts(3)));
        assert_eq!(
            h.relay.messages.lock().unwrap().as_slice(),
            &["Alex has reached 1000 kills and received +3 max hearts."]
        );

        // The tier also claimed the progress marker, so a later pass
        // stays silent for 1000
        let events = h.engine.evaluate(player, "Alex", StatCategory::Kills, 1_001).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_timeplayed_and_deaths_wording() {
        let dir = tempdir().unwrap();
        let db = StatsDb::open(&dir.path().join("stats.db")).unwrap();
        let store = StatsStore::new(db);

        let mut settings = MilestonesSettings::default();
        settings.timeplayed.rewards.insert(
            "1".to_string(),
            RewardTier {
                home_slots: Some(1),
                ..Default::default()
            },
        );
        settings
            .deaths
            .rewards
            .insert("100".to_string(), RewardTier::default());

        let relay = Arc::new(RecordingRelay::default());
        let dispatch = RewardDispatch::new().with_local_broadcast(relay.clone());
        let engine = MilestoneEngine::new(store, settings, dispatch);
        let player = Uuid::new_v4();

        engine.evaluate(player, "Alex", StatCategory::TimePlayed, 1).unwrap();
        engine.evaluate(player, "Alex", StatCategory::Deaths, 100).unwrap();

        assert_eq!(
            relay.messages.lock().unwrap().as_slice(),
            &[
                "Alex has reached 1 hour of playtime and received +1 home slot.",
                "Alex has died 100 times and received 5 tokens for their trouble.",
            ]
        );
    }

    #[test]
    fn test_evaluate_current_with_absent_record() {
        let h = harness(&[("50", 2)]);
        let events = h
            .engine
            .evaluate_current(Uuid::new_v4(), StatCategory::Kills, 0)
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_evaluate_current_reads_the_counter() {
        let h = harness(&[("2", 1)]);
        let player = Uuid::new_v4();
        let store = h.engine.store.clone();
        store.upsert_on_connect(player, "Alex", 0).unwrap();
        store.increment_kills(player).unwrap();
        store.increment_kills(player).unwrap();

        let events = h
            .engine
            .evaluate_current(player, StatCategory::Kills, 0)
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 2);
    }
}
