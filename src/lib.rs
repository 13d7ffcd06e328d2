//! playtally - player statistics with anti-farming and milestone rewards
//!
//! Tracks long-lived per-player engagement counters (session time,
//! kills, deaths, chat activity) in an embedded SQLite store,
//! rate-limits credit farming through sliding time windows, and converts
//! accumulated counters into exactly-once milestone rewards.
//!
//! The crate is a library: the hosting runtime delivers raw
//! join/quit/kill/death/chat notifications to a [`StatsTracker`] and
//! supplies whichever reward integrations are present through
//! [`RewardDispatch`]. Missing integrations are silent no-ops.
//!
//! ```ignore
//! let db = StatsDb::open(&data_dir.join("stats.db"))?;
//! let tracker = StatsTracker::new(db, Config::default(), RewardDispatch::new());
//! let sweeper = tracker.start_sweeper();
//!
//! tracker.handle_connect(player, "Steve")?;
//! tracker.handle_kill(player, Some(victim))?;
//!
//! tracker.shutdown();
//! sweeper.abort();
//! ```

pub mod api;
pub mod config;
pub mod farming;
pub mod milestones;
pub mod session;
pub mod store;
pub mod tracker;

pub use api::{StatKind, StatsApi};
pub use config::{AntiFarmingSettings, Config, ConfigError, MilestonesSettings, RewardTier};
pub use farming::FarmingGuard;
pub use milestones::{
    AwardEvent, HeartGrantor, HomeGrantor, MessageRelay, MilestoneEngine, Reward, RewardDispatch,
    TokenGrantor,
};
pub use store::{PlayerRecord, StatCategory, StatsDb, StatsStore};
pub use tracker::StatsTracker;
