//! Runtime configuration for statistics tracking
//!
//! Loaded once at startup from a TOML file; every section is optional
//! and falls back to the defaults below. Milestone reward tiers are
//! keyed by the threshold value kept as a string. Unparseable keys are
//! skipped with a warning at evaluation time rather than failing the
//! load.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::StatCategory;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub anti_farming: AntiFarmingSettings,

    #[serde(default)]
    pub milestones: MilestonesSettings,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Sliding-window limits for the farming guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiFarmingSettings {
    /// Length of the sliding window, in minutes.
    #[serde(default = "default_time_window_minutes")]
    pub time_window_minutes: i64,

    /// Deaths allowed to count per player within one window.
    /// 0 rejects every death.
    #[serde(default = "default_max_in_window")]
    pub max_deaths_in_window: usize,

    /// Kills allowed to count per (killer, victim) pair within one
    /// window. 0 rejects every player-vs-player kill.
    #[serde(default = "default_max_in_window")]
    pub max_kills_same_victim_in_window: usize,

    /// How often the background sweep prunes stale window entries,
    /// in minutes.
    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,
}

impl AntiFarmingSettings {
    pub fn window_ms(&self) -> i64 {
        self.time_window_minutes * 60 * 1000
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes * 60)
    }
}

impl Default for AntiFarmingSettings {
    fn default() -> Self {
        Self {
            time_window_minutes: default_time_window_minutes(),
            max_deaths_in_window: default_max_in_window(),
            max_kills_same_victim_in_window: default_max_in_window(),
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
        }
    }
}

fn default_time_window_minutes() -> i64 {
    10
}

fn default_max_in_window() -> usize {
    20
}

fn default_cleanup_interval_minutes() -> u64 {
    5
}

/// Milestone settings for all stat categories
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MilestonesSettings {
    #[serde(default)]
    pub timeplayed: MilestoneCategorySettings,

    #[serde(default)]
    pub kills: MilestoneCategorySettings,

    #[serde(default)]
    pub deaths: MilestoneCategorySettings,
}

impl MilestonesSettings {
    pub fn category(&self, category: StatCategory) -> &MilestoneCategorySettings {
        match category {
            StatCategory::TimePlayed => &self.timeplayed,
            StatCategory::Kills => &self.kills,
            StatCategory::Deaths => &self.deaths,
        }
    }
}

/// Milestone settings for one stat category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneCategorySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Threshold value (as a decimal string) to reward parameters.
    #[serde(default)]
    pub rewards: BTreeMap<String, RewardTier>,
}

impl Default for MilestoneCategorySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            rewards: BTreeMap::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Reward parameters for one configured threshold.
///
/// Only the field matching the category is read: `home_slots` for time
/// played, `max_hearts` for kills, `tokens` for deaths.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct RewardTier {
    pub home_slots: Option<u32>,
    pub max_hearts: Option<u32>,
    pub tokens: Option<u32>,
}

impl RewardTier {
    pub(crate) fn home_slots_or_default(&self) -> u32 {
        self.home_slots.unwrap_or(1)
    }

    pub(crate) fn max_hearts_or_default(&self) -> u32 {
        self.max_hearts.unwrap_or(1)
    }

    pub(crate) fn tokens_or_default(&self) -> u32 {
        self.tokens.unwrap_or(5)
    }
}
