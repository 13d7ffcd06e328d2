//! Sliding-window anti-farming guard
//!
//! Rate-limits credit-worthy kill and death events. The host always
//! delivers the raw game events; the guard only decides whether the
//! corresponding persisted counter may increment. Deaths are windowed
//! per victim; kills are windowed per (killer, victim) pair, which
//! targets repeated farming of one cooperating or helpless victim while
//! leaving spread-out combat untouched.
//!
//! All window state is in-memory only. Keys whose windows empty out are
//! evicted, so memory stays bounded by currently-active farmers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AntiFarmingSettings;
use crate::session;

type WindowSlot = Arc<Mutex<Vec<i64>>>;

/// Timestamp windows keyed by an arbitrary id, with per-key locking.
///
/// The registry mutex is held only long enough to look up or insert a
/// slot; the check-and-append for one key runs under that key's own
/// lock. Admissions for different keys never serialize on each other.
struct WindowMap<K> {
    slots: Mutex<HashMap<K, WindowSlot>>,
}

impl<K: Eq + Hash> WindowMap<K> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Prune the key's window to entries inside `window_ms`, then admit
    /// and record `now_ms` unless the pruned window already holds `max`
    /// entries. Check and append are atomic per key.
    fn admit(&self, key: K, now_ms: i64, window_ms: i64, max: usize) -> bool {
        let slot = {
            let mut slots = self.slots.lock().expect("farming registry lock poisoned");
            slots.entry(key).or_default().clone()
        };

        let mut stamps = slot.lock().expect("farming slot lock poisoned");
        stamps.retain(|&t| now_ms - t <= window_ms);
        if stamps.len() >= max {
            return false;
        }
        stamps.push(now_ms);
        true
    }

    /// Drop expired timestamps everywhere and evict keys whose windows
    /// empty out. A slot still referenced by an in-flight `admit` is
    /// kept even when empty so that admit's append is never lost.
    fn sweep(&self, now_ms: i64, window_ms: i64) {
        let mut slots = self.slots.lock().expect("farming registry lock poisoned");
        slots.retain(|_, slot| {
            let mut stamps = slot.lock().expect("farming slot lock poisoned");
            stamps.retain(|&t| now_ms - t <= window_ms);
            !stamps.is_empty() || Arc::strong_count(slot) > 1
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// Decides whether kill/death events may count towards persisted stats
pub struct FarmingGuard {
    window_ms: i64,
    max_deaths_in_window: usize,
    max_kills_same_victim_in_window: usize,
    deaths: WindowMap<Uuid>,
    kills: WindowMap<(Uuid, Uuid)>,
}

impl FarmingGuard {
    pub fn new(settings: &AntiFarmingSettings) -> Self {
        tracing::info!(
            "Farming guard initialised with {} minute window, {} max deaths, {} max kills per victim",
            settings.time_window_minutes,
            settings.max_deaths_in_window,
            settings.max_kills_same_victim_in_window
        );
        Self {
            window_ms: settings.window_ms(),
            max_deaths_in_window: settings.max_deaths_in_window,
            max_kills_same_victim_in_window: settings.max_kills_same_victim_in_window,
            deaths: WindowMap::new(),
            kills: WindowMap::new(),
        }
    }

    /// Whether this death may increment the player's death counter.
    pub fn admit_death(&self, player: Uuid, now_ms: i64) -> bool {
        let admitted = self.deaths.admit(
            player,
            now_ms,
            self.window_ms,
            self.max_deaths_in_window,
        );
        if !admitted {
            tracing::info!(
                "Death farming detected for player {} - limit reached within the last {} minutes",
                player,
                self.window_ms / 60_000
            );
        }
        admitted
    }

    /// Whether this kill may increment the killer's kill counter.
    ///
    /// An absent victim identity (non-player target) always counts;
    /// farming control applies to player-vs-player credit only.
    pub fn admit_kill(&self, killer: Uuid, victim: Option<Uuid>, now_ms: i64) -> bool {
        let Some(victim) = victim else {
            return true;
        };
        let admitted = self.kills.admit(
            (killer, victim),
            now_ms,
            self.window_ms,
            self.max_kills_same_victim_in_window,
        );
        if !admitted {
            tracing::info!(
                "Kill farming detected for killer {} against victim {} - limit reached within the last {} minutes",
                killer,
                victim,
                self.window_ms / 60_000
            );
        }
        admitted
    }

    /// Periodic maintenance: prune every window and evict empty keys.
    /// Safe to run concurrently with admit calls.
    pub fn sweep(&self, now_ms: i64) {
        self.deaths.sweep(now_ms, self.window_ms);
        self.kills.sweep(now_ms, self.window_ms);
    }

    /// Run [`Self::sweep`] on a fixed interval until the handle is
    /// aborted.
    pub fn spawn_sweeper(guard: Arc<Self>, every: Duration) -> JoinHandle<()> {
        // A zero interval would busy-spin
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                guard.sweep(session::now_millis());
            }
        })
    }

    #[cfg(test)]
    fn tracked(&self) -> (usize, usize) {
        (self.deaths.tracked_keys(), self.kills.tracked_keys())
    }
}
