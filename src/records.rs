//! Persisted records: best score, best level, time played
//!
//! Stored as plain integers so the keys stay readable in devtools.

use crate::persistence::{KeyValueStore, load_int};

/// Personal bests and play-time tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Records {
    pub best_score: u64,
    pub best_level: u32,
    /// Cumulative active play time (ms)
    pub time_played_ms: u64,
}

impl Records {
    const BEST_SCORE_KEY: &'static str = "mergeToZeroBest";
    const BEST_LEVEL_KEY: &'static str = "mergeToZeroBestLevel";
    const TIME_PLAYED_KEY: &'static str = "mergeToZeroTimePlayed";

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a final score. Returns true if it is a new best.
    pub fn submit_score(&mut self, score: u64) -> bool {
        if score > self.best_score {
            self.best_score = score;
            true
        } else {
            false
        }
    }

    /// Record a reached level. Returns true if it is a new best.
    pub fn submit_level(&mut self, level: u32) -> bool {
        if level > self.best_level {
            self.best_level = level;
            true
        } else {
            false
        }
    }

    pub fn add_time(&mut self, ms: u64) {
        self.time_played_ms = self.time_played_ms.saturating_add(ms);
    }

    /// Read all records (missing or unreadable keys count as zero)
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let records = Self {
            best_score: load_int(store, Self::BEST_SCORE_KEY).unwrap_or(0),
            best_level: load_int(store, Self::BEST_LEVEL_KEY).unwrap_or(0),
            time_played_ms: load_int(store, Self::TIME_PLAYED_KEY).unwrap_or(0),
        };
        log::info!(
            "Records loaded: best score {}, best level {}",
            records.best_score,
            records.best_level
        );
        records
    }

    pub fn save_best_score(&self, store: &mut dyn KeyValueStore) {
        if !store.set(Self::BEST_SCORE_KEY, &self.best_score.to_string()) {
            log::warn!("Could not save best score");
        }
    }

    pub fn save_best_level(&self, store: &mut dyn KeyValueStore) {
        if !store.set(Self::BEST_LEVEL_KEY, &self.best_level.to_string()) {
            log::warn!("Could not save best level");
        }
    }

    pub fn save_time_played(&self, store: &mut dyn KeyValueStore) {
        if !store.set(Self::TIME_PLAYED_KEY, &self.time_played_ms.to_string()) {
            log::warn!("Could not save play time");
        }
    }
}
