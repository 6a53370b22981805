//! In-memory snapshot of the latest matches and odds.
//!
//! Single process-wide store, written by the two pollers and read by the API
//! and by WebSocket sessions. An RwLock keeps every operation atomic; there is
//! deliberately no transaction spanning a match replacement and the odds
//! upserts that follow it, so readers can observe a fresh match list paired
//! with odds from the previous tick. For a live display that window is fine.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{Match, OddsEntry};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub matches: Vec<Match>,
    pub odds: HashMap<String, OddsEntry>,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the match list wholesale and drop odds entries whose market no
    /// longer exists, so the odds map cannot accumulate orphans. Returns the
    /// number of evicted entries.
    pub fn replace_matches(&self, matches: Vec<Match>) -> usize {
        let mut guard = self.inner.write();
        guard.matches = matches;

        let Snapshot { matches, odds } = &mut *guard;
        let before = odds.len();
        let live: std::collections::HashSet<&str> =
            matches.iter().map(|m| m.market_id.as_str()).collect();
        odds.retain(|market_id, _| live.contains(market_id.as_str()));
        before - odds.len()
    }

    pub fn upsert_odds(&self, market_id: String, entry: OddsEntry) {
        self.inner.write().odds.insert(market_id, entry);
    }

    pub fn get_odds(&self, market_id: &str) -> Option<OddsEntry> {
        self.inner.read().odds.get(market_id).cloned()
    }

    #[cfg(test)]
    pub fn matches(&self) -> Vec<Match> {
        self.inner.read().matches.clone()
    }

    pub fn odds_map(&self) -> HashMap<String, OddsEntry> {
        self.inner.read().odds.clone()
    }

    /// Point-in-time (market_id, match_name) view for one odds tick, taken
    /// under a single read guard so the tick never mixes two match-list
    /// generations.
    pub fn match_refs(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .matches
            .iter()
            .map(|m| (m.market_id.clone(), m.match_name.clone()))
            .collect()
    }

    /// Full snapshot under one read guard, used to seed newly connected
    /// subscribers.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }
}
