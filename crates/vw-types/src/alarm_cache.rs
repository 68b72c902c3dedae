use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::SinkKind;

/// `chain -> message -> timestamp`, the shape shared by `all` and `flap`.
pub type ChainMessageMap = HashMap<String, HashMap<String, DateTime<Utc>>>;

/// Global deduplication/flap state for the Alert Coordinator. Sink maps are
/// keyed by `SinkKind::as_str()` rather than the enum itself so the whole
/// structure serializes with plain string keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmCache {
    /// `sink -> message -> first_sent_time`
    pub per_sink: HashMap<String, HashMap<String, DateTime<Utc>>>,
    /// `chain -> message -> time`, union of live alarms per chain.
    pub all: ChainMessageMap,
    /// `chain -> message -> last_time`. PagerDuty-only flap window; never
    /// persisted across restarts.
    #[serde(skip)]
    pub flap: ChainMessageMap,
}

pub const FLAP_WINDOW_SECONDS: i64 = 5 * 60;
pub const PRUNE_AGE_SECONDS: i64 = 24 * 60 * 60;

impl AlarmCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink_entry(&self, sink: SinkKind, message: &str) -> Option<DateTime<Utc>> {
        self.per_sink
            .get(sink.as_str())
            .and_then(|m| m.get(message))
            .copied()
    }

    pub fn record_sink_sent(&mut self, sink: SinkKind, message: &str, now: DateTime<Utc>) {
        self.per_sink
            .entry(sink.as_str().to_string())
            .or_default()
            .insert(message.to_string(), now);
    }

    pub fn clear_sink_entry(&mut self, sink: SinkKind, message: &str) {
        if let Some(m) = self.per_sink.get_mut(sink.as_str()) {
            m.remove(message);
        }
    }

    /// PagerDuty flap check: true if `message` triggered on this chain
    /// within the last 5 minutes.
    pub fn is_flapping(&self, chain: &str, message: &str, now: DateTime<Utc>) -> bool {
        self.flap
            .get(chain)
            .and_then(|m| m.get(message))
            .map(|&last| (now - last).num_seconds() < FLAP_WINDOW_SECONDS)
            .unwrap_or(false)
    }

    pub fn record_flap(&mut self, chain: &str, message: &str, now: DateTime<Utc>) {
        self.flap
            .entry(chain.to_string())
            .or_default()
            .insert(message.to_string(), now);
    }

    pub fn mark_active(&mut self, chain: &str, message: &str, now: DateTime<Utc>) {
        self.all
            .entry(chain.to_string())
            .or_default()
            .insert(message.to_string(), now);
    }

    pub fn clear_active(&mut self, chain: &str, message: &str) {
        if let Some(m) = self.all.get_mut(chain) {
            m.remove(message);
        }
    }

    pub fn active_count(&self, chain: &str) -> usize {
        self.all.get(chain).map(|m| m.len()).unwrap_or(0)
    }

    /// Drops every `per_sink` entry older than 24 hours. Called on load of
    /// persisted state.
    pub fn prune_stale(&mut self, now: DateTime<Utc>) {
        for sink_map in self.per_sink.values_mut() {
            sink_map.retain(|_, &mut sent| (now - sent).num_seconds() < PRUNE_AGE_SECONDS);
        }
    }

    /// Removes every per-sink and `all` entry for `chain`. Used when the RPC
    /// pool loses all endpoints, so the dashboard does not retain stale
    /// per-block warnings under a chain that has gone dark. Every message
    /// this rewrite emits names its chain inline (`"... on {chain_id}"`),
    /// so matching on substring rather than prefix is what actually clears
    /// them; `all[chain]` is keyed by chain directly and is wiped outright.
    pub fn clear_chain(&mut self, chain: &str) {
        self.all.remove(chain);
        for sink_map in self.per_sink.values_mut() {
            sink_map.retain(|message, _| !message.contains(chain));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_drops_only_stale_entries() {
        let mut cache = AlarmCache::new();
        let now = Utc::now();
        cache.record_sink_sent(SinkKind::PagerDuty, "fresh", now - chrono::Duration::hours(1));
        cache.record_sink_sent(SinkKind::PagerDuty, "stale", now - chrono::Duration::hours(30));
        cache.prune_stale(now);
        let remaining = &cache.per_sink[SinkKind::PagerDuty.as_str()];
        assert!(remaining.contains_key("fresh"));
        assert!(!remaining.contains_key("stale"));
    }

    #[test]
    fn flap_window_boundaries() {
        let mut cache = AlarmCache::new();
        let t0 = Utc::now();
        cache.record_flap("chain-1", "m", t0);
        assert!(cache.is_flapping("chain-1", "m", t0 + chrono::Duration::seconds(299)));
        assert!(!cache.is_flapping("chain-1", "m", t0 + chrono::Duration::seconds(301)));
    }

    #[test]
    fn clear_chain_drops_active_map_and_matching_per_sink_entries() {
        let mut cache = AlarmCache::new();
        let now = Utc::now();
        cache.mark_active("osmosis-1", "no RPC endpoints are working for osmosis-1", now);
        cache.mark_active("cosmoshub-4", "validator has missed 3 blocks on cosmoshub-4", now);
        cache.record_sink_sent(SinkKind::Discord, "no RPC endpoints are working for osmosis-1", now);
        cache.record_sink_sent(SinkKind::Discord, "validator has missed 3 blocks on cosmoshub-4", now);

        cache.clear_chain("osmosis-1");

        assert_eq!(cache.active_count("osmosis-1"), 0);
        assert_eq!(cache.active_count("cosmoshub-4"), 1);
        let discord = &cache.per_sink[SinkKind::Discord.as_str()];
        assert!(!discord.contains_key("no RPC endpoints are working for osmosis-1"));
        assert!(discord.contains_key("validator has missed 3 blocks on cosmoshub-4"));
    }
}
