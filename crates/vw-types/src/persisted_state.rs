use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm_cache::{AlarmCache, ChainMessageMap};

/// Everything written to the state file on clean shutdown and read back on
/// start. Excludes the AlarmCache's transient `flap` map by construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub per_sink: HashMap<String, HashMap<String, DateTime<Utc>>>,
    pub all: ChainMessageMap,
    /// `chain -> recent_blocks`, `-1` encodes "unknown".
    pub blocks: HashMap<String, Vec<i8>>,
    /// `chain -> url -> down_since`.
    pub nodes_down: HashMap<String, HashMap<String, DateTime<Utc>>>,
}

impl PersistedState {
    pub fn from_cache(cache: &AlarmCache, blocks: HashMap<String, Vec<i8>>, nodes_down: HashMap<String, HashMap<String, DateTime<Utc>>>) -> Self {
        Self {
            per_sink: cache.per_sink.clone(),
            all: cache.all.clone(),
            blocks,
            nodes_down,
        }
    }

    /// Rebuilds an `AlarmCache` from persisted maps, pruning alarms whose
    /// `first_sent_time` is older than 24 hours (spec invariant 4).
    pub fn into_alarm_cache(self, now: DateTime<Utc>) -> AlarmCache {
        let mut cache = AlarmCache {
            per_sink: self.per_sink,
            all: self.all,
            flap: HashMap::new(),
        };
        cache.prune_stale(now);
        cache
    }

    /// Writes the state file atomically: serialize to a sibling temp file,
    /// then rename over the destination. Best effort, matching the Go
    /// source's `saveOnExit` — errors are returned for the caller to log,
    /// not retried.
    pub fn save_atomic(&self, path: &Path) -> std::io::Result<()> {
        let tmp_path = path.with_extension("tmp");
        let body = serde_json::to_vec_pretty(self)?;
        {
            let mut f = std::fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&tmp_path)?;
            f.write_all(&body)?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)
    }

    /// Loads a previously saved state file. A missing file is not an error:
    /// callers should treat it as a cold start with `PersistedState::default()`.
    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("vw-alert-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");

        let mut cache = AlarmCache::new();
        cache.record_sink_sent(crate::alert::SinkKind::Discord, "m", Utc::now());
        let mut blocks = HashMap::new();
        blocks.insert("chain-1".to_string(), vec![-1, 3, 4]);
        let state = PersistedState::from_cache(&cache, blocks, HashMap::new());
        state.save_atomic(&path).unwrap();

        let loaded = PersistedState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.blocks["chain-1"], vec![-1, 3, 4]);
        let restored = loaded.into_alarm_cache(Utc::now());
        assert!(restored.sink_entry(crate::alert::SinkKind::Discord, "m").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_returns_none() {
        let path = Path::new("/nonexistent/vw-alert-state.json");
        assert!(PersistedState::load(path).unwrap().is_none());
    }
}
