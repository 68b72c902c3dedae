use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block_class::BlockClass;

pub const RECENT_BLOCKS_LEN: usize = 512;

/// Per-chain live state, owned exclusively by that chain's Chain Monitor
/// task. `None` entries in `recent_blocks` are the "unknown" sentinel (the
/// Go source's `-1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainState {
    recent_blocks: Vec<Option<BlockClass>>,
    pub last_block_time: Option<DateTime<Utc>>,
    pub last_block_height: i64,
    pub stall_alarm_active: bool,
    pub consecutive_missed: f64,
    pub total_signs: f64,
    pub total_props: f64,
    pub total_miss: f64,
    pub prevote_miss: f64,
    pub precommit_miss: f64,
    pub active_alerts: usize,
    pub last_error: String,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            recent_blocks: vec![None; RECENT_BLOCKS_LEN],
            last_block_time: None,
            last_block_height: 0,
            stall_alarm_active: false,
            consecutive_missed: 0.0,
            total_signs: 0.0,
            total_props: 0.0,
            total_miss: 0.0,
            prevote_miss: 0.0,
            precommit_miss: 0.0,
            active_alerts: 0,
            last_error: String::new(),
        }
    }
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `class` to the front of `recent_blocks`, dropping the tail.
    /// Never reallocates: the vector stays at `RECENT_BLOCKS_LEN`.
    pub fn push_block(&mut self, class: BlockClass) {
        self.recent_blocks.pop();
        self.recent_blocks.insert(0, Some(class));
        debug_assert_eq!(self.recent_blocks.len(), RECENT_BLOCKS_LEN);
    }

    pub fn recent_blocks(&self) -> &[Option<BlockClass>] {
        &self.recent_blocks
    }

    /// Folds in a finalized block's class per spec.md §4.E.L1's counter
    /// table, and updates stall/finalization bookkeeping.
    pub fn record_finalized(&mut self, class: BlockClass, height: i64, now: DateTime<Utc>) {
        match class {
            BlockClass::Signed => {
                self.total_signs += 1.0;
                self.consecutive_missed = 0.0;
            }
            BlockClass::Proposed => {
                self.total_props += 1.0;
                self.total_signs += 1.0;
                self.consecutive_missed = 0.0;
            }
            BlockClass::Missed => {
                self.total_miss += 1.0;
                self.consecutive_missed += 1.0;
            }
            BlockClass::PrecommitOnly => {
                self.precommit_miss += 1.0;
                self.total_miss += 1.0;
                self.consecutive_missed += 1.0;
            }
            BlockClass::PrevoteOnly => {
                self.prevote_miss += 1.0;
                self.total_miss += 1.0;
                self.consecutive_missed += 1.0;
            }
        }
        self.push_block(class);
        self.last_block_height = height;
        self.last_block_time = Some(now);
        self.stall_alarm_active = false;
    }

    /// Restores the ring buffer from persisted `-1`-encoded i8 values.
    pub fn restore_recent_blocks(&mut self, encoded: &[i8]) {
        let mut restored: Vec<Option<BlockClass>> = encoded
            .iter()
            .map(|&v| BlockClass::from_i8(v))
            .collect();
        restored.resize(RECENT_BLOCKS_LEN, None);
        restored.truncate(RECENT_BLOCKS_LEN);
        self.recent_blocks = restored;
    }

    pub fn encode_recent_blocks(&self) -> Vec<i8> {
        self.recent_blocks
            .iter()
            .map(|v| v.map(|c| c.to_i8()).unwrap_or(-1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_never_grows() {
        let mut s = ChainState::new();
        for h in 0..600 {
            s.record_finalized(BlockClass::Signed, h, Utc::now());
        }
        assert_eq!(s.recent_blocks().len(), RECENT_BLOCKS_LEN);
        assert_eq!(s.total_signs, 600.0);
    }

    #[test]
    fn consecutive_resets_on_signed_or_proposed() {
        let mut s = ChainState::new();
        s.record_finalized(BlockClass::Missed, 1, Utc::now());
        s.record_finalized(BlockClass::Missed, 2, Utc::now());
        assert_eq!(s.consecutive_missed, 2.0);
        s.record_finalized(BlockClass::Signed, 3, Utc::now());
        assert_eq!(s.consecutive_missed, 0.0);
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut s = ChainState::new();
        s.record_finalized(BlockClass::Proposed, 1, Utc::now());
        s.record_finalized(BlockClass::Missed, 2, Utc::now());
        let encoded = s.encode_recent_blocks();
        let mut s2 = ChainState::new();
        s2.restore_recent_blocks(&encoded);
        assert_eq!(s2.recent_blocks(), s.recent_blocks());
    }
}
