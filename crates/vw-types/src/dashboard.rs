use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block_class::BlockClass;

/// Eventually-consistent, coalescible snapshot of one chain's state, handed
/// to a `DashboardSink` after every finalized block and on health ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain_id: String,
    pub moniker: String,
    pub bonded: bool,
    pub jailed: bool,
    pub tombstoned: bool,
    pub missed: i64,
    pub window: i64,
    pub last_block_height: i64,
    pub last_block_time: Option<DateTime<Utc>>,
    pub consecutive_missed: f64,
    pub active_alerts: usize,
    pub last_error: String,
    pub healthy_nodes: usize,
    pub total_nodes: usize,
}

/// One finalized-block sample handed to a `MetricsRecorder`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockMetricSample {
    pub class: BlockClass,
    pub consecutive_missed: f64,
    pub unhealthy_nodes: usize,
    pub seconds_since_last_block: f64,
}
