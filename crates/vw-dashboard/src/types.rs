use serde::Serialize;
use vw_types::ChainSnapshot;

/// Wire shape for one chain's status, broadcast to every websocket
/// subscriber. Field names and shape follow `td2/dashboard/types.go`'s
/// `ChainStatus`; the `blocks` sparkline array from the original is dropped
/// since `ChainSnapshot` (spec.md §3) does not carry recent-block history —
/// that lives only in `ChainState.recent_blocks`, which is process-internal.
#[derive(Debug, Clone, Serialize)]
pub struct ChainStatus {
    #[serde(rename = "msgType")]
    pub msg_type: &'static str,
    pub name: String,
    pub chain_id: String,
    pub moniker: String,
    pub bonded: bool,
    pub jailed: bool,
    pub tombstoned: bool,
    pub missed: i64,
    pub window: i64,
    pub nodes: usize,
    pub healthy_nodes: usize,
    pub active_alerts: usize,
    pub height: i64,
    pub last_error: String,
}

impl From<ChainSnapshot> for ChainStatus {
    fn from(s: ChainSnapshot) -> Self {
        ChainStatus {
            msg_type: "status",
            name: s.chain_id.clone(),
            chain_id: s.chain_id,
            moniker: s.moniker,
            bonded: s.bonded,
            jailed: s.jailed,
            tombstoned: s.tombstoned,
            missed: s.missed,
            window: s.window,
            nodes: s.total_nodes,
            healthy_nodes: s.healthy_nodes,
            active_alerts: s.active_alerts,
            height: s.last_block_height,
            last_error: s.last_error,
        }
    }
}

/// One log line broadcast to subscribers, mirroring `td2/dashboard/types.go`'s
/// `LogMessage`.
#[derive(Debug, Clone, Serialize)]
pub struct LogMessage {
    #[serde(rename = "msgType")]
    pub msg_type: &'static str,
    pub ts: i64,
    pub chain: String,
    pub msg: String,
}

impl LogMessage {
    pub fn new(chain: &str, msg: String) -> Self {
        LogMessage {
            msg_type: "log",
            ts: chrono::Utc::now().timestamp(),
            chain: chain.to_string(),
            msg,
        }
    }
}
