//! Trait boundaries between the core monitoring logic and the external
//! collaborators named out of scope: the dashboard, the metrics exporter,
//! and the concrete notification sinks.

use async_trait::async_trait;

use crate::alert::{AlertCondition, SinkKind};
use crate::dashboard::{BlockMetricSample, ChainSnapshot};

/// Receives eventually-consistent per-chain snapshots and free-text log
/// lines for display. Implementations may coalesce bursts of calls.
pub trait DashboardSink: Send + Sync {
    fn publish_snapshot(&self, snapshot: ChainSnapshot);
    fn publish_log(&self, chain: &str, line: String);
}

/// Receives counter/gauge deltas derived from finalized blocks and node
/// health ticks. Implementations own the concrete metrics backend.
pub trait MetricsRecorder: Send + Sync {
    fn record_block(&self, chain: &str, sample: BlockMetricSample);
    fn record_node_down_seconds(&self, chain: &str, node: &str, seconds: f64);
    fn record_window(&self, chain: &str, missed: i64, window: i64);
}

/// One concrete notification channel (PagerDuty, Discord, Slack, Telegram).
/// The Alert Coordinator calls `send` outside any lock; adapters own their
/// own HTTP client and retry policy.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn kind(&self) -> SinkKind;
    async fn send(&self, condition: &AlertCondition) -> anyhow::Result<()>;
}

/// No-op implementation of both adapter traits, used when the dashboard or
/// the metrics exporter is disabled in config.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopSink;

impl DashboardSink for NopSink {
    fn publish_snapshot(&self, _snapshot: ChainSnapshot) {}
    fn publish_log(&self, _chain: &str, _line: String) {}
}

impl MetricsRecorder for NopSink {
    fn record_block(&self, _chain: &str, _sample: BlockMetricSample) {}
    fn record_node_down_seconds(&self, _chain: &str, _node: &str, _seconds: f64) {}
    fn record_window(&self, _chain: &str, _missed: i64, _window: i64) {}
}
