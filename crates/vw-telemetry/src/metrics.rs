//! Prometheus-backed implementation of `vw_types::MetricsRecorder`. Gauge
//! names and semantics follow the original tenderduty exporter
//! (`td2/prometheus.go`), reprefixed `vw_` for this rewrite.

use once_cell::sync::OnceCell;
use prometheus::{register_gauge_vec, GaugeVec};
use vw_types::{BlockClass, BlockMetricSample, MetricsRecorder};

static SIGNED: OnceCell<GaugeVec> = OnceCell::new();
static PROPOSED: OnceCell<GaugeVec> = OnceCell::new();
static MISSED: OnceCell<GaugeVec> = OnceCell::new();
static MISSED_PREVOTE: OnceCell<GaugeVec> = OnceCell::new();
static MISSED_PRECOMMIT: OnceCell<GaugeVec> = OnceCell::new();
static CONSECUTIVE_MISSED: OnceCell<GaugeVec> = OnceCell::new();
static WINDOW_SIZE: OnceCell<GaugeVec> = OnceCell::new();
static WINDOW_MISSED: OnceCell<GaugeVec> = OnceCell::new();
static TIME_SINCE_LAST_BLOCK: OnceCell<GaugeVec> = OnceCell::new();
static UNHEALTHY_NODES: OnceCell<GaugeVec> = OnceCell::new();
static NODE_DOWN_SECONDS: OnceCell<GaugeVec> = OnceCell::new();

/// Registers every gauge exactly once. Must be called before any
/// `PrometheusRecorder` is used; a second call is a no-op.
pub fn install() -> Result<(), prometheus::Error> {
    let chain_labels = &["chain_id"];
    let host_labels = &["chain_id", "endpoint"];

    let _ = SIGNED.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_signed_blocks",
            "count of blocks signed since the monitor started",
            chain_labels
        )
    })?;
    let _ = PROPOSED.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_proposed_blocks",
            "count of blocks proposed since the monitor started",
            chain_labels
        )
    })?;
    let _ = MISSED.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_missed_blocks",
            "count of blocks missed without seeing a precommit or prevote",
            chain_labels
        )
    })?;
    let _ = MISSED_PREVOTE.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_missed_blocks_prevote_present",
            "count of blocks missed where a prevote was seen",
            chain_labels
        )
    })?;
    let _ = MISSED_PRECOMMIT.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_missed_blocks_precommit_present",
            "count of blocks missed where a precommit was seen",
            chain_labels
        )
    })?;
    let _ = CONSECUTIVE_MISSED.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_consecutive_missed_blocks",
            "current count of consecutively missed blocks",
            chain_labels
        )
    })?;
    let _ = WINDOW_SIZE.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_missed_block_window",
            "the slashing window size",
            chain_labels
        )
    })?;
    let _ = WINDOW_MISSED.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_missed_blocks_for_window",
            "current count of missed blocks in the slashing window",
            chain_labels
        )
    })?;
    let _ = TIME_SINCE_LAST_BLOCK.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_time_since_last_block",
            "seconds since the previous block was finalized",
            chain_labels
        )
    })?;
    let _ = UNHEALTHY_NODES.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_total_unhealthy_endpoints",
            "count of unhealthy rpc endpoints being monitored",
            chain_labels
        )
    })?;
    let _ = NODE_DOWN_SECONDS.get_or_try_init(|| {
        register_gauge_vec!(
            "vw_endpoint_down_seconds",
            "seconds a node has been marked unhealthy",
            host_labels
        )
    })?;
    Ok(())
}

/// The `MetricsRecorder` handed to every `ChainMonitor`. Gauges must already
/// be registered via `install()`; a recorder constructed before `install()`
/// silently drops samples rather than panicking, so telemetry is never a
/// crash surface for the monitoring core.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusRecorder;

impl MetricsRecorder for PrometheusRecorder {
    fn record_block(&self, chain: &str, sample: BlockMetricSample) {
        let Some(signed) = SIGNED.get() else { return };
        let Some(proposed) = PROPOSED.get() else { return };
        let Some(missed) = MISSED.get() else { return };
        let Some(prevote) = MISSED_PREVOTE.get() else { return };
        let Some(precommit) = MISSED_PRECOMMIT.get() else { return };
        let Some(consecutive) = CONSECUTIVE_MISSED.get() else { return };
        let Some(time_since) = TIME_SINCE_LAST_BLOCK.get() else { return };
        let Some(unhealthy) = UNHEALTHY_NODES.get() else { return };

        match sample.class {
            BlockClass::Signed => signed.with_label_values(&[chain]).inc(),
            BlockClass::Proposed => {
                signed.with_label_values(&[chain]).inc();
                proposed.with_label_values(&[chain]).inc();
            }
            BlockClass::Missed => missed.with_label_values(&[chain]).inc(),
            BlockClass::PrevoteOnly => prevote.with_label_values(&[chain]).inc(),
            BlockClass::PrecommitOnly => precommit.with_label_values(&[chain]).inc(),
        }
        consecutive.with_label_values(&[chain]).set(sample.consecutive_missed);
        time_since.with_label_values(&[chain]).set(sample.seconds_since_last_block);
        unhealthy.with_label_values(&[chain]).set(sample.unhealthy_nodes as f64);
    }

    fn record_node_down_seconds(&self, chain: &str, node: &str, seconds: f64) {
        if let Some(gauge) = NODE_DOWN_SECONDS.get() {
            gauge.with_label_values(&[chain, node]).set(seconds);
        }
    }

    fn record_window(&self, chain: &str, missed: i64, window: i64) {
        if let Some(gauge) = WINDOW_MISSED.get() {
            gauge.with_label_values(&[chain]).set(missed as f64);
        }
        if let Some(gauge) = WINDOW_SIZE.get() {
            gauge.with_label_values(&[chain]).set(window as f64);
        }
    }
}
