use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vw_rpc::{Listener, RpcPool};
use vw_types::{
    AlarmCache, AlertCondition, BlockClass, ChainSnapshot, ChainSpec, ChainState, DashboardSink,
    MetricsRecorder, PerSinkRouting, Severity, StatusUpdate, ValidatorInfo,
};

use crate::validator_fetcher::ValidatorFetcher;

const HEALTH_TICK_INTERVAL: StdDuration = StdDuration::from_secs(60);
const ALARM_TICK_INTERVAL: StdDuration = StdDuration::from_secs(2);
const NO_NODES_GRACE: chrono::Duration = chrono::Duration::seconds(30);
const RESTART_BACKOFF: StdDuration = StdDuration::from_secs(5);

struct Shared {
    state: RwLock<ChainState>,
    val_info: RwLock<ValidatorInfo>,
    pool: Mutex<RpcPool>,
    armed: Mutex<HashMap<String, bool>>,
    no_nodes_since: Mutex<Option<DateTime<Utc>>>,
    consensus_address: RwLock<String>,
}

/// Drives one monitored validator on one chain: the websocket loop (L1),
/// the health/validator-refresh loop (L2), and the alarm-evaluation loop
/// (L3), per spec.md §4.E.
pub struct ChainMonitor {
    spec: ChainSpec,
    shared: Arc<Shared>,
    fetcher: Arc<Mutex<ValidatorFetcher>>,
    alert_tx: mpsc::Sender<AlertCondition>,
    dashboard: Arc<dyn DashboardSink>,
    metrics: Arc<dyn MetricsRecorder>,
    registry: Option<Arc<vw_rpc::Registry>>,
    alarm_cache: Arc<RwLock<AlarmCache>>,
}

impl ChainMonitor {
    pub fn new(
        spec: ChainSpec,
        pool: RpcPool,
        fetcher: ValidatorFetcher,
        alert_tx: mpsc::Sender<AlertCondition>,
        dashboard: Arc<dyn DashboardSink>,
        metrics: Arc<dyn MetricsRecorder>,
        registry: Option<Arc<vw_rpc::Registry>>,
        alarm_cache: Arc<RwLock<AlarmCache>>,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: RwLock::new(ChainState::new()),
            val_info: RwLock::new(ValidatorInfo::default()),
            pool: Mutex::new(pool),
            armed: Mutex::new(HashMap::new()),
            no_nodes_since: Mutex::new(None),
            consensus_address: RwLock::new(String::new()),
        });
        Self {
            spec,
            shared,
            fetcher: Arc::new(Mutex::new(fetcher)),
            alert_tx,
            dashboard,
            metrics,
            registry,
            alarm_cache,
        }
    }

    /// Restores `recent_blocks` and node `down_since` timestamps from
    /// persisted state at startup.
    pub async fn restore(&self, recent_blocks: Option<&[i8]>, nodes_down: &HashMap<String, DateTime<Utc>>) {
        if let Some(encoded) = recent_blocks {
            self.shared.state.write().await.restore_recent_blocks(encoded);
        }
        self.shared.pool.lock().await.restore_down_since(nodes_down);
    }

    /// Runs L1/L2/L3 forever until `cancel` fires. Each loop independently
    /// restarts after `RESTART_BACKOFF` on a transient error.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let l1 = tokio::spawn(run_l1(self.clone(), cancel.clone()));
        let l2 = tokio::spawn(run_l2(self.clone(), cancel.clone()));
        let l3 = tokio::spawn(run_l3(self.clone(), cancel.clone()));
        let _ = tokio::join!(l1, l2, l3);
    }

    pub async fn snapshot(&self) -> ChainSnapshot {
        let state = self.shared.state.read().await;
        let val_info = self.shared.val_info.read().await;
        let pool = self.shared.pool.lock().await;
        let healthy = pool.nodes().iter().filter(|n| !n.down).count();
        ChainSnapshot {
            chain_id: self.spec.chain_id.clone(),
            moniker: val_info.moniker.clone(),
            bonded: val_info.bonded,
            jailed: val_info.jailed,
            tombstoned: val_info.tombstoned,
            missed: val_info.missed,
            window: val_info.window,
            last_block_height: state.last_block_height,
            last_block_time: state.last_block_time,
            consecutive_missed: state.consecutive_missed,
            active_alerts: state.active_alerts,
            last_error: state.last_error.clone(),
            healthy_nodes: healthy,
            total_nodes: pool.nodes().len(),
        }
    }

    /// Returns the bits of this chain's live state that get written to the
    /// state file on shutdown: the recent-blocks ring buffer and each node's
    /// `down_since`, matching `original_source/td2/run.go`'s `saveOnExit`.
    pub async fn persisted_snapshot(&self) -> (Vec<i8>, HashMap<String, DateTime<Utc>>) {
        let blocks = self.shared.state.read().await.encode_recent_blocks();
        let nodes_down = self
            .shared
            .pool
            .lock()
            .await
            .nodes()
            .iter()
            .filter(|n| n.down)
            .filter_map(|n| n.down_since.map(|since| (n.url.clone(), since)))
            .collect();
        (blocks, nodes_down)
    }

    fn per_sink_routing(&self) -> PerSinkRouting {
        let a = &self.spec.alerts;
        PerSinkRouting {
            pagerduty_routing_key: a.pagerduty_routing_key.clone(),
            discord_webhook: a.discord_webhook.clone(),
            slack_webhook: a.slack_webhook.clone(),
            telegram_bot_token: a.telegram_bot_token.clone(),
            telegram_channel: a.telegram_channel.clone(),
        }
    }

    async fn emit(&self, unique_id: &str, message: String, severity: Severity, resolved: bool) {
        let condition = AlertCondition {
            chain: self.spec.chain_id.clone(),
            message,
            severity,
            resolved,
            unique_id: unique_id.to_string(),
            enabled_sinks: self.spec.alerts.enabled_sinks(),
            per_sink_routing: self.per_sink_routing(),
        };
        if self.alert_tx.send(condition).await.is_err() {
            warn!(chain_id = %self.spec.chain_id, "alert dispatcher channel closed");
        }
    }

    /// Edge-triggers a condition: emits a trigger the instant `firing`
    /// becomes true, a resolve the instant it becomes false, and nothing
    /// otherwise. Guarantees spec.md §8 invariant 2 (a resolve always
    /// precedes the next trigger) by construction.
    async fn evaluate(&self, key: &str, firing: bool, message: impl FnOnce() -> String, severity: Severity) {
        let mut armed = self.shared.armed.lock().await;
        let was_armed = *armed.get(key).unwrap_or(&false);
        if firing && !was_armed {
            armed.insert(key.to_string(), true);
            drop(armed);
            self.emit(key, message(), severity, false).await;
        } else if !firing && was_armed {
            armed.insert(key.to_string(), false);
            drop(armed);
            self.emit(key, message(), severity, true).await;
        }
    }
}

async fn run_l1(monitor: Arc<ChainMonitor>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = l1_session(&monitor, &cancel).await {
            warn!(chain_id = %monitor.spec.chain_id, error = %e, "L1 session ended, restarting");
            monitor.shared.state.write().await.last_error = e.to_string();
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(RESTART_BACKOFF) => {}
        }
    }
}

async fn l1_session(monitor: &Arc<ChainMonitor>, cancel: &CancellationToken) -> anyhow::Result<()> {
    let url = {
        let mut pool = monitor.shared.pool.lock().await;
        pool.acquire().await?
    };
    info!(chain_id = %monitor.spec.chain_id, url = %url, "L1 session acquired endpoint");

    let first_call = monitor.shared.val_info.read().await.consensus_address_bech32.is_empty();
    let info = {
        let mut fetcher = monitor.fetcher.lock().await;
        fetcher.refresh(&url, first_call).await?
    };
    *monitor.shared.consensus_address.write().await = info.consensus_address_bech32.clone();
    *monitor.shared.val_info.write().await = info.clone();

    let listener = Listener::connect(&url, &info.consensus_address_bech32).await?;
    let (tx, mut rx) = mpsc::channel::<StatusUpdate>(256);
    let run_handle = tokio::spawn(listener.run(tx));

    let mut sign_state: Option<BlockClass> = None;
    let mut in_flight_height: Option<i64> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                run_handle.abort();
                return Ok(());
            }
            maybe_update = rx.recv() => {
                let Some(update) = maybe_update else {
                    break;
                };
                if in_flight_height != Some(update.height) {
                    sign_state = None;
                    in_flight_height = Some(update.height);
                }
                if !update.final_ {
                    sign_state = Some(match sign_state {
                        Some(existing) => existing.max(update.class),
                        None => update.class,
                    });
                    continue;
                }

                let bonded = monitor.shared.val_info.read().await.bonded;
                if !bonded {
                    sign_state = None;
                    in_flight_height = None;
                    continue;
                }
                let class = match sign_state {
                    Some(existing) => existing.max(update.class),
                    None => update.class,
                };
                let now = Utc::now();
                let previous_block_time = monitor.shared.state.read().await.last_block_time;
                {
                    let mut state = monitor.shared.state.write().await;
                    state.record_finalized(class, update.height, now);
                }
                sign_state = None;
                in_flight_height = None;

                let seconds_since_last_block = previous_block_time
                    .map(|t| (now - t).num_milliseconds() as f64 / 1000.0)
                    .unwrap_or(0.0);
                let consecutive_missed = monitor.shared.state.read().await.consecutive_missed;
                let unhealthy_nodes = {
                    let pool = monitor.shared.pool.lock().await;
                    pool.nodes().iter().filter(|n| n.down).count()
                };
                monitor.metrics.record_block(&monitor.spec.chain_id, vw_types::BlockMetricSample {
                    class,
                    consecutive_missed,
                    unhealthy_nodes,
                    seconds_since_last_block,
                });
                monitor.dashboard.publish_snapshot(monitor.snapshot().await);
            }
        }
    }

    run_handle.abort();
    anyhow::bail!("listener task ended")
}

async fn run_l2(monitor: Arc<ChainMonitor>, cancel: CancellationToken) {
    let mut last_registry_refresh = Utc::now();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(HEALTH_TICK_INTERVAL) => {}
        }
        if cancel.is_cancelled() {
            return;
        }

        let samples = {
            let mut pool = monitor.shared.pool.lock().await;
            pool.health_tick().await
        };
        for sample in &samples {
            monitor.metrics.record_node_down_seconds(&monitor.spec.chain_id, &sample.url, sample.down_seconds);
        }
        let recovered = monitor.shared.pool.lock().await.take_recovered();
        for url in recovered {
            let line = format!("RPC node {url} recovered");
            info!(chain_id = %monitor.spec.chain_id, url = %url, "node recovered");
            monitor.dashboard.publish_log(&monitor.spec.chain_id, line);
        }

        let current_url = monitor.shared.pool.lock().await.current_client().map(|s| s.to_string());
        if let Some(url) = current_url {
            // Snapshot the pre-refresh ValidatorInfo so a bonded/tombstoned
            // transition can be logged to the dashboard once, right here,
            // rather than carried in shared state for some other reader.
            let previous = monitor.shared.val_info.read().await.clone();

            let refreshed = {
                let mut fetcher = monitor.fetcher.lock().await;
                fetcher.refresh(&url, false).await
            };
            match refreshed {
                Ok(info) => {
                    monitor.metrics.record_window(&monitor.spec.chain_id, info.missed, info.window);
                    if info.became_inactive(&previous) {
                        let line = format!("{} became inactive on {}", info.moniker, monitor.spec.chain_id);
                        warn!(chain_id = %monitor.spec.chain_id, moniker = %info.moniker, "validator became inactive");
                        monitor.dashboard.publish_log(&monitor.spec.chain_id, line);
                    } else if info.became_active(&previous) {
                        let line = format!("{} became active again on {}", info.moniker, monitor.spec.chain_id);
                        info!(chain_id = %monitor.spec.chain_id, moniker = %info.moniker, "validator became active");
                        monitor.dashboard.publish_log(&monitor.spec.chain_id, line);
                    }
                    *monitor.shared.val_info.write().await = info;
                }
                Err(e) => {
                    error!(chain_id = %monitor.spec.chain_id, error = %e, "validator state refresh failed");
                    monitor.shared.state.write().await.last_error = e.to_string();
                }
            }
        }

        if let Some(registry) = &monitor.registry {
            let refresh_interval = chrono::Duration::from_std(vw_rpc::registry::REFRESH_INTERVAL)
                .unwrap_or(chrono::Duration::hours(12));
            if Utc::now() - last_registry_refresh > refresh_interval {
                if let Err(e) = registry.refresh().await {
                    warn!(chain_id = %monitor.spec.chain_id, error = %e, "registry refresh failed");
                }
                last_registry_refresh = Utc::now();
            }
        }
    }
}

async fn run_l3(monitor: Arc<ChainMonitor>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(ALARM_TICK_INTERVAL) => {}
        }
        if cancel.is_cancelled() {
            return;
        }
        evaluate_no_nodes(&monitor).await;
        evaluate_stalled(&monitor).await;
        evaluate_inactive(&monitor).await;
        evaluate_consecutive(&monitor).await;
        evaluate_percentage(&monitor).await;
        evaluate_nodes_down(&monitor).await;

        let active = {
            let armed = monitor.shared.armed.lock().await;
            armed.values().filter(|&&v| v).count()
        };
        monitor.shared.state.write().await.active_alerts = active;
    }
}

async fn evaluate_no_nodes(monitor: &Arc<ChainMonitor>) {
    let no_nodes = monitor.shared.pool.lock().await.no_nodes;
    let now = Utc::now();
    let mut since_guard = monitor.shared.no_nodes_since.lock().await;
    let just_lost_all_nodes = no_nodes && since_guard.is_none();
    if no_nodes {
        if since_guard.is_none() {
            *since_guard = Some(now);
        }
    } else {
        *since_guard = None;
    }
    let since = *since_guard;
    drop(since_guard);

    if just_lost_all_nodes {
        // spec.md §4.B: clear this chain's live alarms the moment every
        // configured endpoint fails, so the dashboard does not keep
        // displaying stale per-block warnings for a chain that has gone
        // dark (spec.md §8 scenario 4).
        monitor.alarm_cache.write().await.clear_chain(&monitor.spec.chain_id);
    }

    let firing = monitor.spec.alerts.alert_if_no_servers
        && no_nodes
        && since.map(|s| now - s > NO_NODES_GRACE).unwrap_or(false)
        && since
            .map(|s| now - s > chrono::Duration::minutes(monitor.spec.alerts.node_down_alert_minutes))
            .unwrap_or(false);

    let chain_id = monitor.spec.chain_id.clone();
    monitor
        .evaluate(
            "no_nodes",
            firing,
            || format!("no RPC endpoints are working for {chain_id}"),
            Severity::Critical,
        )
        .await;
}

async fn evaluate_stalled(monitor: &Arc<ChainMonitor>) {
    let alerts = &monitor.spec.alerts;
    if !alerts.stalled_enabled {
        return;
    }
    let last_block_time = monitor.shared.state.read().await.last_block_time;
    let firing = match last_block_time {
        Some(t) => Utc::now() - t > chrono::Duration::minutes(alerts.stalled_minutes),
        None => false,
    };
    if firing {
        monitor.shared.state.write().await.stall_alarm_active = true;
    }
    let chain_id = monitor.spec.chain_id.clone();
    let minutes = alerts.stalled_minutes;
    monitor
        .evaluate(
            "stalled",
            firing,
            || format!("stalled: have not seen a new block on {chain_id} in {minutes} minutes"),
            Severity::Critical,
        )
        .await;
}

/// Permanent label applied the first time a validator is observed
/// tombstoned. Per spec.md §9's open-question resolution this label is
/// never cleared once set, even across a later resolve of the inactive
/// alarm itself.
const TOMBSTONE_LABEL: &str = "\u{2620}\u{fe0f} tombstoned \u{1faa6}";

async fn evaluate_inactive(monitor: &Arc<ChainMonitor>) {
    if !monitor.spec.alerts.alert_if_inactive {
        return;
    }
    let current = monitor.shared.val_info.read().await.clone();
    // Level-based, not edge-based: L2 only snapshots a before/after pair
    // once per minute, so gating this alarm on that transition would make
    // it resolve itself on the very next L2 tick even though the validator
    // is still inactive. Firing on "currently not bonded" keeps the
    // armed/resolve transition in `evaluate` correct across the full
    // outage; L2 uses the transition pair itself only to log a one-time
    // became-inactive/became-active line to the dashboard.
    let firing = !current.bonded;
    let consensus_address = monitor.shared.consensus_address.read().await.clone();
    let moniker = current.moniker.clone();
    let tombstoned = current.tombstoned;
    monitor
        .evaluate(
            &format!("{consensus_address}jailed"),
            firing,
            move || {
                if tombstoned {
                    format!("{moniker} is inactive {TOMBSTONE_LABEL}")
                } else {
                    format!("{moniker} is inactive")
                }
            },
            Severity::Critical,
        )
        .await;
}

async fn evaluate_consecutive(monitor: &Arc<ChainMonitor>) {
    let alerts = &monitor.spec.alerts;
    if !alerts.consecutive_enabled {
        return;
    }
    let consecutive = monitor.shared.state.read().await.consecutive_missed;
    let firing = consecutive >= alerts.consecutive_missed as f64;
    let consensus_address = monitor.shared.consensus_address.read().await.clone();
    let moniker = monitor.shared.val_info.read().await.moniker.clone();
    let chain_id = monitor.spec.chain_id.clone();
    // Message text must be identical at the trigger and resolve edge (the
    // coordinator dedups on `condition.message`), so this reads the
    // configured threshold rather than the live `consecutive` count, which
    // is back to 0 by the time the resolve fires.
    let threshold = alerts.consecutive_missed;
    monitor
        .evaluate(
            &format!("{consensus_address}consecutive"),
            firing,
            move || format!("{moniker} has missed {threshold} blocks on {chain_id}"),
            Severity::Critical,
        )
        .await;
}

async fn evaluate_percentage(monitor: &Arc<ChainMonitor>) {
    let alerts = &monitor.spec.alerts;
    if !alerts.percentage_enabled {
        return;
    }
    let info = monitor.shared.val_info.read().await.clone();
    let firing = info.percent_missed() > alerts.percentage_missed;
    let consensus_address = monitor.shared.consensus_address.read().await.clone();
    let chain_id = monitor.spec.chain_id.clone();
    let moniker = info.moniker.clone();
    let pct = alerts.percentage_missed;
    monitor
        .evaluate(
            &format!("{consensus_address}percent"),
            firing,
            move || format!("{moniker} has missed > {pct}% of the slashing window's blocks on {chain_id}"),
            Severity::Critical,
        )
        .await;
}

async fn evaluate_nodes_down(monitor: &Arc<ChainMonitor>) {
    let now = Utc::now();
    let nodes = monitor.shared.pool.lock().await.nodes().to_vec();
    let chain_id = monitor.spec.chain_id.clone();
    for node in nodes {
        if !node.alert_if_down {
            continue;
        }
        let firing = node.down
            && node
                .down_since
                .map(|since| now - since > chrono::Duration::minutes(monitor.spec.alerts.node_down_alert_minutes))
                .unwrap_or(false);
        let url = node.url.clone();
        let chain_id = chain_id.clone();
        let minutes = monitor.spec.alerts.node_down_alert_minutes;
        let severity = monitor.spec.alerts.node_down_severity;
        monitor
            .evaluate(
                &node.url,
                firing,
                move || format!("RPC node {url} has been down for > {minutes} minutes on {chain_id}"),
                severity,
            )
            .await;
    }
}
