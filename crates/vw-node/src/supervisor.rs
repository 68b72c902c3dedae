use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vw_alert::AlertCoordinator;
use vw_monitor::ChainMonitor;
use vw_monitor::ValidatorFetcher;
use vw_notify::{DiscordSink, PagerDutySink, SlackSink, TelegramSink};
use vw_rpc::registry::DEFAULT_REGISTRY_INDEX_URL;
use vw_rpc::{Registry, RpcPool};
use vw_types::{AlertSink, DashboardSink, MetricsRecorder, NodeState, NopSink, PersistedState, SinkKind};

use crate::cli::RunArgs;

const RESTART_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Loads config, wires every collaborator, and runs every chain's monitor
/// task under supervision until a shutdown signal arrives. Grounded on
/// `original_source/td2/run.go`'s `Run`/`saveOnExit`.
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let (config, problems) = vw_config::load(&args.config)?;
    for p in &problems {
        warn!("{p}");
    }
    info!(chains = config.chains.len(), "config valid, starting validator-watch");

    let cancel = CancellationToken::new();

    let persisted = PersistedState::load(&args.state_file)
        .context("reading state file")?
        .unwrap_or_default();
    let alarm_cache = Arc::new(RwLock::new(persisted.clone().into_alarm_cache(Utc::now())));

    let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
    sinks.insert(SinkKind::PagerDuty, Arc::new(PagerDutySink::new()));
    sinks.insert(SinkKind::Discord, Arc::new(DiscordSink::new()));
    sinks.insert(SinkKind::Slack, Arc::new(SlackSink::new()));
    sinks.insert(SinkKind::Telegram, Arc::new(TelegramSink::new()));
    let coordinator = Arc::new(AlertCoordinator::new(alarm_cache.clone(), sinks));
    let alert_tx = coordinator.spawn();

    let dashboard: Arc<dyn DashboardSink> = if config.enable_dashboard {
        let addr: SocketAddr = config
            .dashboard_listen
            .parse()
            .context("parsing dashboard_listen")?;
        let (sink, _handle) = vw_dashboard::spawn(addr, config.hide_logs, cancel.clone());
        Arc::new(sink)
    } else {
        Arc::new(NopSink)
    };

    let metrics: Arc<dyn MetricsRecorder> = if config.prometheus_enabled {
        vw_telemetry::install().context("registering prometheus metrics")?;
        let addr: SocketAddr = config
            .prometheus_listen
            .parse()
            .context("parsing prometheus_listen")?;
        let _handle = tokio::spawn(vw_telemetry::run_server(addr, cancel.clone()));
        Arc::new(vw_telemetry::PrometheusRecorder)
    } else {
        Arc::new(NopSink)
    };

    let mut monitors = Vec::with_capacity(config.chains.len());
    for (name, spec) in config.chains.clone() {
        let registry = if spec.public_fallback {
            let registry = Arc::new(Registry::new(DEFAULT_REGISTRY_INDEX_URL));
            if let Err(e) = registry.refresh().await {
                warn!(chain = %name, error = %e, "initial registry refresh failed");
            }
            Some(registry)
        } else {
            None
        };

        let nodes: Vec<NodeState> = spec
            .nodes
            .iter()
            .map(|n| NodeState::new(n.url.clone(), n.alert_if_down))
            .collect();
        let pool = RpcPool::new(
            spec.chain_id.clone(),
            nodes,
            spec.public_fallback,
            registry.clone().map(|r| r as Arc<dyn vw_rpc::PublicEndpointResolver>),
        );

        let fetcher = ValidatorFetcher::new(
            spec.operator_address.clone(),
            spec.consensus_address_override.clone(),
            Vec::new(),
        );

        let monitor = Arc::new(ChainMonitor::new(
            spec.clone(),
            pool,
            fetcher,
            alert_tx.clone(),
            dashboard.clone(),
            metrics.clone(),
            registry,
            alarm_cache.clone(),
        ));

        let recent_blocks = persisted.blocks.get(&spec.chain_id).map(|v| v.as_slice());
        let nodes_down = persisted
            .nodes_down
            .get(&spec.chain_id)
            .cloned()
            .unwrap_or_default();
        monitor.restore(recent_blocks, &nodes_down).await;

        monitors.push((name, monitor));
    }

    for (name, monitor) in &monitors {
        let monitor = monitor.clone();
        let cancel = cancel.clone();
        let name = name.clone();
        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    return;
                }
                monitor.clone().run(cancel.clone()).await;
                if cancel.is_cancelled() {
                    return;
                }
                error!(chain = %name, "chain monitor task ended unexpectedly, restarting");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(RESTART_BACKOFF) => {}
                }
            }
        });
    }

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, saving state");
    cancel.cancel();

    save_state(&args.state_file, &alarm_cache, &monitors).await;
    info!("validator-watch exiting");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
        _ = sighup.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn save_state(
    state_file: &std::path::Path,
    alarm_cache: &Arc<RwLock<vw_types::AlarmCache>>,
    monitors: &[(String, Arc<ChainMonitor>)],
) {
    let mut blocks = HashMap::new();
    let mut nodes_down = HashMap::new();
    for (name, monitor) in monitors {
        let (encoded, down) = monitor.persisted_snapshot().await;
        blocks.insert(name.clone(), encoded);
        nodes_down.insert(name.clone(), down);
    }

    let cache = alarm_cache.read().await;
    let persisted = PersistedState::from_cache(&cache, blocks, nodes_down);
    if let Err(e) = persisted.save_atomic(state_file) {
        error!(error = %e, "failed to save state file");
    }
}
