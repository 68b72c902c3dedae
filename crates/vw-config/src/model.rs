use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vw_types::{AlertConfig, ChainSpec};

fn default_dashboard_listen() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_prometheus_listen() -> String {
    "127.0.0.1:9090".to_string()
}

/// Top-level configuration, loaded from a single TOML file
/// (`original_source/td2/types.go`'s `Config`, minus the deprecated
/// `pagerduty_alerts`/`discord_alerts`/`telegram_alerts` boolean aliases —
/// see DESIGN.md). The global `node_down_alert_minutes` default lives on
/// `defaults.node_down_alert_minutes` rather than as its own top-level
/// field, since `AlertConfig::apply_defaults` already copies it down to
/// every chain that doesn't set its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub enable_dashboard: bool,
    #[serde(default = "default_dashboard_listen")]
    pub dashboard_listen: String,
    #[serde(default)]
    pub hide_logs: bool,
    #[serde(default)]
    pub prometheus_enabled: bool,
    #[serde(default = "default_prometheus_listen")]
    pub prometheus_listen: String,
    /// Process-wide sink credentials/thresholds. Any blank field on a
    /// chain's own `alerts` falls back to this.
    #[serde(default)]
    pub defaults: AlertConfig,
    pub chains: HashMap<String, ChainSpec>,
}
