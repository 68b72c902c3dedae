use serde::{Deserialize, Serialize};

use crate::alert::{Severity, SinkKind};

/// One configured RPC endpoint for a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub url: String,
    #[serde(default = "default_true")]
    pub alert_if_down: bool,
}

fn default_true() -> bool {
    true
}

/// Alert thresholds and per-sink routing for one chain. Blank sink fields
/// fall back to the process-wide defaults in `Config` (`td2/types.go`
/// `validateConfig`'s default-copying behavior).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub alert_if_no_servers: bool,
    #[serde(default = "default_node_down_alert_minutes")]
    pub node_down_alert_minutes: i64,
    /// Severity attached to node-down alerts. Defaults to `critical`,
    /// matching `td.NodeDownSeverity`'s default.
    #[serde(default)]
    pub node_down_severity: Severity,
    #[serde(default)]
    pub alert_if_inactive: bool,
    #[serde(default)]
    pub stalled_enabled: bool,
    #[serde(default)]
    pub stalled_minutes: i64,
    #[serde(default)]
    pub consecutive_enabled: bool,
    #[serde(default)]
    pub consecutive_missed: i64,
    #[serde(default)]
    pub percentage_enabled: bool,
    #[serde(default)]
    pub percentage_missed: f64,

    #[serde(default)]
    pub pagerduty_enabled: bool,
    #[serde(default)]
    pub pagerduty_routing_key: Option<String>,
    #[serde(default)]
    pub discord_enabled: bool,
    #[serde(default)]
    pub discord_webhook: Option<String>,
    #[serde(default)]
    pub slack_enabled: bool,
    #[serde(default)]
    pub slack_webhook: Option<String>,
    #[serde(default)]
    pub telegram_enabled: bool,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_channel: Option<String>,
}

fn default_node_down_alert_minutes() -> i64 {
    10
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            alert_if_no_servers: false,
            node_down_alert_minutes: default_node_down_alert_minutes(),
            node_down_severity: Severity::Critical,
            alert_if_inactive: false,
            stalled_enabled: false,
            stalled_minutes: 0,
            consecutive_enabled: false,
            consecutive_missed: 0,
            percentage_enabled: false,
            percentage_missed: 0.0,
            pagerduty_enabled: false,
            pagerduty_routing_key: None,
            discord_enabled: false,
            discord_webhook: None,
            slack_enabled: false,
            slack_webhook: None,
            telegram_enabled: false,
            telegram_bot_token: None,
            telegram_channel: None,
        }
    }
}

impl AlertConfig {
    pub fn enabled_sinks(&self) -> Vec<SinkKind> {
        let mut sinks = Vec::new();
        if self.pagerduty_enabled {
            sinks.push(SinkKind::PagerDuty);
        }
        if self.discord_enabled {
            sinks.push(SinkKind::Discord);
        }
        if self.slack_enabled {
            sinks.push(SinkKind::Slack);
        }
        if self.telegram_enabled {
            sinks.push(SinkKind::Telegram);
        }
        sinks
    }

    /// Copies any blank sink field from `defaults`, matching the Go
    /// source's per-chain-falls-back-to-global behavior. Enabled flags are
    /// left alone; only credentials/targets are defaulted.
    pub fn apply_defaults(&mut self, defaults: &AlertConfig) {
        if self.pagerduty_routing_key.is_none() {
            self.pagerduty_routing_key = defaults.pagerduty_routing_key.clone();
        }
        if self.discord_webhook.is_none() {
            self.discord_webhook = defaults.discord_webhook.clone();
        }
        if self.slack_webhook.is_none() {
            self.slack_webhook = defaults.slack_webhook.clone();
        }
        if self.telegram_bot_token.is_none() {
            self.telegram_bot_token = defaults.telegram_bot_token.clone();
        }
        if self.telegram_channel.is_none() {
            self.telegram_channel = defaults.telegram_channel.clone();
        }
        if self.node_down_alert_minutes == 0 {
            self.node_down_alert_minutes = defaults.node_down_alert_minutes;
        }
    }
}

/// Static config for one monitored validator on one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSpec {
    pub chain_id: String,
    pub operator_address: String,
    #[serde(default)]
    pub consensus_address_override: Option<String>,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub public_fallback: bool,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub extra_info: String,
}
