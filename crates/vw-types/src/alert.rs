use serde::{Deserialize, Serialize};

/// Notification sinks a condition can be routed to. Used both as a map key
/// (via `as_str`) and for routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkKind {
    PagerDuty,
    Discord,
    Slack,
    Telegram,
}

impl SinkKind {
    pub const ALL: [SinkKind; 4] = [
        SinkKind::PagerDuty,
        SinkKind::Discord,
        SinkKind::Slack,
        SinkKind::Telegram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::PagerDuty => "pagerduty",
            SinkKind::Discord => "discord",
            SinkKind::Slack => "slack",
            SinkKind::Telegram => "telegram",
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A severity a human would assign to an alert, independent of sink wire
/// format (each sink adapter maps this to its own vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Critical
    }
}

/// One alert condition emitted by a Chain Monitor's L3 loop, consumed by the
/// Alert Coordinator. Carries everything the coordinator needs to dedup,
/// flap-suppress, and route without reaching back into monitor state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCondition {
    pub chain: String,
    pub message: String,
    pub severity: Severity,
    pub resolved: bool,
    /// Dedup key, e.g. `"<valcons>consecutive"` or a node URL for node-down.
    pub unique_id: String,
    pub enabled_sinks: Vec<SinkKind>,
    pub per_sink_routing: PerSinkRouting,
}

/// Effective, already-defaulted per-sink credentials/targets for one chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerSinkRouting {
    pub pagerduty_routing_key: Option<String>,
    pub discord_webhook: Option<String>,
    pub slack_webhook: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_channel: Option<String>,
}

/// Prefix the core applies to outbound messages; sink adapters must not
/// invent their own.
pub const ALERT_PREFIX: &str = "\u{1f6a8} ALERT: ";
pub const RESOLVED_PREFIX: &str = "\u{1f49c} Resolved: ";

pub fn format_message(message: &str, resolved: bool) -> String {
    let prefix = if resolved { RESOLVED_PREFIX } else { ALERT_PREFIX };
    format!("{prefix}{message}")
}
