use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use vw_types::{AlertCondition, AlertSink, SinkKind};

const TIMEOUT: Duration = Duration::from_secs(30);
const EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// PagerDuty Events API v2 adapter. `routing_key` is read from each
/// condition's `per_sink_routing`, not fixed at construction, so one
/// process can alert multiple PagerDuty services.
pub struct PagerDutySink {
    client: reqwest::Client,
    events_url: String,
}

impl PagerDutySink {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(TIMEOUT)
                .build()
                .unwrap_or_default(),
            events_url: EVENTS_URL.to_string(),
        }
    }

}

impl Default for PagerDutySink {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    summary: &'a str,
    source: &'a str,
    severity: &'a str,
}

fn severity_for(condition: &AlertCondition) -> &'static str {
    if condition.resolved {
        "info"
    } else {
        "error"
    }
}

#[async_trait]
impl AlertSink for PagerDutySink {
    fn kind(&self) -> SinkKind {
        SinkKind::PagerDuty
    }

    async fn send(&self, condition: &AlertCondition) -> anyhow::Result<()> {
        let routing_key = condition
            .per_sink_routing
            .pagerduty_routing_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no pagerduty routing key configured for {}", condition.chain))?;

        let action = if condition.resolved { "resolve" } else { "trigger" };
        let body = json!({
            "routing_key": routing_key,
            "event_action": action,
            "dedup_key": condition.unique_id,
            "payload": Payload {
                summary: &condition.message,
                source: &condition.unique_id,
                severity: severity_for(condition),
            },
        });

        let resp = self.client.post(&self.events_url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("pagerduty returned http {}", resp.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_info_severity() {
        let resolved = AlertCondition {
            chain: "c".into(),
            message: "m".into(),
            severity: vw_types::Severity::Critical,
            resolved: true,
            unique_id: "id".into(),
            enabled_sinks: vec![],
            per_sink_routing: Default::default(),
        };
        assert_eq!(severity_for(&resolved), "info");
        let triggered = AlertCondition { resolved: false, ..resolved };
        assert_eq!(severity_for(&triggered), "error");
    }
}
