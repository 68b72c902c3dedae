use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use vw_types::alert::{ALERT_PREFIX, RESOLVED_PREFIX};
use vw_types::{AlertCondition, AlertSink, SinkKind};

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct DiscordMessage {
    username: &'static str,
    content: String,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Serialize)]
struct DiscordEmbed {
    description: String,
}

/// Discord incoming-webhook adapter. Success is HTTP 204 per spec.md §6.
pub struct DiscordSink {
    client: reqwest::Client,
}

impl DiscordSink {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder().timeout(TIMEOUT).build().unwrap_or_default(),
        }
    }
}

impl Default for DiscordSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for DiscordSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Discord
    }

    async fn send(&self, condition: &AlertCondition) -> anyhow::Result<()> {
        let webhook = condition
            .per_sink_routing
            .discord_webhook
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no discord webhook configured for {}", condition.chain))?;

        let prefix = if condition.resolved { RESOLVED_PREFIX } else { ALERT_PREFIX };
        let body = DiscordMessage {
            username: "Validator Watch",
            content: format!("{prefix}{}", condition.chain),
            embeds: vec![DiscordEmbed {
                description: condition.message.clone(),
            }],
        };

        let resp = self.client.post(webhook).json(&body).send().await?;
        if resp.status().as_u16() != 204 {
            anyhow::bail!("discord returned http {}", resp.status());
        }
        Ok(())
    }
}
