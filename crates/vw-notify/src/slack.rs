use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use vw_types::{AlertCondition, AlertSink, SinkKind};

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SlackMessage {
    text: String,
    attachments: Vec<SlackAttachment>,
}

#[derive(Serialize)]
struct SlackAttachment {
    title: String,
    color: &'static str,
}

/// Slack incoming-webhook adapter. Success is HTTP 200 per spec.md §6.
pub struct SlackSink {
    client: reqwest::Client,
}

impl SlackSink {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder().timeout(TIMEOUT).build().unwrap_or_default(),
        }
    }
}

impl Default for SlackSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for SlackSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Slack
    }

    async fn send(&self, condition: &AlertCondition) -> anyhow::Result<()> {
        let webhook = condition
            .per_sink_routing
            .slack_webhook
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no slack webhook configured for {}", condition.chain))?;

        let color = if condition.resolved { "good" } else { "danger" };
        let body = SlackMessage {
            text: condition.message.clone(),
            attachments: vec![SlackAttachment {
                title: format!("Validator Watch {}", condition.chain),
                color,
            }],
        };

        let resp = self.client.post(webhook).json(&body).send().await?;
        if resp.status().as_u16() != 200 {
            anyhow::bail!("slack returned http {}", resp.status());
        }
        Ok(())
    }
}
