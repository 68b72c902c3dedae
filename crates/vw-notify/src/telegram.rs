use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use vw_types::alert::{ALERT_PREFIX, RESOLVED_PREFIX};
use vw_types::{AlertCondition, AlertSink, SinkKind};

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
}

/// Telegram bot-API `sendMessage` adapter.
pub struct TelegramSink {
    client: reqwest::Client,
}

impl TelegramSink {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder().timeout(TIMEOUT).build().unwrap_or_default(),
        }
    }
}

impl Default for TelegramSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Telegram
    }

    async fn send(&self, condition: &AlertCondition) -> anyhow::Result<()> {
        let bot_token = condition
            .per_sink_routing
            .telegram_bot_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no telegram bot token configured for {}", condition.chain))?;
        let channel = condition
            .per_sink_routing
            .telegram_channel
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no telegram channel configured for {}", condition.chain))?;

        let prefix = if condition.resolved { RESOLVED_PREFIX } else { ALERT_PREFIX };
        let text = format!("{}: {prefix}{}", condition.chain, condition.message);
        let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");

        let resp = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id: channel, text })
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("telegram returned http {}", resp.status());
        }
        Ok(())
    }
}
