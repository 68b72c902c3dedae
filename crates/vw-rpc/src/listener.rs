use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use vw_types::error::ListenerError;
use vw_types::{BlockClass, StatusUpdate};

use crate::wire::{
    RawBlockValue, RawVoteValue, WsData, WsReply, NEW_BLOCK_EVENT, VOTE_EVENT, VOTE_TYPE_PRECOMMIT,
    VOTE_TYPE_PREVOTE,
};

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Subscribes to `tm.event='NewBlock'` and `tm.event='Vote'` on one RPC
/// endpoint and classifies every event from the monitored validator's
/// perspective into a `StatusUpdate` stream.
pub struct Listener {
    stream: WsStream,
    consensus_address: String,
}

fn ws_url(http_url: &str) -> String {
    let base = http_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1)
        .replacen("tcp://", "ws://", 1);
    format!("{}/websocket", base.trim_end_matches('/'))
}

impl Listener {
    pub async fn connect(url: &str, consensus_address: &str) -> Result<Self, ListenerError> {
        let target = ws_url(url);
        let (mut stream, _resp) = connect_async(&target)
            .await
            .map_err(|e| ListenerError::Subscribe(format!("connecting to {target}: {e}")))?;

        subscribe(&mut stream, 1, "tm.event='NewBlock'").await?;
        subscribe(&mut stream, 2, "tm.event='Vote'").await?;

        Ok(Self {
            stream,
            consensus_address: consensus_address.to_ascii_uppercase(),
        })
    }

    /// Runs until the 60-second idle timeout elapses or a read error
    /// occurs, forwarding classified updates to `tx`.
    pub async fn run(mut self, tx: mpsc::Sender<StatusUpdate>) -> Result<(), ListenerError> {
        loop {
            let next = tokio::time::timeout(IDLE_TIMEOUT, self.stream.next()).await;
            let msg = match next {
                Ok(Some(Ok(msg))) => msg,
                Ok(Some(Err(e))) => return Err(ListenerError::Read(e.to_string())),
                Ok(None) => return Err(ListenerError::Read("websocket closed".to_string())),
                Err(_) => return Err(ListenerError::Idle(IDLE_TIMEOUT.as_secs())),
            };

            let Message::Text(text) = msg else { continue };
            let Ok(reply) = serde_json::from_str::<WsReply>(&text) else {
                debug!("listener: unparseable message, skipping");
                continue;
            };
            let Some(data) = reply.result.data else { continue };

            if let Some(update) = self.classify(&data) {
                if tx.send(update).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    fn classify(&self, data: &WsData) -> Option<StatusUpdate> {
        match data.kind.as_str() {
            NEW_BLOCK_EVENT => {
                let value: RawBlockValue = serde_json::from_value(data.value.clone()).ok()?;
                let header = value.block.header;
                let class = if header.proposer_address.eq_ignore_ascii_case(&self.consensus_address) {
                    BlockClass::Proposed
                } else if value
                    .block
                    .last_commit
                    .signatures
                    .iter()
                    .any(|sig| sig.validator_address.eq_ignore_ascii_case(&self.consensus_address))
                {
                    BlockClass::Signed
                } else {
                    BlockClass::Missed
                };
                Some(StatusUpdate::block(header.height, class))
            }
            VOTE_EVENT => {
                let value: RawVoteValue = serde_json::from_value(data.value.clone()).ok()?;
                let vote = value.vote;
                if !vote.validator_address.eq_ignore_ascii_case(&self.consensus_address) {
                    return None;
                }
                let class = match vote.kind.as_str() {
                    VOTE_TYPE_PREVOTE => BlockClass::PrevoteOnly,
                    VOTE_TYPE_PRECOMMIT => BlockClass::PrecommitOnly,
                    _ => return None,
                };
                Some(StatusUpdate::vote(vote.height, class))
            }
            other => {
                warn!(kind = other, "listener: unrecognized event type");
                None
            }
        }
    }
}

async fn subscribe(stream: &mut WsStream, id: u64, query: &str) -> Result<(), ListenerError> {
    let req = json!({
        "jsonrpc": "2.0",
        "method": "subscribe",
        "id": id,
        "params": { "query": query },
    });
    stream
        .send(Message::Text(req.to_string()))
        .await
        .map_err(|e| ListenerError::Subscribe(format!("sending subscribe for {query}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_scheme_to_ws() {
        assert_eq!(ws_url("http://node:26657"), "ws://node:26657/websocket");
        assert_eq!(ws_url("tcp://node:26657"), "ws://node:26657/websocket");
        assert_eq!(ws_url("https://node"), "wss://node/websocket");
    }
}
