use std::time::Duration;

use tracing::debug;

use crate::wire::StatusResponse;

/// Result of a single stateless endpoint probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok,
    WrongChain { actual: String },
    Syncing,
    Unreachable,
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub outcome: ProbeOutcome,
    pub last_message: String,
}

/// Rewrites a Tendermint RPC URL's `tcp://` scheme (used for the websocket
/// client) to `http://` for the plain-HTTP status fallback, leaving
/// `http(s)://` URLs untouched.
pub fn to_http_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("tcp://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

/// Pure-ish check: "is this URL a synced node on `expected_chain_id`?".
/// Opens a transient client and queries `/status`.
pub async fn probe(url: &str, expected_chain_id: &str, timeout: Duration) -> ProbeResult {
    let http_url = to_http_scheme(url);
    let status_url = format!("{}/status", http_url.trim_end_matches('/'));

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            return ProbeResult {
                outcome: ProbeOutcome::Unreachable,
                last_message: format!("could not build http client: {e}"),
            }
        }
    };

    let resp = match client.get(&status_url).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!(url = %status_url, error = %e, "probe: transport error");
            return ProbeResult {
                outcome: ProbeOutcome::Unreachable,
                last_message: format!("unreachable: {e}"),
            };
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        return ProbeResult {
            outcome: ProbeOutcome::Unreachable,
            last_message: format!("http {status} from {status_url}"),
        };
    }

    let body: StatusResponse = match resp.json().await {
        Ok(b) => b,
        Err(e) => {
            return ProbeResult {
                outcome: ProbeOutcome::Unreachable,
                last_message: format!("could not decode /status response: {e}"),
            }
        }
    };

    if body.node_info.network != expected_chain_id {
        return ProbeResult {
            outcome: ProbeOutcome::WrongChain {
                actual: body.node_info.network.clone(),
            },
            last_message: format!(
                "node reports chain id {}, expected {}",
                body.node_info.network, expected_chain_id
            ),
        };
    }

    if body.sync_info.catching_up {
        return ProbeResult {
            outcome: ProbeOutcome::Syncing,
            last_message: "node is catching up".to_string(),
        };
    }

    ProbeResult {
        outcome: ProbeOutcome::Ok,
        last_message: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_tcp_scheme_only() {
        assert_eq!(to_http_scheme("tcp://node:26657"), "http://node:26657");
        assert_eq!(to_http_scheme("https://node:443"), "https://node:443");
    }
}
