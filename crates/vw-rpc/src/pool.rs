use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use vw_types::error::PoolError;
use vw_types::NodeState;

use crate::probe::{probe, ProbeOutcome};
use crate::registry::PublicEndpointResolver;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// One node's down-duration sample, handed to a `MetricsRecorder` by the
/// caller (this crate has no telemetry dependency).
#[derive(Debug, Clone)]
pub struct NodeDownSample {
    pub url: String,
    pub down_seconds: f64,
}

/// Per-chain ordered pool of configured endpoints plus the currently
/// acquired client URL, if any.
pub struct RpcPool {
    chain_id: String,
    nodes: Vec<NodeState>,
    public_fallback: bool,
    resolver: Option<Arc<dyn PublicEndpointResolver>>,
    current: Option<String>,
    pub no_nodes: bool,
}

impl RpcPool {
    pub fn new(
        chain_id: String,
        nodes: Vec<NodeState>,
        public_fallback: bool,
        resolver: Option<Arc<dyn PublicEndpointResolver>>,
    ) -> Self {
        Self {
            chain_id,
            nodes,
            public_fallback,
            resolver,
            current: None,
            no_nodes: false,
        }
    }

    pub fn current_client(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    /// Drains the one-shot "just recovered" edge off every node that has it
    /// set, returning their URLs. `was_down` only means anything for the
    /// single tick after a node comes back up, so this clears it as it
    /// reports it, rather than leaving it permanently true.
    pub fn take_recovered(&mut self) -> Vec<String> {
        let mut recovered = Vec::new();
        for node in &mut self.nodes {
            if node.just_recovered() {
                node.was_down = false;
                recovered.push(node.url.clone());
            }
        }
        recovered
    }

    /// Restores each node's `down`/`down_since` from persisted state at
    /// startup, so the node-down alarm's elapsed-time gate survives a
    /// restart instead of restarting its grace window from zero.
    pub fn restore_down_since(&mut self, nodes_down: &std::collections::HashMap<String, chrono::DateTime<Utc>>) {
        for node in &mut self.nodes {
            if let Some(&since) = nodes_down.get(&node.url) {
                node.down = true;
                node.down_since = Some(since);
            }
        }
    }

    /// Selects a usable endpoint: nodes currently marked up first, falling
    /// back to trying every node if none are up, then the public registry
    /// if configured and permitted. Sets `no_nodes` on total failure.
    pub async fn acquire(&mut self) -> Result<String, PoolError> {
        let any_up = self.nodes.iter().any(|n| !n.down);
        let candidates: Vec<usize> = if any_up {
            self.nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| !n.down)
                .map(|(i, _)| i)
                .collect()
        } else {
            (0..self.nodes.len()).collect()
        };

        for idx in candidates {
            let url = self.nodes[idx].url.clone();
            let result = probe(&url, &self.chain_id, ACQUIRE_TIMEOUT).await;
            match result.outcome {
                ProbeOutcome::Ok => {
                    self.nodes[idx].mark_up();
                    self.current = Some(url.clone());
                    self.no_nodes = false;
                    return Ok(url);
                }
                ProbeOutcome::WrongChain { .. } | ProbeOutcome::Syncing | ProbeOutcome::Unreachable => {
                    let syncing = matches!(result.outcome, ProbeOutcome::Syncing);
                    self.nodes[idx].mark_down(Utc::now(), result.last_message, syncing);
                }
            }
        }

        if self.public_fallback {
            if let Some(resolver) = self.resolver.clone() {
                if let Ok(url) = resolver.resolve(&self.chain_id).await {
                    let result = probe(&url, &self.chain_id, ACQUIRE_TIMEOUT).await;
                    if matches!(result.outcome, ProbeOutcome::Ok) {
                        info!(chain_id = %self.chain_id, url = %url, "acquired public fallback endpoint");
                        self.current = Some(url.clone());
                        self.no_nodes = false;
                        return Ok(url);
                    }
                }
            }
        }

        warn!(chain_id = %self.chain_id, "no usable RPC endpoints available");
        self.no_nodes = true;
        self.current = None;
        Err(PoolError::NoUsableEndpoints {
            chain_id: self.chain_id.clone(),
        })
    }

    /// Runs one probe per node in parallel, transitioning `NodeState` and
    /// returning down-duration samples for the metrics recorder.
    pub async fn health_tick(&mut self) -> Vec<NodeDownSample> {
        let chain_id = self.chain_id.clone();
        let urls: Vec<String> = self.nodes.iter().map(|n| n.url.clone()).collect();
        let probes = futures::future::join_all(
            urls.iter()
                .map(|url| probe(url, &chain_id, HEALTH_TIMEOUT)),
        )
        .await;

        let now = Utc::now();
        let mut samples = Vec::with_capacity(self.nodes.len());
        for (node, result) in self.nodes.iter_mut().zip(probes) {
            match result.outcome {
                ProbeOutcome::Ok => node.mark_up(),
                ProbeOutcome::Syncing => node.mark_down(now, result.last_message, true),
                ProbeOutcome::WrongChain { .. } | ProbeOutcome::Unreachable => {
                    node.mark_down(now, result.last_message, false)
                }
            }
            samples.push(NodeDownSample {
                url: node.url.clone(),
                down_seconds: node.down_seconds(now),
            });
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(urls: &[&str]) -> RpcPool {
        let nodes = urls
            .iter()
            .map(|u| NodeState::new(u.to_string(), true))
            .collect();
        RpcPool::new("test-1".into(), nodes, false, None)
    }

    #[tokio::test]
    async fn acquire_with_no_reachable_nodes_sets_no_nodes() {
        let mut pool = pool_with(&["http://127.0.0.1:1", "http://127.0.0.1:2"]);
        let result = pool.acquire().await;
        assert!(result.is_err());
        assert!(pool.no_nodes);
    }

    #[test]
    fn take_recovered_is_one_shot() {
        let mut pool = pool_with(&["http://a"]);
        pool.nodes[0].mark_down(Utc::now(), "unreachable", false);
        pool.nodes[0].mark_up();
        assert_eq!(pool.take_recovered(), vec!["http://a".to_string()]);
        // was_down has been consumed; a second call must not re-report it.
        assert!(pool.take_recovered().is_empty());
    }
}
