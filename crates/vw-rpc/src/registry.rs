use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Default public chain-registry index, matching
/// `original_source/td2/chain-details.go`'s `registryJson`.
pub const DEFAULT_REGISTRY_INDEX_URL: &str = "https://chains.cosmos.directory/";

/// Resolves a chain-id to a usable public RPC endpoint. Isolated behind a
/// trait so the fragile HTML-scrape implementation can be swapped for a
/// real directory API without disturbing the pool.
#[async_trait]
pub trait PublicEndpointResolver: Send + Sync {
    async fn resolve(&self, chain_id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct RegistryIndex {
    chains: Vec<RegistryChain>,
}

#[derive(Debug, Deserialize, Clone)]
struct RegistryChain {
    chain_id: String,
    path: String,
}

/// Caches the public chains-directory JSON index and exposes a best-effort
/// scrape of each chain's directory page to recover a direct RPC endpoint.
pub struct Registry {
    index_url: String,
    client: reqwest::Client,
    cache: RwLock<HashMap<String, String>>,
    anchor_re: Regex,
}

impl Registry {
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            client: reqwest::Client::new(),
            cache: RwLock::new(HashMap::new()),
            anchor_re: Regex::new(r#"//([^/:"']+)(:\d+)?"#).expect("valid regex"),
        }
    }

    /// Fetches `{chains:[{chain_id, path}, ...]}` and replaces the cache.
    pub async fn refresh(&self) -> Result<()> {
        let body: RegistryIndex = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .context("fetching registry index")?
            .json()
            .await
            .context("decoding registry index")?;

        let mut cache = self.cache.write().expect("registry cache lock poisoned");
        cache.clear();
        for chain in body.chains {
            cache.insert(chain.chain_id, chain.path);
        }
        debug!(count = cache.len(), "registry index refreshed");
        Ok(())
    }

    fn path_for(&self, chain_id: &str) -> Option<String> {
        self.cache
            .read()
            .expect("registry cache lock poisoned")
            .get(chain_id)
            .cloned()
    }
}

#[async_trait]
impl PublicEndpointResolver for Registry {
    /// Best-effort: fetches the chain's directory page and scrapes the
    /// first anchor-tag host:port out of it. Fragile by nature; failures
    /// here are expected and handled by the caller falling back to
    /// `no_nodes`.
    async fn resolve(&self, chain_id: &str) -> Result<String> {
        let path = self
            .path_for(chain_id)
            .ok_or_else(|| anyhow!("chain {chain_id} not present in registry index"))?;

        let page_url = format!("{}/{}/", self.index_url.trim_end_matches("/chain.json"), path);
        let body = self
            .client
            .get(&page_url)
            .send()
            .await
            .context("fetching registry directory page")?
            .text()
            .await
            .context("reading registry directory page body")?;

        let caps = self
            .anchor_re
            .captures(&body)
            .ok_or_else(|| anyhow!("no anchor tag found scraping {page_url}"))?;
        let host = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let port = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if host.is_empty() {
            warn!(page_url, "registry scrape matched empty host");
            return Err(anyhow!("empty host scraped from {page_url}"));
        }
        Ok(format!("http://{host}{port}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape_host(re: &Regex, html: &str) -> Option<String> {
        let caps = re.captures(html)?;
        let host = caps.get(1)?.as_str();
        let port = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        Some(format!("http://{host}{port}"))
    }

    #[test]
    fn anchor_scrape_recovers_host_and_port() {
        let re = Registry::new("https://chains.cosmos.directory/").anchor_re;
        let html = r#"<a href="https://rpc.example.com:26657/status">status</a>"#;
        assert_eq!(scrape_host(&re, html).as_deref(), Some("http://rpc.example.com:26657"));
    }

    #[test]
    fn anchor_scrape_handles_missing_port() {
        let re = Registry::new("https://chains.cosmos.directory/").anchor_re;
        let html = r#"<a href="https://rpc.example.com/status">status</a>"#;
        assert_eq!(scrape_host(&re, html).as_deref(), Some("http://rpc.example.com"));
    }

    #[test]
    fn anchor_scrape_fails_without_anchor() {
        let re = Registry::new("https://chains.cosmos.directory/").anchor_re;
        assert!(re.captures("no links here").is_none());
    }
}
