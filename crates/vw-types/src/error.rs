//! Typed error taxonomy shared by the core monitoring crates.
//!
//! Library crates propagate these with `?`; the binary and adapter crates
//! collapse them into `anyhow::Error` at the boundary.

use thiserror::Error;

/// Errors surfaced while probing or talking to a single RPC endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("could not parse url {0}")]
    InvalidUrl(String),
    #[error("transport error contacting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("node on {url} reports chain id {actual}, expected {expected}")]
    WrongChain {
        url: String,
        expected: String,
        actual: String,
    },
    #[error("node on {0} is still catching up")]
    Syncing(String),
}

/// Errors surfaced by the RPC pool when no endpoint can be used.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no usable RPC endpoints available for {chain_id}")]
    NoUsableEndpoints { chain_id: String },
    #[error("rpc client for {chain_id} is not ready yet")]
    NotReady { chain_id: String },
}

/// Errors surfaced while refreshing validator staking/slashing state.
#[derive(Debug, Error)]
pub enum ValidatorFetchError {
    #[error("validator {operator_address} not found on chain")]
    NotFound { operator_address: String },
    #[error("could not decode consensus pubkey: {0}")]
    BadPubkey(String),
    #[error("could not determine bech32 prefix from operator address: {0}")]
    UnknownPrefix(String),
    #[error("bech32 encode/decode error: {0}")]
    Bech32(String),
    #[error("rpc error: {0}")]
    Rpc(#[from] anyhow::Error),
}

/// Errors surfaced by the websocket block/vote listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("websocket idle for {0} seconds, exiting")]
    Idle(u64),
    #[error("websocket read error: {0}")]
    Read(String),
    #[error("subscription error: {0}")]
    Subscribe(String),
}

/// Errors surfaced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("configuration is invalid:\n{0}")]
    Invalid(String),
}
