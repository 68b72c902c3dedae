//! Hand-written protobuf messages for the three Cosmos SDK ABCI query paths
//! this crate needs. No `.proto`/build-script codegen: these are narrow
//! enough to derive `prost::Message` directly on a few fields, the same way
//! compatibility shims are hand-rolled elsewhere in the workspace.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use prost::Message;
use serde::Deserialize;
use serde_json::json;

pub const PATH_VALIDATOR: &str = "/cosmos.staking.v1beta1.Query/Validator";
pub const PATH_SIGNING_INFO: &str = "/cosmos.slashing.v1beta1.Query/SigningInfo";
pub const PATH_SLASHING_PARAMS: &str = "/cosmos.slashing.v1beta1.Query/Params";

#[derive(Clone, PartialEq, Default, Message)]
pub struct QueryValidatorRequest {
    #[prost(string, tag = "1")]
    pub validator_addr: String,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes, tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct Validator {
    #[prost(string, tag = "1")]
    pub operator_address: String,
    #[prost(message, optional, tag = "2")]
    pub consensus_pubkey: Option<Any>,
    #[prost(bool, tag = "3")]
    pub jailed: bool,
    #[prost(int32, tag = "4")]
    pub status: i32,
    #[prost(string, tag = "8")]
    pub description_moniker: String,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct QueryValidatorResponse {
    #[prost(message, optional, tag = "1")]
    pub validator: Option<Validator>,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct QuerySigningInfoRequest {
    #[prost(string, tag = "1")]
    pub cons_address: String,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct ValidatorSigningInfo {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(int64, tag = "2")]
    pub start_height: i64,
    #[prost(int64, tag = "3")]
    pub index_offset: i64,
    #[prost(int64, tag = "5")]
    pub missed_blocks_counter: i64,
    #[prost(bool, tag = "7")]
    pub tombstoned: bool,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct QuerySigningInfoResponse {
    #[prost(message, optional, tag = "1")]
    pub val_signing_info: Option<ValidatorSigningInfo>,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct QueryParamsRequest {}

#[derive(Clone, PartialEq, Default, Message)]
pub struct SlashingParams {
    #[prost(int64, tag = "1")]
    pub signed_blocks_window: i64,
}

#[derive(Clone, PartialEq, Default, Message)]
pub struct QueryParamsResponse {
    #[prost(message, optional, tag = "1")]
    pub params: Option<SlashingParams>,
}

/// Status codes from the `bond_status` staking enum this crate cares about.
pub const BOND_STATUS_BONDED: i32 = 3;

#[derive(Debug, Deserialize)]
struct AbciQueryEnvelope {
    result: AbciQueryResult,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    value: String,
    #[serde(default)]
    log: String,
}

/// Issues a single ABCI query against `base_url`'s Tendermint RPC JSON-RPC
/// endpoint and decodes the base64 protobuf value into `R`.
pub async fn abci_query<R: Message + Default>(
    client: &reqwest::Client,
    base_url: &str,
    path: &str,
    request_bytes: Vec<u8>,
) -> Result<R> {
    let data_hex = hex::encode(&request_bytes);
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "abci_query",
        "params": { "path": path, "data": data_hex, "prove": false },
    });

    let resp = client
        .post(base_url.trim_end_matches('/'))
        .json(&body)
        .send()
        .await
        .with_context(|| format!("abci_query {path}"))?;

    let envelope: AbciQueryEnvelope = resp
        .json()
        .await
        .with_context(|| format!("decoding abci_query response for {path}"))?;

    if envelope.result.response.code != 0 {
        return Err(anyhow!(
            "abci_query {path} failed: code={} log={}",
            envelope.result.response.code,
            envelope.result.response.log
        ));
    }
    if envelope.result.response.value.is_empty() {
        return Err(anyhow!("abci_query {path} returned empty value"));
    }

    let raw = B64
        .decode(envelope.result.response.value)
        .with_context(|| format!("base64-decoding abci_query value for {path}"))?;
    R::decode(raw.as_slice()).with_context(|| format!("protobuf-decoding abci_query value for {path}"))
}
