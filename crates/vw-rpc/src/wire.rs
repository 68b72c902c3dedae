//! Tolerant wire structs for the bits of the Tendermint RPC responses this
//! crate actually reads. Heights and similar fields arrive as either JSON
//! strings or JSON numbers depending on node version, so every numeric
//! field that crosses the wire is deserialized through `str_or_int`.

use serde::{de, Deserialize, Deserializer};

pub fn str_or_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrInt {
        Str(String),
        Int(i64),
    }
    match StrOrInt::deserialize(deserializer)? {
        StrOrInt::Str(s) => s.parse().map_err(de::Error::custom),
        StrOrInt::Int(i) => Ok(i),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub node_info: NodeInfo,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
pub struct NodeInfo {
    pub network: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncInfo {
    pub catching_up: bool,
    #[serde(default, deserialize_with = "opt_str_or_int")]
    pub latest_block_height: Option<i64>,
}

fn opt_str_or_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Maybe {
        None_,
        Str(String),
        Int(i64),
    }
    match Option::<Maybe>::deserialize(deserializer)? {
        None | Some(Maybe::None_) => Ok(None),
        Some(Maybe::Str(s)) if s.is_empty() => Ok(None),
        Some(Maybe::Str(s)) => s.parse().map(Some).map_err(de::Error::custom),
        Some(Maybe::Int(i)) => Ok(Some(i)),
    }
}

/// Envelope shared by the `NewBlock` and `Vote` subscription streams:
/// `.result.data.type` selects which payload `value` holds.
#[derive(Debug, Deserialize)]
pub struct WsReply {
    pub result: WsResult,
}

#[derive(Debug, Deserialize, Default)]
pub struct WsResult {
    #[serde(default)]
    pub data: Option<WsData>,
    /// Subscription ack replies have no `data` field at all.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WsData {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: serde_json::Value,
}

pub const NEW_BLOCK_EVENT: &str = "tendermint/event/NewBlock";
pub const VOTE_EVENT: &str = "tendermint/event/Vote";

#[derive(Debug, Deserialize)]
pub struct RawBlockValue {
    pub block: RawBlock,
}

#[derive(Debug, Deserialize)]
pub struct RawBlock {
    pub header: RawHeader,
    pub last_commit: RawLastCommit,
}

#[derive(Debug, Deserialize)]
pub struct RawHeader {
    #[serde(deserialize_with = "str_or_int")]
    pub height: i64,
    pub proposer_address: String,
}

#[derive(Debug, Deserialize)]
pub struct RawLastCommit {
    #[serde(default)]
    pub signatures: Vec<RawCommitSig>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitSig {
    #[serde(default)]
    pub validator_address: String,
}

#[derive(Debug, Deserialize)]
pub struct RawVoteValue {
    pub vote: RawVote,
}

#[derive(Debug, Deserialize)]
pub struct RawVote {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "str_or_int")]
    pub height: i64,
    pub validator_address: String,
}

pub const VOTE_TYPE_PREVOTE: &str = "SIGNED_MSG_TYPE_PREVOTE";
pub const VOTE_TYPE_PRECOMMIT: &str = "SIGNED_MSG_TYPE_PRECOMMIT";
