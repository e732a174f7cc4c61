use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// On-chain key/value metadata supplied at registration or via setMetadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub agent_id: U256,
    pub tx_hash: B256,
}

/// Authorization letting `client_address` post feedback on `agent_id`
/// up to `index_limit` until `expiry` (unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAuth {
    pub agent_id: U256,
    pub client_address: Address,
    pub index_limit: U256,
    pub expiry: U256,
    pub chain_id: U256,
    pub identity_registry: Address,
    pub signer_address: Address,
}

#[derive(Debug, Clone, Default)]
pub struct GiveFeedbackParams {
    pub agent_id: U256,
    pub score: u8,
    pub tag1: Option<String>,
    pub tag2: Option<String>,
    pub endpoint: Option<String>,
    pub feedback_uri: Option<String>,
    pub feedback_hash: Option<B256>,
    /// Output of `ReputationClient::sign_feedback_auth`
    pub feedback_auth: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AppendResponseParams {
    pub agent_id: U256,
    pub client_address: Address,
    pub feedback_index: u64,
    pub response_uri: String,
    pub response_hash: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub agent_id: U256,
    pub client_address: Address,
    pub index: u64,
    pub score: u8,
    pub tag1: String,
    pub tag2: String,
    pub is_revoked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub count: u64,
    pub average_score: u8,
}

impl FeedbackSummary {
    /// Value reported when the registry could not produce a summary.
    pub const fn unavailable() -> Self {
        Self {
            count: 0,
            average_score: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllFeedback {
    pub clients: Vec<Address>,
    pub indexes: Vec<u64>,
    pub scores: Vec<u8>,
    pub tag1s: Vec<String>,
    pub tag2s: Vec<String>,
    pub revoked_statuses: Vec<bool>,
}

impl AllFeedback {
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ValidationRequestParams {
    pub validator_address: Address,
    pub agent_id: U256,
    pub request_uri: String,
    /// keccak256 of the content published at `request_uri`; computed by the caller
    pub request_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequestResult {
    pub tx_hash: B256,
    pub request_hash: B256,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResponseParams {
    pub request_hash: B256,
    pub response: u8,
    pub response_uri: Option<String>,
    pub response_hash: Option<B256>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatus {
    pub validator_address: Address,
    pub agent_id: U256,
    /// 0 until the validator has responded
    pub response: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_hash: Option<B256>,
    pub tag: String,
    pub last_update: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub count: u64,
    pub avg_response: u8,
}
