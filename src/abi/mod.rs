//! Bundled ERC-8004 registry ABIs
//!
//! The deployed registries changed shape between contract revisions, so each
//! registry ABI is selected by an explicit version rather than guessed:
//!
//! - Identity: `setAgentUri` (legacy) vs `setAgentURI` (current)
//! - Reputation: `bytes32` tags vs `string` tags (the latter adds `endpoint`)
//! - Validation: 5-field vs 6-field `getValidationStatus` (adds `responseHash`)

pub mod codec;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{b256, B256};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::types::{Erc8004Error, Result};

/// topic0 of the ERC-721 `Transfer(address,address,uint256)` event
pub const ERC721_TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityAbi {
    Legacy,
    #[default]
    Current,
}

impl IdentityAbi {
    pub fn set_uri_function(&self) -> &'static str {
        match self {
            IdentityAbi::Legacy => "setAgentUri",
            IdentityAbi::Current => "setAgentURI",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReputationAbi {
    Bytes32Tags,
    #[default]
    StringTags,
}

impl ReputationAbi {
    pub fn tag_type(&self) -> TagType {
        match self {
            ReputationAbi::Bytes32Tags => TagType::Bytes32,
            ReputationAbi::StringTags => TagType::String,
        }
    }

    /// Whether giveFeedback carries an `endpoint` argument
    pub fn has_endpoint(&self) -> bool {
        matches!(self, ReputationAbi::StringTags)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationAbi {
    Legacy,
    #[default]
    Current,
}

impl ValidationAbi {
    pub fn tag_type(&self) -> TagType {
        match self {
            ValidationAbi::Legacy => TagType::Bytes32,
            ValidationAbi::Current => TagType::String,
        }
    }
}

/// On-chain representation of free-form tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Bytes32,
    String,
}

impl TagType {
    fn solidity(&self) -> &'static str {
        match self {
            TagType::Bytes32 => "bytes32",
            TagType::String => "string",
        }
    }
}

/// ABI versions of the three registries a deployment speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbiConfig {
    pub identity: IdentityAbi,
    pub reputation: ReputationAbi,
    pub validation: ValidationAbi,
}

impl FromStr for IdentityAbi {
    type Err = Erc8004Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "legacy" | "v1" => Ok(IdentityAbi::Legacy),
            "current" | "v2" => Ok(IdentityAbi::Current),
            other => Err(Erc8004Error::InvalidArgument(format!(
                "Unknown identity ABI version: {}",
                other
            ))),
        }
    }
}

impl FromStr for ReputationAbi {
    type Err = Erc8004Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bytes32" | "legacy" | "v1" => Ok(ReputationAbi::Bytes32Tags),
            "string" | "current" | "v2" => Ok(ReputationAbi::StringTags),
            other => Err(Erc8004Error::InvalidArgument(format!(
                "Unknown reputation ABI version: {}",
                other
            ))),
        }
    }
}

impl FromStr for ValidationAbi {
    type Err = Erc8004Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "legacy" | "v1" => Ok(ValidationAbi::Legacy),
            "current" | "v2" => Ok(ValidationAbi::Current),
            other => Err(Erc8004Error::InvalidArgument(format!(
                "Unknown validation ABI version: {}",
                other
            ))),
        }
    }
}

type AbiCell = LazyLock<std::result::Result<JsonAbi, String>>;

fn parse_abi(signatures: &[String]) -> std::result::Result<JsonAbi, String> {
    JsonAbi::parse(signatures.iter().map(String::as_str)).map_err(|e| e.to_string())
}

fn load(cell: &'static AbiCell, name: &str) -> Result<&'static JsonAbi> {
    match &**cell {
        Ok(abi) => Ok(abi),
        Err(e) => Err(Erc8004Error::Abi(format!(
            "bundled {} ABI is invalid: {}",
            name, e
        ))),
    }
}

fn identity_signatures(version: IdentityAbi) -> Vec<String> {
    let mut sigs: Vec<String> = [
        "function register() returns (uint256 agentId)",
        "function register(string tokenURI) returns (uint256 agentId)",
        "function register(string tokenURI, (string,bytes)[] metadata) returns (uint256 agentId)",
        "function tokenURI(uint256 tokenId) view returns (string)",
        "function ownerOf(uint256 tokenId) view returns (address)",
        "function balanceOf(address owner) view returns (uint256)",
        "function getMetadata(uint256 agentId, string key) view returns (bytes)",
        "function setMetadata(uint256 agentId, string key, bytes value)",
        "event Registered(uint256 indexed agentId, string tokenURI, address indexed owner)",
        "event MetadataSet(uint256 indexed agentId, string indexed indexedKey, string key, bytes value)",
        "event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    match version {
        IdentityAbi::Legacy => {
            sigs.push("function setAgentUri(uint256 agentId, string newUri)".into());
            sigs.push(
                "event UriUpdated(uint256 indexed agentId, string newUri, address indexed updatedBy)"
                    .into(),
            );
        }
        IdentityAbi::Current => {
            sigs.push("function setAgentURI(uint256 agentId, string newURI)".into());
            sigs.push(
                "event URIUpdated(uint256 indexed agentId, string newURI, address indexed updatedBy)"
                    .into(),
            );
        }
    }
    sigs
}

fn reputation_signatures(version: ReputationAbi) -> Vec<String> {
    let t = version.tag_type().solidity();
    let give_feedback = if version.has_endpoint() {
        format!(
            "function giveFeedback(uint256 agentId, uint8 score, {t} tag1, {t} tag2, string endpoint, string feedbackUri, bytes32 feedbackHash, bytes feedbackAuth)"
        )
    } else {
        format!(
            "function giveFeedback(uint256 agentId, uint8 score, {t} tag1, {t} tag2, string feedbackUri, bytes32 feedbackHash, bytes feedbackAuth)"
        )
    };

    vec![
        "function getIdentityRegistry() view returns (address)".to_string(),
        give_feedback,
        "function revokeFeedback(uint256 agentId, uint64 feedbackIndex)".to_string(),
        "function appendResponse(uint256 agentId, address clientAddress, uint64 feedbackIndex, string responseUri, bytes32 responseHash)".to_string(),
        format!("function getSummary(uint256 agentId, address[] clientAddresses, {t} tag1, {t} tag2) view returns (uint64 count, uint8 averageScore)"),
        format!("function readFeedback(uint256 agentId, address clientAddress, uint64 index) view returns (uint8 score, {t} tag1, {t} tag2, bool isRevoked)"),
        format!("function readAllFeedback(uint256 agentId, address[] clientAddresses, {t} tag1, {t} tag2, bool includeRevoked) view returns (address[] clients, uint64[] feedbackIndexes, uint8[] scores, {t}[] tag1s, {t}[] tag2s, bool[] revokedStatuses)"),
        "function getResponseCount(uint256 agentId, address clientAddress, uint64 feedbackIndex, address[] responders) view returns (uint64)".to_string(),
        "function getClients(uint256 agentId) view returns (address[])".to_string(),
        "function getLastIndex(uint256 agentId, address clientAddress) view returns (uint64)".to_string(),
        format!("event NewFeedback(uint256 indexed agentId, address indexed clientAddress, uint8 score, {t} indexed tag1, {t} tag2, string feedbackUri, bytes32 feedbackHash)"),
        "event FeedbackRevoked(uint256 indexed agentId, address indexed clientAddress, uint64 indexed feedbackIndex)".to_string(),
        "event ResponseAppended(uint256 indexed agentId, address indexed clientAddress, uint64 feedbackIndex, address indexed responder, string responseUri, bytes32 responseHash)".to_string(),
    ]
}

fn validation_signatures(version: ValidationAbi) -> Vec<String> {
    let t = version.tag_type().solidity();
    let status = match version {
        ValidationAbi::Legacy => format!(
            "function getValidationStatus(bytes32 requestHash) view returns (address validatorAddress, uint256 agentId, uint8 response, {t} tag, uint256 lastUpdate)"
        ),
        ValidationAbi::Current => format!(
            "function getValidationStatus(bytes32 requestHash) view returns (address validatorAddress, uint256 agentId, uint8 response, bytes32 responseHash, {t} tag, uint256 lastUpdate)"
        ),
    };

    vec![
        "function getIdentityRegistry() view returns (address)".to_string(),
        "function validationRequest(address validatorAddress, uint256 agentId, string requestUri, bytes32 requestHash)".to_string(),
        format!("function validationResponse(bytes32 requestHash, uint8 response, string responseUri, bytes32 responseHash, {t} tag)"),
        status,
        format!("function getSummary(uint256 agentId, address[] validatorAddresses, {t} tag) view returns (uint64 count, uint8 avgResponse)"),
        "function getAgentValidations(uint256 agentId) view returns (bytes32[] requestHashes)".to_string(),
        "function getValidatorRequests(address validatorAddress) view returns (bytes32[] requestHashes)".to_string(),
        "event ValidationRequest(address indexed validatorAddress, uint256 indexed agentId, string requestUri, bytes32 indexed requestHash)".to_string(),
        format!("event ValidationResponse(address indexed validatorAddress, uint256 indexed agentId, bytes32 indexed requestHash, uint8 response, string responseUri, bytes32 responseHash, {t} tag)"),
    ]
}

static IDENTITY_LEGACY: AbiCell =
    LazyLock::new(|| parse_abi(&identity_signatures(IdentityAbi::Legacy)));
static IDENTITY_CURRENT: AbiCell =
    LazyLock::new(|| parse_abi(&identity_signatures(IdentityAbi::Current)));
static REPUTATION_BYTES32: AbiCell =
    LazyLock::new(|| parse_abi(&reputation_signatures(ReputationAbi::Bytes32Tags)));
static REPUTATION_STRING: AbiCell =
    LazyLock::new(|| parse_abi(&reputation_signatures(ReputationAbi::StringTags)));
static VALIDATION_LEGACY: AbiCell =
    LazyLock::new(|| parse_abi(&validation_signatures(ValidationAbi::Legacy)));
static VALIDATION_CURRENT: AbiCell =
    LazyLock::new(|| parse_abi(&validation_signatures(ValidationAbi::Current)));

pub fn identity_registry(version: IdentityAbi) -> Result<&'static JsonAbi> {
    match version {
        IdentityAbi::Legacy => load(&IDENTITY_LEGACY, "identity registry (legacy)"),
        IdentityAbi::Current => load(&IDENTITY_CURRENT, "identity registry"),
    }
}

pub fn reputation_registry(version: ReputationAbi) -> Result<&'static JsonAbi> {
    match version {
        ReputationAbi::Bytes32Tags => load(&REPUTATION_BYTES32, "reputation registry (bytes32 tags)"),
        ReputationAbi::StringTags => load(&REPUTATION_STRING, "reputation registry"),
    }
}

pub fn validation_registry(version: ValidationAbi) -> Result<&'static JsonAbi> {
    match version {
        ValidationAbi::Legacy => load(&VALIDATION_LEGACY, "validation registry (legacy)"),
        ValidationAbi::Current => load(&VALIDATION_CURRENT, "validation registry"),
    }
}
