use serde::{Deserialize, Serialize};

pub const EIP8004_TYPE: &str = "https://eips.ethereum.org/EIPS/eip-8004#registration-v1";

/// ERC-8004 agent registration file (off-chain JSON referenced by tokenURI)
///
/// Fetched as-is: nothing here is verified against on-chain state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationFile {
    #[serde(rename = "type")]
    pub registration_type: Option<String>,

    pub name: Option<String>,

    pub description: Option<String>,

    pub image: Option<String>,

    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    #[serde(default)]
    pub registrations: Vec<Registration>,

    #[serde(default, rename = "supportedTrust", alias = "supported_trust")]
    pub supported_trust: Vec<String>,

    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,

    pub endpoint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    // Protocol specific, e.g. MCP tool lists or A2A skills
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "agentId", alias = "agent_id")]
    pub agent_id: u64,

    #[serde(rename = "agentRegistry", alias = "agent_registry")]
    pub agent_registry: String,
}

impl RegistrationFile {
    /// Check if type field matches ERC-8004
    pub fn has_valid_type(&self) -> bool {
        self.registration_type
            .as_ref()
            .map(|t| t == EIP8004_TYPE)
            .unwrap_or(false)
    }

    /// Find registration matching the given agent ID and registry
    pub fn find_registration(&self, agent_id: u64, registry: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| {
            r.agent_id == agent_id
                && r.agent_registry
                    .to_lowercase()
                    .contains(&registry.to_lowercase())
        })
    }

    pub fn trust_models(&self) -> Vec<TrustModel> {
        self.supported_trust
            .iter()
            .map(|t| TrustModel::from(t.as_str()))
            .collect()
    }

    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

/// Trust model advertised in `supportedTrust`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustModel {
    Reputation,
    CryptoEconomic,
    TeeAttestation,
    Other(String),
}

impl From<&str> for TrustModel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "reputation" => TrustModel::Reputation,
            "crypto-economic" => TrustModel::CryptoEconomic,
            "tee-attestation" => TrustModel::TeeAttestation,
            other => TrustModel::Other(other.to_string()),
        }
    }
}
