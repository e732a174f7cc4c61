use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Log, B256, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::abi::codec::{self, expect_address, expect_string, expect_uint, single, uint256};
use crate::abi::{identity_registry, IdentityAbi, ERC721_TRANSFER_TOPIC};
use crate::adapters::BlockchainAdapter;
use crate::encoding::{bytes_to_string, string_to_bytes};
use crate::ipfs::RegistrationFetcher;
use crate::types::{
    ContractCallResult, DecodedEvent, Erc8004Error, MetadataEntry, RegistrationFile,
    RegistrationResult, Result,
};

/// Identity Registry client over a [`BlockchainAdapter`]
#[derive(Clone)]
pub struct IdentityClient {
    adapter: Arc<dyn BlockchainAdapter>,
    registry_address: Address,
    version: IdentityAbi,
    abi: &'static JsonAbi,
    fetcher: RegistrationFetcher,
}

impl IdentityClient {
    pub fn new(
        adapter: Arc<dyn BlockchainAdapter>,
        registry_address: Address,
        version: IdentityAbi,
    ) -> Result<Self> {
        Ok(Self {
            adapter,
            registry_address,
            version,
            abi: identity_registry(version)?,
            fetcher: RegistrationFetcher::default(),
        })
    }

    pub fn with_fetcher(mut self, fetcher: RegistrationFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn registry_address(&self) -> Address {
        self.registry_address
    }

    pub fn abi_version(&self) -> IdentityAbi {
        self.version
    }

    /// Register an agent with no tokenURI
    pub async fn register(&self) -> Result<RegistrationResult> {
        self.send_register(register_args(None, &[])).await
    }

    pub async fn register_with_uri(&self, token_uri: &str) -> Result<RegistrationResult> {
        self.send_register(register_args(Some(token_uri), &[])).await
    }

    pub async fn register_with_metadata(
        &self,
        token_uri: &str,
        metadata: &[MetadataEntry],
    ) -> Result<RegistrationResult> {
        self.send_register(register_args(Some(token_uri), metadata)).await
    }

    async fn send_register(&self, args: Vec<DynSolValue>) -> Result<RegistrationResult> {
        info!("Registering new agent ({} args)", args.len());

        let result = self
            .adapter
            .send(self.registry_address, self.abi, "register", &args, None)
            .await?;

        let agent_id = extract_agent_id(self.registry_address, &result.events, result.raw_logs())?;

        info!(
            "Agent registered: ID {} (tx: {}, block: {})",
            agent_id,
            result.hash,
            result.block_number.unwrap_or_default()
        );

        Ok(RegistrationResult {
            agent_id,
            tx_hash: result.hash,
        })
    }

    /// Get the metadata URI for an agent
    pub async fn get_token_uri(&self, agent_id: U256) -> Result<String> {
        debug!("Fetching tokenURI for agent {}", agent_id);

        let out = self
            .adapter
            .call(self.registry_address, self.abi, "tokenURI", &[uint256(agent_id)])
            .await
            .map_err(|e| token_error(agent_id, e))?;

        expect_string(single(&out, "tokenURI")?, "tokenURI")
    }

    /// Point the agent at a new registration file
    pub async fn set_agent_uri(&self, agent_id: U256, uri: &str) -> Result<ContractCallResult> {
        info!("Updating URI for agent {} ({} bytes)", agent_id, uri.len());

        self.adapter
            .send(
                self.registry_address,
                self.abi,
                self.version.set_uri_function(),
                &set_uri_args(agent_id, uri),
                None,
            )
            .await
    }

    /// Get metadata value for a key, decoded as UTF-8
    pub async fn get_metadata(&self, agent_id: U256, key: &str) -> Result<String> {
        debug!("Fetching metadata '{}' for agent {}", key, agent_id);

        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "getMetadata",
                &[uint256(agent_id), codec::string(key)],
            )
            .await?;

        bytes_to_string(single(&out, "getMetadata")?)
    }

    pub async fn set_metadata(
        &self,
        agent_id: U256,
        key: &str,
        value: &str,
    ) -> Result<ContractCallResult> {
        info!("Setting metadata '{}' for agent {}", key, agent_id);

        self.adapter
            .send(
                self.registry_address,
                self.abi,
                "setMetadata",
                &set_metadata_args(agent_id, key, value),
                None,
            )
            .await
    }

    /// Get the owner of an agent
    pub async fn get_owner(&self, agent_id: U256) -> Result<Address> {
        debug!("Fetching owner for agent {}", agent_id);

        let out = self
            .adapter
            .call(self.registry_address, self.abi, "ownerOf", &[uint256(agent_id)])
            .await
            .map_err(|e| token_error(agent_id, e))?;

        expect_address(single(&out, "ownerOf")?, "owner")
    }

    /// Check if an agent exists by calling ownerOf
    pub async fn agent_exists(&self, agent_id: U256) -> Result<bool> {
        match self.get_owner(agent_id).await {
            Ok(_) => Ok(true),
            Err(Erc8004Error::AgentNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve the tokenURI and download the registration file
    pub async fn get_registration_file(&self, agent_id: U256) -> Result<RegistrationFile> {
        let uri = self.get_token_uri(agent_id).await?;
        self.fetcher.fetch(&uri).await
    }
}

pub(crate) fn register_args(token_uri: Option<&str>, metadata: &[MetadataEntry]) -> Vec<DynSolValue> {
    match token_uri {
        None => vec![],
        Some(uri) if metadata.is_empty() => vec![codec::string(uri)],
        Some(uri) => vec![codec::string(uri), metadata_value(metadata)],
    }
}

/// `(string key, bytes value)[]`
fn metadata_value(entries: &[MetadataEntry]) -> DynSolValue {
    DynSolValue::Array(
        entries
            .iter()
            .map(|entry| {
                DynSolValue::Tuple(vec![
                    codec::string(entry.key.clone()),
                    DynSolValue::Bytes(string_to_bytes(&entry.value)),
                ])
            })
            .collect(),
    )
}

pub(crate) fn set_uri_args(agent_id: U256, uri: &str) -> Vec<DynSolValue> {
    vec![uint256(agent_id), codec::string(uri)]
}

pub(crate) fn set_metadata_args(agent_id: U256, key: &str, value: &str) -> Vec<DynSolValue> {
    vec![
        uint256(agent_id),
        codec::string(key),
        DynSolValue::Bytes(string_to_bytes(value)),
    ]
}

/// Find the agent id minted by `registry` in a registration receipt.
///
/// Tried in order: the `Registered` event, a decoded ERC-721 mint
/// (`Transfer` from the zero address), then a raw Transfer log from the zero
/// address with the token id in topic 3. Logs from other contracts and
/// transfers between accounts are ignored.
pub(crate) fn extract_agent_id(
    registry: Address,
    events: &[DecodedEvent],
    logs: &[Log],
) -> Result<U256> {
    if let Some(id) = events
        .iter()
        .filter(|e| e.address == registry && e.name == "Registered")
        .find_map(|e| e.arg("agentId"))
    {
        return expect_uint(id, "agentId");
    }

    let minted = events.iter().find(|e| {
        e.address == registry
            && e.name == "Transfer"
            && e.arg("from") == Some(&DynSolValue::Address(Address::ZERO))
    });
    if let Some(id) = minted.and_then(|e| e.arg("tokenId")) {
        return expect_uint(id, "tokenId");
    }

    logs.iter()
        .filter(|log| log.address == registry)
        .find_map(|log| {
            let topics = log.topics();
            (topics.len() >= 4
                && topics[0] == ERC721_TRANSFER_TOPIC
                && topics[1] == B256::ZERO)
                .then(|| U256::from_be_bytes(topics[3].0))
        })
        .ok_or_else(|| Erc8004Error::ExtractionFailed {
            field: "agentId",
            reason: "Registered or Transfer event not found".to_string(),
        })
}

/// ERC-721 lookups on an unminted id surface as [`Erc8004Error::AgentNotFound`].
pub(crate) fn token_error(agent_id: U256, err: Erc8004Error) -> Erc8004Error {
    match &err {
        Erc8004Error::BlockchainError(msg) if Erc8004Error::is_nonexistent_token(msg) => {
            Erc8004Error::AgentNotFound(agent_id)
        }
        _ => err,
    }
}
