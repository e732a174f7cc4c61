use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

use super::identity::{
    extract_agent_id, register_args, set_metadata_args, set_uri_args, token_error,
};
use crate::abi::codec::{self, expect_address, expect_string, single, uint256};
use crate::abi::{identity_registry, IdentityAbi};
use crate::encoding::bytes_to_string;
use crate::ipfs::RegistrationFetcher;
use crate::ports::{AccountProvider, SendOpts};
use crate::types::{
    Erc8004Error, MetadataEntry, PreparedCall, RegistrationFile, RegistrationResult, Result,
    TxRequest, TxSendResult,
};

/// Identity Registry client over an [`AccountProvider`].
///
/// Produces the same calldata as [`super::IdentityClient`] and adds gas
/// estimation and unsigned call preparation for external signers.
#[derive(Clone)]
pub struct BaseIdentityClient {
    provider: Arc<dyn AccountProvider>,
    registry_address: Address,
    version: IdentityAbi,
    abi: &'static JsonAbi,
    fetcher: RegistrationFetcher,
}

impl BaseIdentityClient {
    pub fn new(
        provider: Arc<dyn AccountProvider>,
        registry_address: Address,
        version: IdentityAbi,
    ) -> Result<Self> {
        Ok(Self {
            provider,
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

    async fn read(&self, function_name: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let function = codec::resolve_function(self.abi, function_name, args)?;
        let data = codec::encode_call(function, args)?;
        let output = self
            .provider
            .call(&TxRequest::new(self.registry_address, data))
            .await?;
        codec::decode_output(function, &output)
    }

    async fn write(&self, function_name: &str, args: &[DynSolValue]) -> Result<TxSendResult> {
        let data = codec::encode_function_data(self.abi, function_name, args)?;
        let mut result = self
            .provider
            .send(TxRequest::new(self.registry_address, data), SendOpts::default())
            .await?;
        result.events = codec::decode_logs(self.abi, result.raw_logs());
        Ok(result)
    }

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
        info!("Registering new agent via account provider");
        let result = self.write("register", &args).await?;
        let agent_id = extract_agent_id(self.registry_address, &result.events, result.raw_logs())?;
        info!("Agent registered: ID {} (tx: {})", agent_id, result.hash);

        Ok(RegistrationResult {
            agent_id,
            tx_hash: result.hash,
        })
    }

    /// Gas estimate for registering with the given URI and metadata
    pub async fn estimate_register_gas(
        &self,
        token_uri: Option<&str>,
        metadata: &[MetadataEntry],
    ) -> Result<u64> {
        let args = register_args(token_uri, metadata);
        let data = codec::encode_function_data(self.abi, "register", &args)?;
        let from = self.provider.get_address().await.ok();

        let gas = self
            .provider
            .estimate_gas(&TxRequest::new(self.registry_address, data), from)
            .await?;
        debug!("register() estimated at {} gas", gas);
        Ok(gas)
    }

    /// Unsigned registration call for signing elsewhere (smart accounts, relayers)
    pub async fn prepare_register_call(
        &self,
        token_uri: Option<&str>,
        metadata: &[MetadataEntry],
    ) -> Result<PreparedCall> {
        let args = register_args(token_uri, metadata);
        let data = codec::encode_function_data(self.abi, "register", &args)?;
        let chain_id = self.provider.chain_id().await?;
        Ok(PreparedCall::single(chain_id, self.registry_address, data))
    }

    pub async fn get_token_uri(&self, agent_id: U256) -> Result<String> {
        let out = self
            .read("tokenURI", &[uint256(agent_id)])
            .await
            .map_err(|e| token_error(agent_id, e))?;
        expect_string(single(&out, "tokenURI")?, "tokenURI")
    }

    pub async fn set_agent_uri(&self, agent_id: U256, uri: &str) -> Result<TxSendResult> {
        self.write(self.version.set_uri_function(), &set_uri_args(agent_id, uri))
            .await
    }

    pub async fn get_metadata(&self, agent_id: U256, key: &str) -> Result<String> {
        let out = self
            .read("getMetadata", &[uint256(agent_id), codec::string(key)])
            .await?;
        bytes_to_string(single(&out, "getMetadata")?)
    }

    pub async fn set_metadata(&self, agent_id: U256, key: &str, value: &str) -> Result<TxSendResult> {
        self.write("setMetadata", &set_metadata_args(agent_id, key, value))
            .await
    }

    pub async fn get_owner(&self, agent_id: U256) -> Result<Address> {
        let out = self
            .read("ownerOf", &[uint256(agent_id)])
            .await
            .map_err(|e| token_error(agent_id, e))?;
        expect_address(single(&out, "ownerOf")?, "owner")
    }

    pub async fn agent_exists(&self, agent_id: U256) -> Result<bool> {
        match self.get_owner(agent_id).await {
            Ok(_) => Ok(true),
            Err(Erc8004Error::AgentNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get_registration_file(&self, agent_id: U256) -> Result<RegistrationFile> {
        let uri = self.get_token_uri(agent_id).await?;
        self.fetcher.fetch(&uri).await
    }
}
