use alloy::primitives::Address;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::{IdentityClient, ReputationClient, ValidationClient};
use crate::abi::AbiConfig;
use crate::adapters::BlockchainAdapter;
use crate::chains::get_chain;
use crate::types::{Erc8004Error, Result};

/// Deployed registry addresses on one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAddresses {
    pub identity: Address,
    pub reputation: Address,
    /// Not every deployment ships a validation registry
    pub validation: Option<Address>,
}

impl RegistryAddresses {
    /// Addresses of a known deployment
    pub fn for_chain(chain_id: u64) -> Result<Self> {
        let chain = get_chain(chain_id).ok_or_else(|| {
            Erc8004Error::InvalidArgument(format!("Unknown chain ID: {}", chain_id))
        })?;

        match (chain.identity_registry, chain.reputation_registry) {
            (Some(identity), Some(reputation)) => Ok(Self {
                identity,
                reputation,
                validation: chain.validation_registry,
            }),
            _ => Err(Erc8004Error::InvalidArgument(format!(
                "No ERC-8004 registries known on {} ({})",
                chain.name, chain_id
            ))),
        }
    }
}

/// Entry point composing the identity, reputation and validation clients
/// over one adapter.
#[derive(Clone)]
pub struct Erc8004Client {
    adapter: Arc<dyn BlockchainAdapter>,
    addresses: RegistryAddresses,
    identity: IdentityClient,
    reputation: ReputationClient,
    validation: Option<ValidationClient>,
}

impl Erc8004Client {
    pub fn new(
        adapter: Arc<dyn BlockchainAdapter>,
        addresses: RegistryAddresses,
        abi: AbiConfig,
    ) -> Result<Self> {
        let identity = IdentityClient::new(adapter.clone(), addresses.identity, abi.identity)?;
        let reputation = ReputationClient::new(
            adapter.clone(),
            addresses.reputation,
            addresses.identity,
            abi.reputation,
        )?;
        let validation = addresses
            .validation
            .map(|address| ValidationClient::new(adapter.clone(), address, abi.validation))
            .transpose()?;

        debug!(
            "ERC-8004 client ready (identity: {}, reputation: {}, validation: {:?})",
            addresses.identity, addresses.reputation, addresses.validation
        );

        Ok(Self {
            adapter,
            addresses,
            identity,
            reputation,
            validation,
        })
    }

    /// Client for a chain from the built-in deployment list
    pub fn for_chain(
        adapter: Arc<dyn BlockchainAdapter>,
        chain_id: u64,
        abi: AbiConfig,
    ) -> Result<Self> {
        Self::new(adapter, RegistryAddresses::for_chain(chain_id)?, abi)
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    pub fn reputation(&self) -> &ReputationClient {
        &self.reputation
    }

    pub fn validation(&self) -> Option<&ValidationClient> {
        self.validation.as_ref()
    }

    pub fn addresses(&self) -> &RegistryAddresses {
        &self.addresses
    }

    pub fn adapter(&self) -> &Arc<dyn BlockchainAdapter> {
        &self.adapter
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.adapter.get_chain_id().await
    }

    /// `None` for read-only adapters
    pub fn signer_address(&self) -> Option<Address> {
        self.adapter.get_address()
    }
}
