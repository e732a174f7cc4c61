use alloy::primitives::Address;
use anyhow::{anyhow, Context, Result};
use std::env;
use url::Url;

use crate::abi::AbiConfig;
use crate::blockchain::RegistryAddresses;
use crate::chains::{get_chain, get_rpc_url};
use crate::ipfs::DEFAULT_IPFS_GATEWAY;
use crate::wallet::{KeyMode, WalletConfig};

pub const DEFAULT_CHAIN_ID: u64 = 11155111;

/// Client configuration
///
/// Registry addresses and RPC endpoints default to the built-in deployment
/// list in chains.rs; every value can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub chain_id: u64,
    pub rpc_url: Url,
    pub registries: RegistryAddresses,
    pub abi: AbiConfig,
    pub ipfs_gateway: String,
    /// Wallet configuration (supports both PRIVATE_KEY and MNEMONIC modes)
    pub wallet: WalletConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let wallet = WalletConfig::from_env()?;
        Self::from_vars(|key| env::var(key).ok(), wallet)
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>, wallet: WalletConfig) -> Result<Self> {
        let chain_id: u64 = var("CHAIN_ID")
            .unwrap_or_else(|| DEFAULT_CHAIN_ID.to_string())
            .parse()
            .context("Invalid CHAIN_ID")?;

        // RPC_URL wins over RPC_URL_{CHAIN} and the built-in list
        let rpc_url = var("RPC_URL")
            .or_else(|| get_rpc_url(chain_id, &var))
            .ok_or_else(|| anyhow!("No RPC URL for chain {}; set RPC_URL", chain_id))?;
        let rpc_url = Url::parse(&rpc_url).with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let chain = get_chain(chain_id);
        let identity = address_var(&var, "ERC8004_IDENTITY_REGISTRY")?
            .or_else(|| chain.and_then(|c| c.identity_registry))
            .ok_or_else(|| {
                anyhow!("No identity registry for chain {}; set ERC8004_IDENTITY_REGISTRY", chain_id)
            })?;
        let reputation = address_var(&var, "ERC8004_REPUTATION_REGISTRY")?
            .or_else(|| chain.and_then(|c| c.reputation_registry))
            .ok_or_else(|| {
                anyhow!("No reputation registry for chain {}; set ERC8004_REPUTATION_REGISTRY", chain_id)
            })?;
        let validation = address_var(&var, "ERC8004_VALIDATION_REGISTRY")?
            .or_else(|| chain.and_then(|c| c.validation_registry));

        let defaults = AbiConfig::default();
        let abi = AbiConfig {
            identity: match var("ERC8004_IDENTITY_ABI") {
                Some(v) => v.parse()?,
                None => defaults.identity,
            },
            reputation: match var("ERC8004_REPUTATION_ABI") {
                Some(v) => v.parse()?,
                None => defaults.reputation,
            },
            validation: match var("ERC8004_VALIDATION_ABI") {
                Some(v) => v.parse()?,
                None => defaults.validation,
            },
        };

        Ok(Self {
            chain_id,
            rpc_url,
            registries: RegistryAddresses {
                identity,
                reputation,
                validation,
            },
            abi,
            ipfs_gateway: var("IPFS_GATEWAY_URL").unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string()),
            wallet,
        })
    }

    /// Get private key if available
    pub fn private_key(&self) -> Option<&str> {
        self.wallet.private_key.as_deref()
    }

    /// Get signer address if available
    pub fn signer_address(&self) -> Option<Address> {
        self.wallet.address
    }

    /// Get the key mode
    pub fn key_mode(&self) -> &KeyMode {
        &self.wallet.mode
    }
}

fn address_var(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Address>> {
    var(key)
        .map(|v| v.parse::<Address>().with_context(|| format!("Invalid {}: {}", key, v)))
        .transpose()
}
