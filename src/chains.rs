use alloy::primitives::{address, Address};
use std::collections::HashMap;
use std::sync::LazyLock;

/// A chain with known ERC-8004 registry deployments
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub identity_registry: Option<Address>,
    pub reputation_registry: Option<Address>,
    pub validation_registry: Option<Address>,
    pub rpcs: Vec<&'static str>,
    pub block_explorer: &'static str,
}

impl ChainConfig {
    /// Get the first available RPC URL
    pub fn primary_rpc(&self) -> Option<&str> {
        self.rpcs.first().copied()
    }

    /// Check if this chain has a deployed identity registry
    pub fn has_registry(&self) -> bool {
        self.identity_registry.is_some()
    }

    pub fn has_validation(&self) -> bool {
        self.validation_registry.is_some()
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.block_explorer, tx_hash)
    }
}

/// Static registry of all supported chains
pub static CHAINS: LazyLock<HashMap<u64, ChainConfig>> = LazyLock::new(|| {
    let chains = vec![
        // ===== MAINNETS =====
        ChainConfig {
            chain_id: 8453,
            name: "base",
            identity_registry: Some(address!("8004A169FB4a3325136EB29fA0ceB6D2e539a432")),
            reputation_registry: Some(address!("8004BAa17C55a88189AE136b182e5fdA19dE9b63")),
            validation_registry: None,
            rpcs: vec![
                "https://mainnet.base.org",
                "https://base.llamarpc.com",
                "https://base.drpc.org",
                "https://base-mainnet.public.blastapi.io",
            ],
            block_explorer: "https://basescan.org",
        },
        ChainConfig {
            chain_id: 1,
            name: "ethereum",
            identity_registry: Some(address!("8004A169FB4a3325136EB29fA0ceB6D2e539a432")),
            reputation_registry: Some(address!("8004BAa17C55a88189AE136b182e5fdA19dE9b63")),
            validation_registry: None,
            rpcs: vec![
                "https://eth.llamarpc.com",
                "https://ethereum.publicnode.com",
                "https://rpc.ankr.com/eth",
                "https://eth.drpc.org",
            ],
            block_explorer: "https://etherscan.io",
        },
        // ===== TESTNETS =====
        ChainConfig {
            chain_id: 84532,
            name: "base-sepolia",
            identity_registry: Some(address!("8004A818BFB912233c491871b3d84c89A494BD9e")),
            reputation_registry: Some(address!("8004B663056A597Dffe9eCcC1965A193B7388713")),
            validation_registry: None,
            rpcs: vec![
                "https://sepolia.base.org",
                "https://base-sepolia.drpc.org",
                "https://base-sepolia.publicnode.com",
            ],
            block_explorer: "https://sepolia.basescan.org",
        },
        ChainConfig {
            chain_id: 11155111,
            name: "sepolia",
            identity_registry: Some(address!("8004A818BFB912233c491871b3d84c89A494BD9e")),
            reputation_registry: Some(address!("8004B663056A597Dffe9eCcC1965A193B7388713")),
            validation_registry: Some(address!("8004Cb1BF31DAf7788923b405b754f57acEB4272")),
            rpcs: vec![
                "https://sepolia.drpc.org",
                "https://ethereum-sepolia.publicnode.com",
                "https://rpc.ankr.com/eth_sepolia",
            ],
            block_explorer: "https://sepolia.etherscan.io",
        },
    ];

    chains.into_iter().map(|c| (c.chain_id, c)).collect()
});

/// Get chain config by chain ID
pub fn get_chain(chain_id: u64) -> Option<&'static ChainConfig> {
    CHAINS.get(&chain_id)
}

/// Get chain config by name
pub fn get_chain_by_name(name: &str) -> Option<&'static ChainConfig> {
    CHAINS.values().find(|c| c.name == name)
}

/// List all supported chain IDs
pub fn supported_chain_ids() -> Vec<u64> {
    let mut ids: Vec<u64> = CHAINS.keys().copied().collect();
    ids.sort_unstable();
    ids
}

fn rpc_env_key(chain: &ChainConfig) -> String {
    format!("RPC_URL_{}", chain.name.to_uppercase().replace('-', "_"))
}

/// Get RPC URL for a chain, with optional override
/// Checks `var("RPC_URL_{CHAIN_NAME}")` first
pub fn get_rpc_url(chain_id: u64, var: impl Fn(&str) -> Option<String>) -> Option<String> {
    let chain = get_chain(chain_id)?;

    if let Some(url) = var(&rpc_env_key(chain)) {
        return Some(url);
    }

    chain.primary_rpc().map(|s| s.to_string())
}

/// Get all RPC URLs for a chain (env override + defaults)
pub fn get_all_rpcs(chain_id: u64) -> Vec<String> {
    let Some(chain) = get_chain(chain_id) else {
        return vec![];
    };

    let mut rpcs = Vec::new();

    if let Ok(url) = std::env::var(rpc_env_key(chain)) {
        rpcs.push(url);
    }

    rpcs.extend(chain.rpcs.iter().map(|s| s.to_string()));

    rpcs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_base_chain() {
        let chain = get_chain(8453).unwrap();
        assert_eq!(chain.name, "base");
        assert!(chain.has_registry());
        assert_eq!(
            chain.identity_registry,
            Some(address!("8004A169FB4a3325136EB29fA0ceB6D2e539a432"))
        );
        assert!(!chain.has_validation());
    }

    #[test]
    fn test_get_chain_by_name() {
        let chain = get_chain_by_name("ethereum").unwrap();
        assert_eq!(chain.chain_id, 1);
        assert!(get_chain_by_name("solana").is_none());
    }

    #[test]
    fn test_sepolia_has_all_registries() {
        let chain = get_chain(11155111).unwrap();
        assert!(chain.has_registry());
        assert!(chain.reputation_registry.is_some());
        assert!(chain.has_validation());
        assert_eq!(
            chain.tx_url("0xabc"),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
    }

    #[test]
    fn test_rpc_url_override_by_chain_name() {
        let url = get_rpc_url(84532, |key| {
            (key == "RPC_URL_BASE_SEPOLIA").then(|| "http://base-sepolia.local".to_string())
        });
        assert_eq!(url.as_deref(), Some("http://base-sepolia.local"));

        assert_eq!(
            get_rpc_url(84532, |_| None).as_deref(),
            Some("https://sepolia.base.org")
        );
        assert!(get_rpc_url(999_999, |_| Some("http://x".into())).is_none());
    }

    #[test]
    fn test_all_rpcs_include_defaults() {
        let rpcs = get_all_rpcs(84532);
        assert!(rpcs.iter().any(|r| r == "https://sepolia.base.org"));
        assert!(get_all_rpcs(999_999).is_empty());
        assert_eq!(supported_chain_ids(), vec![1, 8453, 84532, 11155111]);
    }
}
