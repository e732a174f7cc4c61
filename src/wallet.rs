//! Signing key loading
//!
//! Supports two key modes:
//! - `private_key`: Direct private key from PRIVATE_KEY env var
//! - `mnemonic`: Derive from MNEMONIC env var at DERIVATION_INDEX

use alloy::primitives::Address;
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use std::env;
use tracing::info;

/// Key mode for wallet initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMode {
    /// Use PRIVATE_KEY env var directly
    PrivateKey,
    /// Derive from MNEMONIC env var
    Mnemonic,
    /// No key configured
    None,
}

impl KeyMode {
    /// Detect key mode from environment
    pub fn from_env() -> Self {
        Self::detect(
            env::var("KEY_MODE").ok().as_deref(),
            env::var("MNEMONIC").is_ok(),
            env::var("PRIVATE_KEY").is_ok(),
        )
    }

    fn detect(explicit: Option<&str>, has_mnemonic: bool, has_private_key: bool) -> Self {
        if let Some(mode) = explicit {
            match mode.to_lowercase().as_str() {
                "mnemonic" | "hd" => return KeyMode::Mnemonic,
                "private_key" | "privatekey" | "key" => return KeyMode::PrivateKey,
                "none" | "readonly" | "read_only" => return KeyMode::None,
                _ => {} // Fall through to auto-detect
            }
        }

        if has_mnemonic {
            KeyMode::Mnemonic
        } else if has_private_key {
            KeyMode::PrivateKey
        } else {
            KeyMode::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMode::PrivateKey => "private_key",
            KeyMode::Mnemonic => "mnemonic",
            KeyMode::None => "none",
        }
    }
}

/// Wallet configuration derived from environment
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub mode: KeyMode,
    pub private_key: Option<String>,
    pub address: Option<Address>,
}

impl WalletConfig {
    /// Initialize wallet config from environment variables
    ///
    /// Supported env vars:
    /// - `KEY_MODE`: Optional. "mnemonic", "private_key" or "none". Auto-detects if not set.
    /// - `MNEMONIC`: BIP-39 mnemonic phrase (12/24 words). Used when mode=mnemonic.
    /// - `PRIVATE_KEY`: Hex-encoded private key. Used when mode=private_key.
    /// - `DERIVATION_INDEX`: Optional. HD wallet index for mnemonic mode. Default: 0.
    pub fn from_env() -> anyhow::Result<Self> {
        let mode = KeyMode::from_env();

        match mode {
            KeyMode::Mnemonic => {
                let mnemonic = env::var("MNEMONIC")
                    .map_err(|_| anyhow::anyhow!("MNEMONIC env var required for mnemonic mode"))?;

                let index: u32 = env::var("DERIVATION_INDEX")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid DERIVATION_INDEX: {}", e))?;

                let wallet = Self::from_mnemonic(&mnemonic, index)?;
                info!(
                    "Wallet initialized from mnemonic (index: {}, address: {:?})",
                    index, wallet.address
                );
                Ok(wallet)
            }
            KeyMode::PrivateKey => {
                let private_key = env::var("PRIVATE_KEY")
                    .map_err(|_| anyhow::anyhow!("PRIVATE_KEY env var required for private_key mode"))?;

                let wallet = Self::from_private_key(&private_key)?;
                info!("Wallet initialized from private key (address: {:?})", wallet.address);
                Ok(wallet)
            }
            KeyMode::None => {
                info!("No wallet configured (mode: none). Read-only client.");
                Ok(Self::read_only())
            }
        }
    }

    pub fn read_only() -> Self {
        Self {
            mode: KeyMode::None,
            private_key: None,
            address: None,
        }
    }

    pub fn from_private_key(private_key: &str) -> anyhow::Result<Self> {
        let signer = parse_private_key(private_key)?;
        Ok(Self {
            mode: KeyMode::PrivateKey,
            private_key: Some(private_key.to_string()),
            address: Some(signer.address()),
        })
    }

    /// Uses standard Ethereum derivation path: m/44'/60'/0'/0/{index}
    pub fn from_mnemonic(mnemonic: &str, index: u32) -> anyhow::Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(mnemonic)
            .index(index)
            .map_err(|e| anyhow::anyhow!("Invalid derivation index: {}", e))?
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to derive from mnemonic: {}", e))?;

        Ok(Self {
            mode: KeyMode::Mnemonic,
            private_key: Some(format!("0x{}", hex::encode(signer.credential().to_bytes()))),
            address: Some(signer.address()),
        })
    }

    /// Check if signing is available
    pub fn can_sign(&self) -> bool {
        self.private_key.is_some()
    }

    /// Local signer for the alloy backends
    pub fn signer(&self) -> anyhow::Result<Option<PrivateKeySigner>> {
        self.private_key
            .as_deref()
            .map(parse_private_key)
            .transpose()
    }
}

fn parse_private_key(private_key: &str) -> anyhow::Result<PrivateKeySigner> {
    let key = private_key.strip_prefix("0x").unwrap_or(private_key);
    key.parse()
        .map_err(|e| anyhow::anyhow!("Invalid private key: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_from_mnemonic() {
        // Standard test mnemonic (DO NOT USE IN PRODUCTION)
        let mnemonic = "test test test test test test test test test test test junk";
        let wallet = WalletConfig::from_mnemonic(mnemonic, 0).unwrap();

        assert_eq!(wallet.mode, KeyMode::Mnemonic);
        assert_eq!(
            wallet.address,
            Some(address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"))
        );
        assert_eq!(wallet.private_key.as_deref().map(str::len), Some(66));

        let second = WalletConfig::from_mnemonic(mnemonic, 1).unwrap();
        assert_ne!(second.address, wallet.address);
    }

    #[test]
    fn test_from_private_key() {
        let wallet = WalletConfig::from_private_key(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let signer = wallet.signer().unwrap().unwrap();

        assert_eq!(signer.address(), address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(wallet.can_sign());
        assert!(WalletConfig::from_private_key("0xnothex").is_err());
    }

    #[test]
    fn test_read_only_has_no_signer() {
        let wallet = WalletConfig::read_only();
        assert!(!wallet.can_sign());
        assert!(wallet.signer().unwrap().is_none());
    }

    #[test]
    fn test_key_mode_detection() {
        assert_eq!(KeyMode::detect(Some("MNEMONIC"), false, true), KeyMode::Mnemonic);
        assert_eq!(KeyMode::detect(Some("none"), true, true), KeyMode::None);
        assert_eq!(KeyMode::detect(Some("bogus"), false, true), KeyMode::PrivateKey);
        assert_eq!(KeyMode::detect(None, true, true), KeyMode::Mnemonic);
        assert_eq!(KeyMode::detect(None, false, false), KeyMode::None);
        assert_eq!(KeyMode::PrivateKey.as_str(), "private_key");
    }
}
