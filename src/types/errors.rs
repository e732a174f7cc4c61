use alloy::primitives::{B256, U256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Erc8004Error {
    #[error("Signer required: {0}")]
    SignerRequired(String),

    #[error("Account required for signing/sending: {0}")]
    AccountRequired(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not extract {field} from transaction receipt: {reason}")]
    ExtractionFailed { field: &'static str, reason: String },

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedUriScheme(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Unexpected contract output: {0}")]
    UnexpectedOutput(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Metadata fetch failed: {0}")]
    MetadataFetchFailed(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(U256),
}

impl Erc8004Error {
    /// Transport or on-chain failure, as opposed to a local validation,
    /// configuration or ABI problem.
    pub fn is_chain_failure(&self) -> bool {
        matches!(
            self,
            Erc8004Error::BlockchainError(_) | Erc8004Error::Reverted(_)
        )
    }

    /// Contract errors from ERC-721 lookups on an id that was never minted.
    pub(crate) fn is_nonexistent_token(message: &str) -> bool {
        message.contains("NonexistentToken") || message.contains("nonexistent")
    }
}

impl From<reqwest::Error> for Erc8004Error {
    fn from(err: reqwest::Error) -> Self {
        Erc8004Error::MetadataFetchFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Erc8004Error {
    fn from(err: serde_json::Error) -> Self {
        Erc8004Error::InvalidArgument(format!("JSON parse error: {}", err))
    }
}

pub type Result<T, E = Erc8004Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_failure_classification() {
        assert!(Erc8004Error::BlockchainError("execution reverted".into()).is_chain_failure());
        assert!(Erc8004Error::Reverted(B256::ZERO).is_chain_failure());
        assert!(!Erc8004Error::Abi("no overload".into()).is_chain_failure());
        assert!(!Erc8004Error::InvalidArgument("score".into()).is_chain_failure());
    }

    #[test]
    fn test_extraction_error_message() {
        let err = Erc8004Error::ExtractionFailed {
            field: "agentId",
            reason: "Registered or Transfer event not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not extract agentId from transaction receipt: Registered or Transfer event not found"
        );
    }
}
