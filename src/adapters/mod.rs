//! Fused read/write/sign transport over an Ethereum client library

mod alloy;
mod ethers;

pub use self::alloy::AlloyAdapter;
pub(crate) use self::alloy::{
    apply_overrides, receipt_from_alloy, sign_message_with, sign_typed_data_with,
};
pub use self::ethers::EthersAdapter;

use ::alloy::dyn_abi::DynSolValue;
use ::alloy::json_abi::JsonAbi;
use ::alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::warn;

use crate::abi::codec;
use crate::status::{StatusSink, StatusUpdate};
use crate::types::{ContractCallResult, Erc8004Error, Result, TxOverrides, TxReceipt};

/// Uniform contract I/O used by the domain clients.
///
/// Implementations hold only immutable provider/signer references and may be
/// shared across tasks behind an `Arc`.
#[async_trait]
pub trait BlockchainAdapter: Send + Sync {
    /// Read-only call. `function_name` may carry a signature suffix.
    async fn call(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>>;

    /// Submit a state-changing call and wait for its receipt.
    ///
    /// Fails with [`Erc8004Error::SignerRequired`] before any network I/O when
    /// the adapter is read-only, and with [`Erc8004Error::Reverted`] when the
    /// receipt reports failure.
    async fn send(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
        overrides: Option<TxOverrides>,
    ) -> Result<ContractCallResult>;

    fn encode_function_data(
        &self,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
    ) -> Result<Bytes> {
        codec::encode_function_data(abi, function_name, args)
    }

    /// `None` means the adapter is read-only.
    fn get_address(&self) -> Option<Address>;

    async fn get_chain_id(&self) -> Result<u64>;

    /// EIP-191 personal message signature, 65 bytes `r ‖ s ‖ v`
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    /// EIP-712 signature over a JSON typed-data document
    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<Bytes>;
}

pub(crate) fn signer_required(operation: &str) -> Erc8004Error {
    Erc8004Error::SignerRequired(format!(
        "{} needs a signer; construct the adapter with a wallet",
        operation
    ))
}

/// Shared tail of every send path: revert check, status, log decoding.
pub(crate) fn finish_send(
    abi: &JsonAbi,
    receipt: TxReceipt,
    status: &dyn StatusSink,
) -> Result<ContractCallResult> {
    if !receipt.status {
        warn!("Transaction reverted: {}", receipt.transaction_hash);
        return Err(Erc8004Error::Reverted(receipt.transaction_hash));
    }

    status.update(StatusUpdate::Confirmed {
        hash: receipt.transaction_hash,
        block_number: receipt.block_number,
    });

    let events = codec::decode_logs(abi, &receipt.logs);
    Ok(ContractCallResult::from_receipt(receipt, events))
}
