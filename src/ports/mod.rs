//! Read / sign / send decomposition of chain access
//!
//! [`AccountProvider`] is the combination the domain clients depend on;
//! callers that only need part of it can take the narrower traits.

mod alloy_account;

pub use alloy_account::{AlloyAccountProvider, AlloyAccountProviderConfig};

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::debug;

use crate::status::{StatusSink, StatusUpdate};
use crate::types::{BlockInfo, Erc8004Error, GasFees, Result, TxRequest, TxSendResult};

/// 1.5 gwei
pub const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000;

#[async_trait]
pub trait ReadClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    /// `eth_call` returning the raw output bytes
    async fn call(&self, tx: &TxRequest) -> Result<Bytes>;

    async fn estimate_gas(&self, tx: &TxRequest, from: Option<Address>) -> Result<u64>;

    async fn get_gas_price(&self) -> Result<u128>;

    /// Latest block when `number` is `None`
    async fn get_block(&self, number: Option<u64>) -> Result<BlockInfo>;

    async fn get_transaction_count(&self, address: Address) -> Result<u64>;

    async fn get_code(&self, address: Address) -> Result<Bytes>;
}

#[async_trait]
pub trait Signer: Send + Sync {
    /// Fails with [`Erc8004Error::AccountRequired`] when no account is configured.
    async fn get_address(&self) -> Result<Address>;

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<Bytes>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOpts {
    /// Run `estimate_gas` before submitting
    pub simulate: bool,
}

impl Default for SendOpts {
    fn default() -> Self {
        Self { simulate: true }
    }
}

#[async_trait]
pub trait TxSender: Send + Sync {
    /// Submit and wait for the receipt.
    async fn send(&self, tx: TxRequest, opts: SendOpts) -> Result<TxSendResult>;

    fn status_sink(&self) -> Option<&dyn StatusSink> {
        None
    }

    /// Send each transaction in order, waiting for each receipt.
    ///
    /// Not atomic: on the first failure the error is returned, earlier
    /// transactions stay committed and later ones are never sent. Returns
    /// the last transaction's result.
    async fn send_batch(&self, txs: Vec<TxRequest>, opts: SendOpts) -> Result<TxSendResult> {
        let total = txs.len();
        let mut last = None;

        for (index, tx) in txs.into_iter().enumerate() {
            debug!("Sending batch transaction {}/{} to {}", index + 1, total, tx.to);
            if let Some(sink) = self.status_sink() {
                sink.update(StatusUpdate::BatchStep { index, total });
            }
            last = Some(self.send(tx, opts).await?);
        }

        last.ok_or_else(|| {
            Erc8004Error::InvalidArgument("send_batch needs at least one transaction".to_string())
        })
    }
}

#[async_trait]
pub trait AccountProvider: ReadClient + Signer + TxSender {
    /// Whether the signer address has deployed bytecode (ERC-1271 wallet).
    async fn is_contract_signer(&self) -> Result<bool> {
        let address = self.get_address().await?;
        let code = self.get_code(address).await?;
        Ok(!code.is_empty())
    }
}

/// Fee fields for the next transaction.
///
/// EIP-1559 (`maxFeePerGas = 2 × baseFee + priority`) when the latest block
/// carries a base fee, otherwise the node's legacy gas price.
pub async fn suggest_fees<R>(read: &R, priority_fee: Option<u128>) -> Result<GasFees>
where
    R: ReadClient + ?Sized,
{
    let block = read.get_block(None).await?;

    match block.base_fee_per_gas {
        Some(base_fee) => {
            let priority = priority_fee.unwrap_or(DEFAULT_PRIORITY_FEE);
            Ok(GasFees::Eip1559 {
                max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority),
                max_priority_fee_per_gas: priority,
            })
        }
        None => Ok(GasFees::Legacy {
            gas_price: read.get_gas_price().await?,
        }),
    }
}
