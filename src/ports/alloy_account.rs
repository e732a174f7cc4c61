use alloy::eips::BlockNumberOrTag;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::{AccountProvider, ReadClient, SendOpts, Signer, TxSender};
use crate::adapters::{apply_overrides, receipt_from_alloy, sign_message_with, sign_typed_data_with};
use crate::status::{default_sink, StatusSink, StatusUpdate};
use crate::types::{BlockInfo, ContractCallResult, Erc8004Error, Result, TxRequest, TxSendResult};

pub struct AlloyAccountProviderConfig {
    pub public_client: DynProvider,
    /// Provider carrying the signing wallet; required for `send`
    pub wallet_client: Option<DynProvider>,
    pub account: Option<PrivateKeySigner>,
    pub chain_id: u64,
}

/// [`AccountProvider`] over alloy providers
#[derive(Clone)]
pub struct AlloyAccountProvider {
    public: DynProvider,
    wallet: Option<DynProvider>,
    account: Option<PrivateKeySigner>,
    chain_id: u64,
    status: Arc<dyn StatusSink>,
}

impl AlloyAccountProvider {
    pub fn new(config: AlloyAccountProviderConfig) -> Self {
        Self {
            public: config.public_client,
            wallet: config.wallet_client,
            account: config.account,
            chain_id: config.chain_id,
            status: default_sink(),
        }
    }

    pub fn connect(rpc_url: &str, chain_id: u64, account: Option<PrivateKeySigner>) -> Result<Self> {
        let url = Url::parse(rpc_url)
            .map_err(|e| Erc8004Error::InvalidArgument(format!("Invalid RPC URL: {}", e)))?;

        let public_client = ProviderBuilder::new().connect_http(url.clone()).erased();
        let wallet_client = account.clone().map(|signer| {
            ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url.clone())
                .erased()
        });

        Ok(Self::new(AlloyAccountProviderConfig {
            public_client,
            wallet_client,
            account,
            chain_id,
        }))
    }

    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    fn account(&self) -> Result<&PrivateKeySigner> {
        self.account.as_ref().ok_or_else(|| {
            Erc8004Error::AccountRequired("no account configured on this provider".to_string())
        })
    }

    fn to_request(tx: &TxRequest) -> TransactionRequest {
        let request = TransactionRequest::default()
            .with_to(tx.to)
            .with_input(tx.data.clone());
        apply_overrides(request, &tx.overrides)
    }
}

fn rpc_error(method: &str, e: impl std::fmt::Display) -> Erc8004Error {
    Erc8004Error::BlockchainError(format!("{} failed: {}", method, e))
}

#[async_trait]
impl ReadClient for AlloyAccountProvider {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn call(&self, tx: &TxRequest) -> Result<Bytes> {
        self.public
            .call(Self::to_request(tx))
            .await
            .map_err(|e| rpc_error("eth_call", e))
    }

    async fn estimate_gas(&self, tx: &TxRequest, from: Option<Address>) -> Result<u64> {
        let mut request = Self::to_request(tx);
        if let Some(from) = from {
            request = request.with_from(from);
        }
        self.public
            .estimate_gas(request)
            .await
            .map_err(|e| rpc_error("eth_estimateGas", e))
    }

    async fn get_gas_price(&self) -> Result<u128> {
        self.public
            .get_gas_price()
            .await
            .map_err(|e| rpc_error("eth_gasPrice", e))
    }

    async fn get_block(&self, number: Option<u64>) -> Result<BlockInfo> {
        let tag = number
            .map(BlockNumberOrTag::Number)
            .unwrap_or(BlockNumberOrTag::Latest);

        let block = self
            .public
            .get_block_by_number(tag)
            .await
            .map_err(|e| rpc_error("eth_getBlockByNumber", e))?
            .ok_or_else(|| Erc8004Error::BlockchainError(format!("Block {} not found", tag)))?;

        Ok(BlockInfo {
            number: block.header.number,
            timestamp: block.header.timestamp,
            base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
        })
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.public
            .get_transaction_count(address)
            .await
            .map_err(|e| rpc_error("eth_getTransactionCount", e))
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.public
            .get_code_at(address)
            .await
            .map_err(|e| rpc_error("eth_getCode", e))
    }
}

#[async_trait]
impl Signer for AlloyAccountProvider {
    async fn get_address(&self) -> Result<Address> {
        Ok(self.account()?.address())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        sign_message_with(self.account()?, message).await
    }

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<Bytes> {
        sign_typed_data_with(self.account()?, typed_data).await
    }
}

#[async_trait]
impl TxSender for AlloyAccountProvider {
    async fn send(&self, tx: TxRequest, opts: SendOpts) -> Result<TxSendResult> {
        let wallet = self.wallet.as_ref().ok_or_else(|| {
            Erc8004Error::AccountRequired("sending needs a wallet client".to_string())
        })?;
        let from = self.account.as_ref().map(|a| a.address());

        // A failed simulation is reported but never blocks submission.
        if opts.simulate {
            self.status.update(StatusUpdate::Simulating { to: tx.to });
            match self.estimate_gas(&tx, from).await {
                Ok(gas) => debug!("Simulation of call to {} ok ({} gas)", tx.to, gas),
                Err(e) => {
                    warn!("Simulation of call to {} failed: {}", tx.to, e);
                    self.status.update(StatusUpdate::SimulationFailed {
                        to: tx.to,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut request = Self::to_request(&tx);
        if let Some(from) = from {
            request = request.with_from(from);
        }

        info!("Sending transaction to {} ({} bytes calldata)", tx.to, tx.data.len());
        let pending = wallet
            .send_transaction(request)
            .await
            .map_err(|e| rpc_error("eth_sendTransaction", e))?;

        let hash = *pending.tx_hash();
        self.status.update(StatusUpdate::Submitted { hash });

        let receipt = pending.get_receipt().await.map_err(|e| {
            Erc8004Error::BlockchainError(format!("Failed to get receipt for {}: {}", hash, e))
        })?;
        let receipt = receipt_from_alloy(&receipt);

        if !receipt.status {
            warn!("Transaction reverted: {}", hash);
            return Err(Erc8004Error::Reverted(hash));
        }

        self.status.update(StatusUpdate::Confirmed {
            hash,
            block_number: receipt.block_number,
        });
        Ok(ContractCallResult::from_receipt(receipt, Vec::new()))
    }

    fn status_sink(&self) -> Option<&dyn StatusSink> {
        Some(self.status.as_ref())
    }
}

impl AccountProvider for AlloyAccountProvider {}
