use alloy::dyn_abi::eip712::TypedData;
use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::{finish_send, signer_required, BlockchainAdapter};
use crate::abi::codec;
use crate::status::{default_sink, StatusSink, StatusUpdate};
use crate::types::{ContractCallResult, Erc8004Error, Result, TxOverrides, TxReceipt};

/// [`BlockchainAdapter`] over alloy providers.
///
/// Reads go through `public`; writes through `wallet`, which must be built
/// with the same signer as `account`.
#[derive(Clone)]
pub struct AlloyAdapter {
    public: DynProvider,
    wallet: Option<DynProvider>,
    account: Option<PrivateKeySigner>,
    status: Arc<dyn StatusSink>,
}

impl AlloyAdapter {
    pub fn new(
        public: DynProvider,
        wallet: Option<DynProvider>,
        account: Option<PrivateKeySigner>,
    ) -> Self {
        Self {
            public,
            wallet,
            account,
            status: default_sink(),
        }
    }

    /// HTTP providers for `rpc_url`; a wallet provider is built when
    /// `account` is given.
    pub fn connect(rpc_url: &str, account: Option<PrivateKeySigner>) -> Result<Self> {
        let url = Url::parse(rpc_url)
            .map_err(|e| Erc8004Error::InvalidArgument(format!("Invalid RPC URL: {}", e)))?;

        let public = ProviderBuilder::new().connect_http(url.clone()).erased();
        let wallet = account.clone().map(|signer| {
            ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url.clone())
                .erased()
        });

        Ok(Self::new(public, wallet, account))
    }

    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn provider(&self) -> &DynProvider {
        &self.public
    }
}

/// Copy caller-supplied fields onto an alloy request.
pub(crate) fn apply_overrides(mut tx: TransactionRequest, overrides: &TxOverrides) -> TransactionRequest {
    if let Some(value) = overrides.value {
        tx.set_value(value);
    }
    if let Some(gas) = overrides.gas_limit {
        tx.set_gas_limit(gas);
    }
    if let Some(gas_price) = overrides.gas_price {
        tx.set_gas_price(gas_price);
    } else {
        if let Some(max_fee) = overrides.max_fee_per_gas {
            tx.set_max_fee_per_gas(max_fee);
        }
        if let Some(priority) = overrides.max_priority_fee_per_gas {
            tx.set_max_priority_fee_per_gas(priority);
        }
    }
    if let Some(nonce) = overrides.nonce {
        tx.set_nonce(nonce);
    }
    tx
}

pub(crate) fn receipt_from_alloy(receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        status: receipt.status(),
        gas_used: Some(receipt.gas_used),
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect(),
    }
}

pub(crate) async fn sign_message_with(signer: &PrivateKeySigner, message: &[u8]) -> Result<Bytes> {
    let signature = signer
        .sign_message(message)
        .await
        .map_err(|e| Erc8004Error::SigningFailed(e.to_string()))?;
    Ok(Bytes::from(signature.as_bytes().to_vec()))
}

pub(crate) async fn sign_typed_data_with(
    signer: &PrivateKeySigner,
    typed_data: &serde_json::Value,
) -> Result<Bytes> {
    let typed: TypedData = serde_json::from_value(typed_data.clone())
        .map_err(|e| Erc8004Error::InvalidArgument(format!("Invalid EIP-712 typed data: {}", e)))?;
    let signature = signer
        .sign_dynamic_typed_data(&typed)
        .await
        .map_err(|e| Erc8004Error::SigningFailed(e.to_string()))?;
    Ok(Bytes::from(signature.as_bytes().to_vec()))
}

#[async_trait]
impl BlockchainAdapter for AlloyAdapter {
    async fn call(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let function = codec::resolve_function(abi, function_name, args)?;
        let data = codec::encode_call(function, args)?;
        debug!("Calling {} on {}", function.name, address);

        let tx = TransactionRequest::default()
            .with_to(address)
            .with_input(data);
        let output = self.public.call(tx).await.map_err(|e| {
            Erc8004Error::BlockchainError(format!("{} failed: {}", function.name, e))
        })?;

        codec::decode_output(function, &output)
    }

    async fn send(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
        overrides: Option<TxOverrides>,
    ) -> Result<ContractCallResult> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| signer_required(function_name))?;

        let function = codec::resolve_function(abi, function_name, args)?;
        let data = codec::encode_call(function, args)?;

        let mut tx = TransactionRequest::default()
            .with_to(address)
            .with_input(data);
        if let Some(account) = &self.account {
            tx = tx.with_from(account.address());
        }
        if let Some(overrides) = &overrides {
            tx = apply_overrides(tx, overrides);
        }

        info!("Sending {} to {}", function.name, address);
        let pending = wallet.send_transaction(tx).await.map_err(|e| {
            Erc8004Error::BlockchainError(format!("Failed to send {}: {}", function.name, e))
        })?;

        let hash = *pending.tx_hash();
        self.status.update(StatusUpdate::Submitted { hash });

        let receipt = pending.get_receipt().await.map_err(|e| {
            Erc8004Error::BlockchainError(format!("Failed to get receipt for {}: {}", hash, e))
        })?;

        finish_send(abi, receipt_from_alloy(&receipt), self.status.as_ref())
    }

    fn get_address(&self) -> Option<Address> {
        self.account.as_ref().map(|a| a.address())
    }

    async fn get_chain_id(&self) -> Result<u64> {
        self.public
            .get_chain_id()
            .await
            .map_err(|e| Erc8004Error::BlockchainError(format!("eth_chainId failed: {}", e)))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let account = self
            .account
            .as_ref()
            .ok_or_else(|| signer_required("sign_message"))?;
        sign_message_with(account, message).await
    }

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<Bytes> {
        let account = self
            .account
            .as_ref()
            .ok_or_else(|| signer_required("sign_typed_data"))?;
        sign_typed_data_with(account, typed_data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{identity_registry, IdentityAbi};
    use alloy::primitives::{address, U256};
    use alloy::transports::mock::Asserter;

    fn mocked(asserter: &Asserter) -> AlloyAdapter {
        let provider = ProviderBuilder::default()
            .connect_mocked_client(asserter.clone())
            .erased();
        AlloyAdapter::new(provider, None, None)
    }

    #[tokio::test]
    async fn test_call_decodes_output() {
        let asserter = Asserter::new();
        let adapter = mocked(&asserter);
        let abi = identity_registry(IdentityAbi::Current).unwrap();

        let encoded = DynSolValue::Tuple(vec![DynSolValue::String("ipfs://QmAgent".into())])
            .abi_encode_params();
        asserter.push_success(&Bytes::from(encoded));

        let out = adapter
            .call(
                address!("8004A818BFB912233c491871b3d84c89A494BD9e"),
                abi,
                "tokenURI(uint256)",
                &[codec::uint256(U256::from(1))],
            )
            .await
            .unwrap();
        assert_eq!(out, vec![DynSolValue::String("ipfs://QmAgent".into())]);
    }

    #[tokio::test]
    async fn test_read_only_adapter_refuses_writes() {
        let asserter = Asserter::new();
        let adapter = mocked(&asserter);
        let abi = identity_registry(IdentityAbi::Current).unwrap();

        assert_eq!(adapter.get_address(), None);

        let err = adapter
            .send(Address::ZERO, abi, "register", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Erc8004Error::SignerRequired(_)));

        let err = adapter.sign_message(b"hello").await.unwrap_err();
        assert!(err.to_string().contains("Signer required"));
    }

    #[tokio::test]
    async fn test_sign_message_is_65_bytes() {
        let signer = PrivateKeySigner::random();
        let sig = sign_message_with(&signer, b"hello").await.unwrap();
        assert_eq!(sig.len(), 65);
        assert!(sig[64] == 27 || sig[64] == 28);
    }

    #[test]
    fn test_apply_overrides_prefers_legacy_price() {
        let tx = apply_overrides(
            TransactionRequest::default(),
            &TxOverrides {
                gas_price: Some(5),
                max_fee_per_gas: Some(9),
                nonce: Some(2),
                gas_limit: Some(100_000),
                ..Default::default()
            },
        );
        assert_eq!(tx.gas_price, Some(5));
        assert_eq!(tx.max_fee_per_gas, None);
        assert_eq!(tx.nonce, Some(2));
        assert_eq!(tx.gas, Some(100_000));
    }
}
