use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, Log, B256, U256};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer as _};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{
    Eip1559TransactionRequest, TransactionRequest, H160, U256 as EthersU256,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::{finish_send, signer_required, BlockchainAdapter};
use crate::abi::codec;
use crate::status::{default_sink, StatusSink, StatusUpdate};
use crate::types::{ContractCallResult, Erc8004Error, Result, TxOverrides, TxReceipt};

/// [`BlockchainAdapter`] over an ethers-rs middleware stack.
///
/// Writes go through a `SignerMiddleware` built from the same provider and
/// the optional wallet.
pub struct EthersAdapter<M: Middleware> {
    provider: M,
    signer: Option<SignerMiddleware<M, LocalWallet>>,
    wallet: Option<LocalWallet>,
    status: Arc<dyn StatusSink>,
}

impl<M> EthersAdapter<M>
where
    M: Middleware + Clone + 'static,
{
    pub fn new(provider: M, wallet: Option<LocalWallet>) -> Self {
        let signer = wallet
            .clone()
            .map(|w| SignerMiddleware::new(provider.clone(), w));
        Self {
            provider,
            signer,
            wallet,
            status: default_sink(),
        }
    }

    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    fn wallet(&self, operation: &str) -> Result<&LocalWallet> {
        self.wallet.as_ref().ok_or_else(|| signer_required(operation))
    }
}

impl EthersAdapter<Provider<Http>> {
    /// HTTP provider with an optional hex private key bound to `chain_id`.
    pub fn connect(rpc_url: &str, private_key: Option<&str>, chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Erc8004Error::InvalidArgument(format!("Invalid RPC URL: {}", e)))?;

        let wallet = private_key
            .map(|key| {
                key.strip_prefix("0x")
                    .unwrap_or(key)
                    .parse::<LocalWallet>()
                    .map(|w| w.with_chain_id(chain_id))
            })
            .transpose()
            .map_err(|e| Erc8004Error::InvalidArgument(format!("Invalid private key: {}", e)))?;

        Ok(Self::new(provider, wallet))
    }
}

fn to_h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn to_ethers_u256(value: U256) -> EthersU256 {
    EthersU256::from_big_endian(&value.to_be_bytes::<32>())
}

fn build_request(
    to: Address,
    data: Bytes,
    from: Option<H160>,
    overrides: &TxOverrides,
) -> TypedTransaction {
    let data = ethers::types::Bytes::from(data.to_vec());

    if let Some(gas_price) = overrides.gas_price {
        let mut tx = TransactionRequest::new()
            .to(to_h160(to))
            .data(data)
            .gas_price(gas_price);
        if let Some(from) = from {
            tx = tx.from(from);
        }
        if let Some(value) = overrides.value {
            tx = tx.value(to_ethers_u256(value));
        }
        if let Some(gas) = overrides.gas_limit {
            tx = tx.gas(gas);
        }
        if let Some(nonce) = overrides.nonce {
            tx = tx.nonce(nonce);
        }
        tx.into()
    } else {
        let mut tx = Eip1559TransactionRequest::new().to(to_h160(to)).data(data);
        if let Some(from) = from {
            tx = tx.from(from);
        }
        if let Some(value) = overrides.value {
            tx = tx.value(to_ethers_u256(value));
        }
        if let Some(gas) = overrides.gas_limit {
            tx = tx.gas(gas);
        }
        if let Some(max_fee) = overrides.max_fee_per_gas {
            tx = tx.max_fee_per_gas(max_fee);
        }
        if let Some(priority) = overrides.max_priority_fee_per_gas {
            tx = tx.max_priority_fee_per_gas(priority);
        }
        if let Some(nonce) = overrides.nonce {
            tx = tx.nonce(nonce);
        }
        tx.into()
    }
}

fn receipt_from_ethers(receipt: &ethers::types::TransactionReceipt) -> TxReceipt {
    TxReceipt {
        transaction_hash: B256::from(receipt.transaction_hash.0),
        block_number: receipt.block_number.map(|n| n.as_u64()),
        // pre-Byzantium receipts carry no status
        status: receipt.status.map_or(true, |s| s.as_u64() == 1),
        gas_used: receipt.gas_used.map(|g| g.low_u64()),
        logs: receipt
            .logs
            .iter()
            .map(|log| {
                Log::new_unchecked(
                    Address::from_slice(log.address.as_bytes()),
                    log.topics.iter().map(|t| B256::from(t.0)).collect(),
                    Bytes::from(log.data.to_vec()),
                )
            })
            .collect(),
    }
}

#[async_trait]
impl<M> BlockchainAdapter for EthersAdapter<M>
where
    M: Middleware + Clone + 'static,
{
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

        let tx: TypedTransaction = TransactionRequest::new()
            .to(to_h160(address))
            .data(ethers::types::Bytes::from(data.to_vec()))
            .into();
        let output = self.provider.call(&tx, None).await.map_err(|e| {
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
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| signer_required(function_name))?;

        let function = codec::resolve_function(abi, function_name, args)?;
        let data = codec::encode_call(function, args)?;
        let tx = build_request(
            address,
            data,
            Some(signer.address()),
            &overrides.unwrap_or_default(),
        );

        info!("Sending {} to {}", function.name, address);
        let pending = signer.send_transaction(tx, None).await.map_err(|e| {
            Erc8004Error::BlockchainError(format!("Failed to send {}: {}", function.name, e))
        })?;

        let hash = B256::from(pending.tx_hash().0);
        self.status.update(StatusUpdate::Submitted { hash });

        let receipt = pending
            .await
            .map_err(|e| {
                Erc8004Error::BlockchainError(format!("Failed to get receipt for {}: {}", hash, e))
            })?
            .ok_or_else(|| {
                Erc8004Error::BlockchainError(format!("Transaction {} dropped from mempool", hash))
            })?;

        finish_send(abi, receipt_from_ethers(&receipt), self.status.as_ref())
    }

    fn get_address(&self) -> Option<Address> {
        self.wallet
            .as_ref()
            .map(|w| Address::from_slice(w.address().as_bytes()))
    }

    async fn get_chain_id(&self) -> Result<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| Erc8004Error::BlockchainError(format!("eth_chainId failed: {}", e)))?;
        Ok(id.as_u64())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let wallet = self.wallet("sign_message")?;
        let signature = wallet
            .sign_message(message)
            .await
            .map_err(|e| Erc8004Error::SigningFailed(e.to_string()))?;
        Ok(Bytes::from(signature.to_vec()))
    }

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<Bytes> {
        let wallet = self.wallet("sign_typed_data")?;
        let typed: TypedData = serde_json::from_value(typed_data.clone()).map_err(|e| {
            Erc8004Error::InvalidArgument(format!("Invalid EIP-712 typed data: {}", e))
        })?;
        let signature = wallet
            .sign_typed_data(&typed)
            .await
            .map_err(|e| Erc8004Error::SigningFailed(e.to_string()))?;
        Ok(Bytes::from(signature.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{identity_registry, reputation_registry, IdentityAbi, ReputationAbi};
    use crate::adapters::AlloyAdapter;
    use alloy::primitives::address;
    use alloy::providers::{Provider as _, ProviderBuilder};
    use alloy::transports::mock::Asserter;
    use ethers::providers::MockProvider;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn alloy_mocked(asserter: &Asserter) -> AlloyAdapter {
        let provider = ProviderBuilder::default()
            .connect_mocked_client(asserter.clone())
            .erased();
        AlloyAdapter::new(provider, None, None)
    }

    fn ethers_mocked() -> (EthersAdapter<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (EthersAdapter::new(provider, None), mock)
    }

    #[tokio::test]
    async fn test_backends_decode_identical_bytes_identically() {
        let registry = address!("8004A818BFB912233c491871b3d84c89A494BD9e");
        let abi = identity_registry(IdentityAbi::Current).unwrap();
        let args = [codec::uint256(U256::from(7))];
        let encoded = DynSolValue::Tuple(vec![DynSolValue::String("ipfs://QmParity".into())])
            .abi_encode_params();

        let (ethers_adapter, mock) = ethers_mocked();
        mock.push::<ethers::types::Bytes, _>(ethers::types::Bytes::from(encoded.clone()))
            .unwrap();

        let asserter = Asserter::new();
        let alloy_adapter = alloy_mocked(&asserter);
        asserter.push_success(&Bytes::from(encoded));

        let from_ethers = ethers_adapter
            .call(registry, abi, "tokenURI", &args)
            .await
            .unwrap();
        let from_alloy = alloy_adapter
            .call(registry, abi, "tokenURI(uint256)", &args)
            .await
            .unwrap();

        assert_eq!(from_ethers, from_alloy);
        assert_eq!(from_ethers, vec![DynSolValue::String("ipfs://QmParity".into())]);
    }

    #[tokio::test]
    async fn test_multi_output_parity() {
        let registry = Address::repeat_byte(0x42);
        let abi = reputation_registry(ReputationAbi::StringTags).unwrap();
        let args = [
            codec::uint256(U256::from(1)),
            codec::address_array(&[]),
            codec::string(""),
            codec::string(""),
        ];
        let encoded = DynSolValue::Tuple(vec![codec::uint64(3), codec::uint8(88)])
            .abi_encode_params();

        let (ethers_adapter, mock) = ethers_mocked();
        mock.push::<ethers::types::Bytes, _>(ethers::types::Bytes::from(encoded.clone()))
            .unwrap();
        let asserter = Asserter::new();
        let alloy_adapter = alloy_mocked(&asserter);
        asserter.push_success(&Bytes::from(encoded));

        let a = ethers_adapter.call(registry, abi, "getSummary", &args).await.unwrap();
        let b = alloy_adapter.call(registry, abi, "getSummary", &args).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(codec::expect_u8(&a[1], "averageScore").unwrap(), 88);
    }

    #[tokio::test]
    async fn test_signing_without_wallet_fails() {
        let (adapter, _mock) = ethers_mocked();
        assert_eq!(adapter.get_address(), None);

        let err = adapter.sign_message(b"hi").await.unwrap_err();
        assert!(err.to_string().contains("Signer required"));

        let abi = identity_registry(IdentityAbi::Current).unwrap();
        let err = adapter
            .send(Address::ZERO, abi, "register", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Erc8004Error::SignerRequired(_)));
    }

    #[tokio::test]
    async fn test_sign_message_matches_alloy_signer() {
        let (provider, _mock) = Provider::mocked();
        let wallet: LocalWallet = TEST_KEY.parse().unwrap();
        let adapter = EthersAdapter::new(provider, Some(wallet));

        let account: alloy::signers::local::PrivateKeySigner = TEST_KEY.parse().unwrap();
        assert_eq!(adapter.get_address(), Some(account.address()));

        let from_ethers = adapter.sign_message(b"erc8004").await.unwrap();
        let from_alloy = crate::adapters::sign_message_with(&account, b"erc8004")
            .await
            .unwrap();
        assert_eq!(from_ethers, from_alloy);
    }

    #[tokio::test]
    async fn test_sign_typed_data_matches_alloy_signer() {
        let (provider, _mock) = Provider::mocked();
        let wallet: LocalWallet = TEST_KEY.parse().unwrap();
        let adapter = EthersAdapter::new(provider, Some(wallet));
        let account: alloy::signers::local::PrivateKeySigner = TEST_KEY.parse().unwrap();

        let typed_data = serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" }
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!"
            }
        });

        let from_ethers = adapter.sign_typed_data(&typed_data).await.unwrap();
        let from_alloy = crate::adapters::sign_typed_data_with(&account, &typed_data)
            .await
            .unwrap();
        assert_eq!(from_ethers.len(), 65);
        assert_eq!(from_ethers, from_alloy);

        let err = adapter
            .sign_typed_data(&serde_json::json!({ "primaryType": "Mail" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Erc8004Error::InvalidArgument(_)));
    }

    #[test]
    fn test_build_request_fee_modes() {
        let legacy = build_request(
            Address::ZERO,
            Bytes::new(),
            None,
            &TxOverrides {
                gas_price: Some(10),
                ..Default::default()
            },
        );
        assert!(matches!(legacy, TypedTransaction::Legacy(_)));

        let eip1559 = build_request(
            Address::ZERO,
            Bytes::new(),
            None,
            &TxOverrides {
                max_fee_per_gas: Some(30),
                max_priority_fee_per_gas: Some(2),
                value: Some(U256::from(5)),
                ..Default::default()
            },
        );
        match eip1559 {
            TypedTransaction::Eip1559(tx) => {
                assert_eq!(tx.max_fee_per_gas, Some(EthersU256::from(30)));
                assert_eq!(tx.value, Some(EthersU256::from(5)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
