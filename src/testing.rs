//! In-memory adapters for unit tests

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, Log, LogData, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::abi::codec;
use crate::adapters::{sign_message_with, signer_required, BlockchainAdapter};
use crate::ports::{AccountProvider, ReadClient, SendOpts, Signer, TxSender};
use crate::types::{
    BlockInfo, ContractCallResult, Erc8004Error, Result, TxOverrides, TxReceipt, TxRequest,
    TxSendResult,
};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub address: Address,
    pub function: String,
    pub args: Vec<DynSolValue>,
    pub data: Bytes,
    pub is_send: bool,
}

/// Adapter returning queued results and recording every request.
///
/// Sends decode the queued receipt's logs against the call's ABI, like the
/// real adapters do.
pub(crate) struct MockAdapter {
    signer: Option<PrivateKeySigner>,
    chain_id: u64,
    calls: Mutex<Vec<RecordedCall>>,
    call_results: Mutex<VecDeque<Result<Vec<DynSolValue>>>>,
    send_results: Mutex<VecDeque<Result<TxReceipt>>>,
}

impl MockAdapter {
    pub fn read_only() -> Self {
        Self {
            signer: None,
            chain_id: 11155111,
            calls: Mutex::new(Vec::new()),
            call_results: Mutex::new(VecDeque::new()),
            send_results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_signer(signer: PrivateKeySigner) -> Self {
        Self {
            signer: Some(signer),
            ..Self::read_only()
        }
    }

    pub fn push_call(&self, values: Vec<DynSolValue>) {
        self.call_results.lock().unwrap().push_back(Ok(values));
    }

    pub fn push_call_err(&self, err: Erc8004Error) {
        self.call_results.lock().unwrap().push_back(Err(err));
    }

    pub fn push_receipt(&self, logs: Vec<Log>) {
        self.send_results
            .lock()
            .unwrap()
            .push_back(Ok(receipt(B256::repeat_byte(0x11), logs)));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no calls recorded")
    }

    fn record(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
        is_send: bool,
    ) -> Result<()> {
        let data = codec::encode_function_data(abi, function_name, args)?;
        self.calls.lock().unwrap().push(RecordedCall {
            address,
            function: codec::normalize_function_name(function_name).to_string(),
            args: args.to_vec(),
            data,
            is_send,
        });
        Ok(())
    }
}

#[async_trait]
impl BlockchainAdapter for MockAdapter {
    async fn call(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        self.record(address, abi, function_name, args, false)?;
        self.call_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Erc8004Error::BlockchainError("no mocked call".into())))
    }

    async fn send(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        args: &[DynSolValue],
        _overrides: Option<TxOverrides>,
    ) -> Result<ContractCallResult> {
        if self.signer.is_none() {
            return Err(signer_required(function_name));
        }
        self.record(address, abi, function_name, args, true)?;
        let receipt = self
            .send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Erc8004Error::BlockchainError("no mocked send".into())))?;
        let events = codec::decode_logs(abi, &receipt.logs);
        Ok(ContractCallResult::from_receipt(receipt, events))
    }

    fn get_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn get_chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| signer_required("sign_message"))?;
        sign_message_with(signer, message).await
    }

    async fn sign_typed_data(&self, _typed_data: &serde_json::Value) -> Result<Bytes> {
        Err(Erc8004Error::SigningFailed("not supported by mock".into()))
    }
}

/// Account provider with scripted chain state and send outcomes.
pub(crate) struct MockAccountProvider {
    address: Option<Address>,
    pub chain_id: u64,
    pub base_fee: Option<u128>,
    pub gas_price: u128,
    pub code: Bytes,
    pub estimate: u64,
    sent: Mutex<Vec<TxRequest>>,
    send_results: Mutex<VecDeque<Result<TxSendResult>>>,
    call_results: Mutex<VecDeque<Result<Bytes>>>,
}

impl MockAccountProvider {
    pub fn new(address: Option<Address>) -> Self {
        Self {
            address,
            chain_id: 11155111,
            base_fee: None,
            gas_price: 1_000_000_000,
            code: Bytes::new(),
            estimate: 150_000,
            sent: Mutex::new(Vec::new()),
            send_results: Mutex::new(VecDeque::new()),
            call_results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_send_ok(&self, hash: B256) {
        self.send_results
            .lock()
            .unwrap()
            .push_back(Ok(ContractCallResult::from_receipt(receipt(hash, vec![]), vec![])));
    }

    pub fn push_send_logs(&self, logs: Vec<Log>) {
        self.send_results.lock().unwrap().push_back(Ok(ContractCallResult::from_receipt(
            receipt(B256::repeat_byte(0x22), logs),
            vec![],
        )));
    }

    pub fn push_send_err(&self, err: Erc8004Error) {
        self.send_results.lock().unwrap().push_back(Err(err));
    }

    pub fn push_call(&self, output: Bytes) {
        self.call_results.lock().unwrap().push_back(Ok(output));
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReadClient for MockAccountProvider {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn call(&self, _tx: &TxRequest) -> Result<Bytes> {
        self.call_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Erc8004Error::BlockchainError("no mocked call".into())))
    }

    async fn estimate_gas(&self, _tx: &TxRequest, _from: Option<Address>) -> Result<u64> {
        Ok(self.estimate)
    }

    async fn get_gas_price(&self) -> Result<u128> {
        Ok(self.gas_price)
    }

    async fn get_block(&self, number: Option<u64>) -> Result<BlockInfo> {
        Ok(BlockInfo {
            number: number.unwrap_or(100),
            timestamp: 1_700_000_000,
            base_fee_per_gas: self.base_fee,
        })
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<u64> {
        Ok(0)
    }

    async fn get_code(&self, _address: Address) -> Result<Bytes> {
        Ok(self.code.clone())
    }
}

#[async_trait]
impl Signer for MockAccountProvider {
    async fn get_address(&self) -> Result<Address> {
        self.address
            .ok_or_else(|| Erc8004Error::AccountRequired("mock has no account".into()))
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Bytes> {
        Ok(Bytes::from(vec![0u8; 65]))
    }

    async fn sign_typed_data(&self, _typed_data: &serde_json::Value) -> Result<Bytes> {
        Ok(Bytes::from(vec![0u8; 65]))
    }
}

#[async_trait]
impl TxSender for MockAccountProvider {
    async fn send(&self, tx: TxRequest, _opts: SendOpts) -> Result<TxSendResult> {
        self.sent.lock().unwrap().push(tx);
        self.send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Erc8004Error::BlockchainError("no mocked send".into())))
    }
}

impl AccountProvider for MockAccountProvider {}

pub(crate) fn receipt(hash: B256, logs: Vec<Log>) -> TxReceipt {
    TxReceipt {
        transaction_hash: hash,
        block_number: Some(1234),
        status: true,
        gas_used: Some(120_000),
        logs,
    }
}

pub(crate) fn token_topic(id: u64) -> B256 {
    B256::from(U256::from(id).to_be_bytes::<32>())
}

pub(crate) fn raw_log(address: Address, topics: Vec<B256>, data: Vec<u8>) -> Log {
    Log {
        address,
        data: LogData::new_unchecked(topics, Bytes::from(data)),
    }
}
