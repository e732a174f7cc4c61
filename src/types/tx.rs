use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, Log, B256, U256};
use serde::{Deserialize, Serialize};

/// Optional transaction fields applied on top of the encoded call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
}

impl TxOverrides {
    /// Legacy pricing wins when a gas price is set.
    pub fn is_legacy(&self) -> bool {
        self.gas_price.is_some()
    }
}

/// A fully encoded transaction ready for a [`crate::TxSender`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub overrides: TxOverrides,
}

impl TxRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            overrides: TxOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: TxOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Receipt stripped of library-specific types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub status: bool,
    pub gas_used: Option<u64>,
    pub logs: Vec<Log>,
}

/// A receipt log decoded against a known ABI
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub address: Address,
    pub args: Vec<(String, DynSolValue)>,
}

impl DecodedEvent {
    pub fn arg(&self, name: &str) -> Option<&DynSolValue> {
        self.args
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value)
    }
}

/// Uniform result of every write, whichever backend submitted it
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCallResult {
    pub hash: B256,
    pub block_number: Option<u64>,
    pub receipt: Option<TxReceipt>,
    pub events: Vec<DecodedEvent>,
}

pub type TxSendResult = ContractCallResult;

impl ContractCallResult {
    pub fn from_receipt(receipt: TxReceipt, events: Vec<DecodedEvent>) -> Self {
        Self {
            hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            receipt: Some(receipt),
            events,
        }
    }

    pub fn raw_logs(&self) -> &[Log] {
        self.receipt
            .as_ref()
            .map(|r| r.logs.as_slice())
            .unwrap_or_default()
    }

    pub fn find_event(&self, name: &str) -> Option<&DecodedEvent> {
        self.events.iter().find(|e| e.name == name)
    }
}

/// One unsigned call inside a [`PreparedCall`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTx {
    pub to: Address,
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

/// Serializable, secret-free description of calls to be signed elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCall {
    pub chain_id: u64,
    pub calls: Vec<PreparedTx>,
}

impl PreparedCall {
    pub fn single(chain_id: u64, to: Address, data: Bytes) -> Self {
        Self {
            chain_id,
            calls: vec![PreparedTx {
                to,
                data,
                value: None,
            }],
        }
    }

    pub fn into_requests(self) -> Vec<TxRequest> {
        self.calls
            .into_iter()
            .map(|call| TxRequest {
                to: call.to,
                data: call.data,
                overrides: TxOverrides {
                    value: call.value,
                    ..Default::default()
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
    pub base_fee_per_gas: Option<u128>,
}

/// Fee fields suggested for the next transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasFees {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl GasFees {
    pub fn apply(self, mut overrides: TxOverrides) -> TxOverrides {
        match self {
            GasFees::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                overrides.gas_price = None;
                overrides.max_fee_per_gas = Some(max_fee_per_gas);
                overrides.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
            }
            GasFees::Legacy { gas_price } => {
                overrides.gas_price = Some(gas_price);
                overrides.max_fee_per_gas = None;
                overrides.max_priority_fee_per_gas = None;
            }
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepared_call_serializes_without_secrets() {
        let to: Address = "0x8004A818BFB912233c491871b3d84c89A494BD9e".parse().unwrap();
        let call = PreparedCall::single(11155111, to, Bytes::from(vec![0xde, 0xad]));

        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["chainId"], 11155111);
        assert_eq!(json["calls"][0]["data"], "0xdead");
        assert!(json["calls"][0].get("value").is_none());

        let back: PreparedCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);

        let requests = back.into_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].to, to);
        assert_eq!(requests[0].overrides, TxOverrides::default());
    }

    #[test]
    fn test_gas_fees_apply() {
        let base = TxOverrides {
            gas_price: Some(7),
            nonce: Some(3),
            ..Default::default()
        };

        let eip1559 = GasFees::Eip1559 {
            max_fee_per_gas: 21,
            max_priority_fee_per_gas: 1,
        }
        .apply(base.clone());
        assert!(!eip1559.is_legacy());
        assert_eq!(eip1559.max_fee_per_gas, Some(21));
        assert_eq!(eip1559.nonce, Some(3));

        let legacy = GasFees::Legacy { gas_price: 9 }.apply(eip1559);
        assert!(legacy.is_legacy());
        assert_eq!(legacy.gas_price, Some(9));
        assert_eq!(legacy.max_priority_fee_per_gas, None);
    }
}
