//! Dynamic ABI codec shared by every backend
//!
//! Functions are looked up by bare name and matched against the argument
//! values, so `"register(string)"` and `"register"` resolve to the same
//! overload when called with one string.

use alloy::dyn_abi::{DynSolValue, EventExt, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, Log, B256, U256};
use tracing::trace;

use crate::types::{DecodedEvent, Erc8004Error, Result};

/// `"foo(uint256)"` → `"foo"`
pub fn normalize_function_name(name: &str) -> &str {
    match name.find('(') {
        Some(idx) => name[..idx].trim(),
        None => name.trim(),
    }
}

pub fn resolve_function<'a>(
    abi: &'a JsonAbi,
    function_name: &str,
    args: &[DynSolValue],
) -> Result<&'a Function> {
    let name = normalize_function_name(function_name);
    let overloads = abi
        .function(name)
        .ok_or_else(|| Erc8004Error::Abi(format!("function {} not found in ABI", name)))?;

    overloads
        .iter()
        .find(|f| inputs_match(f, args))
        .ok_or_else(|| {
            Erc8004Error::Abi(format!(
                "no overload of {} accepts {} argument(s) of the given types",
                name,
                args.len()
            ))
        })
}

fn inputs_match(function: &Function, args: &[DynSolValue]) -> bool {
    function.inputs.len() == args.len()
        && function.inputs.iter().zip(args).all(|(param, arg)| {
            param
                .resolve()
                .map(|ty| ty.matches(arg))
                .unwrap_or(false)
        })
}

pub fn encode_call(function: &Function, args: &[DynSolValue]) -> Result<Bytes> {
    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| Erc8004Error::Abi(format!("failed to encode {}: {}", function.name, e)))
}

/// Offline calldata encoding (selector + arguments)
pub fn encode_function_data(
    abi: &JsonAbi,
    function_name: &str,
    args: &[DynSolValue],
) -> Result<Bytes> {
    let function = resolve_function(abi, function_name, args)?;
    encode_call(function, args)
}

pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>> {
    function.abi_decode_output(data).map_err(|e| {
        Erc8004Error::UnexpectedOutput(format!(
            "failed to decode {} output ({} bytes): {}",
            function.name,
            data.len(),
            e
        ))
    })
}

/// Decode every log the ABI knows about.
///
/// Receipts routinely carry logs from other contracts; those are dropped.
pub fn decode_logs(abi: &JsonAbi, logs: &[Log]) -> Vec<DecodedEvent> {
    logs.iter().filter_map(|log| decode_log(abi, log)).collect()
}

pub fn decode_log(abi: &JsonAbi, log: &Log) -> Option<DecodedEvent> {
    let topic0 = log.topics().first()?;
    let event = abi
        .events()
        .find(|e| !e.anonymous && e.selector() == *topic0)?;

    match event.decode_log(&log.data) {
        Ok(decoded) => {
            let mut indexed = decoded.indexed.into_iter();
            let mut body = decoded.body.into_iter();
            let args = event
                .inputs
                .iter()
                .filter_map(|input| {
                    let value = if input.indexed {
                        indexed.next()
                    } else {
                        body.next()
                    }?;
                    Some((input.name.clone(), value))
                })
                .collect();

            Some(DecodedEvent {
                name: event.name.clone(),
                address: log.address,
                args,
            })
        }
        Err(e) => {
            trace!(event = %event.name, error = %e, "skipping undecodable log");
            None
        }
    }
}

/// Unwrap a multi-field result returned as one tuple into positional values.
pub fn flatten_outputs(values: Vec<DynSolValue>) -> Vec<DynSolValue> {
    if values.len() == 1 {
        if let DynSolValue::Tuple(inner) = &values[0] {
            if inner.len() > 1 {
                return inner.clone();
            }
        }
    }
    values
}

// ---------------------------------------------------------------------------
// Argument builders
// ---------------------------------------------------------------------------

pub fn uint256(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

pub fn uint64(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 64)
}

pub fn uint8(value: u8) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 8)
}

pub fn bytes32(value: B256) -> DynSolValue {
    DynSolValue::FixedBytes(value, 32)
}

pub fn string(value: impl Into<String>) -> DynSolValue {
    DynSolValue::String(value.into())
}

pub fn address_array(addresses: &[Address]) -> DynSolValue {
    DynSolValue::Array(addresses.iter().copied().map(DynSolValue::Address).collect())
}

// ---------------------------------------------------------------------------
// Output extractors
// ---------------------------------------------------------------------------

pub fn field<'a>(values: &'a [DynSolValue], index: usize, name: &str) -> Result<&'a DynSolValue> {
    values.get(index).ok_or_else(|| {
        Erc8004Error::UnexpectedOutput(format!(
            "missing field {} (index {}, got {} values)",
            name,
            index,
            values.len()
        ))
    })
}

fn mismatch(name: &str, expected: &str, value: &DynSolValue) -> Erc8004Error {
    Erc8004Error::UnexpectedOutput(format!(
        "field {} should be {}, got {:?}",
        name, expected, value
    ))
}

pub fn expect_uint(value: &DynSolValue, name: &str) -> Result<U256> {
    value
        .as_uint()
        .map(|(v, _)| v)
        .ok_or_else(|| mismatch(name, "an unsigned integer", value))
}

pub fn expect_u64(value: &DynSolValue, name: &str) -> Result<u64> {
    let v = expect_uint(value, name)?;
    u64::try_from(v)
        .map_err(|_| Erc8004Error::UnexpectedOutput(format!("field {} overflows u64: {}", name, v)))
}

pub fn expect_u8(value: &DynSolValue, name: &str) -> Result<u8> {
    let v = expect_uint(value, name)?;
    u8::try_from(v)
        .map_err(|_| Erc8004Error::UnexpectedOutput(format!("field {} overflows u8: {}", name, v)))
}

pub fn expect_address(value: &DynSolValue, name: &str) -> Result<Address> {
    value
        .as_address()
        .ok_or_else(|| mismatch(name, "an address", value))
}

pub fn expect_string(value: &DynSolValue, name: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(name, "a string", value))
}

pub fn expect_bool(value: &DynSolValue, name: &str) -> Result<bool> {
    value.as_bool().ok_or_else(|| mismatch(name, "a bool", value))
}

pub fn expect_b256(value: &DynSolValue, name: &str) -> Result<B256> {
    match value {
        DynSolValue::FixedBytes(word, 32) => Ok(*word),
        other => Err(mismatch(name, "bytes32", other)),
    }
}

pub fn expect_array<'a>(value: &'a DynSolValue, name: &str) -> Result<&'a [DynSolValue]> {
    match value {
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Ok(items),
        other => Err(mismatch(name, "an array", other)),
    }
}

pub fn expect_vec<T>(
    value: &DynSolValue,
    name: &str,
    item: impl Fn(&DynSolValue, &str) -> Result<T>,
) -> Result<Vec<T>> {
    expect_array(value, name)?
        .iter()
        .map(|v| item(v, name))
        .collect()
}

/// First output of a single-return function.
pub fn single<'a>(values: &'a [DynSolValue], function: &str) -> Result<&'a DynSolValue> {
    field(values, 0, function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{identity_registry, IdentityAbi, ERC721_TRANSFER_TOPIC};
    use alloy::primitives::{address, keccak256, LogData};

    #[test]
    fn test_normalize_function_name() {
        assert_eq!(normalize_function_name("register(string)"), "register");
        assert_eq!(
            normalize_function_name("register(string,(string,bytes)[])"),
            "register"
        );
        assert_eq!(normalize_function_name("tokenURI"), "tokenURI");
    }

    #[test]
    fn test_resolve_overload_by_argument_shape() {
        let abi = identity_registry(IdentityAbi::Current).unwrap();

        let none = resolve_function(abi, "register", &[]).unwrap();
        assert!(none.inputs.is_empty());

        let uri_only = resolve_function(abi, "register(string)", &[string("ipfs://x")]).unwrap();
        assert_eq!(uri_only.inputs.len(), 1);

        let metadata = DynSolValue::Array(vec![DynSolValue::Tuple(vec![
            string("name"),
            DynSolValue::Bytes(b"bot".to_vec()),
        ])]);
        let with_meta = resolve_function(abi, "register", &[string("ipfs://x"), metadata]).unwrap();
        assert_eq!(with_meta.inputs.len(), 2);

        let err = resolve_function(abi, "register", &[uint256(U256::from(1))]).unwrap_err();
        assert!(matches!(err, Erc8004Error::Abi(_)));
    }

    #[test]
    fn test_stripped_and_bare_names_encode_identically() {
        let abi = identity_registry(IdentityAbi::Current).unwrap();
        let args = [uint256(U256::from(42))];
        let a = encode_function_data(abi, "ownerOf(uint256)", &args).unwrap();
        let b = encode_function_data(abi, "ownerOf", &args).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[..4], &keccak256("ownerOf(uint256)")[..4]);
        assert_eq!(a.len(), 4 + 32);
    }

    #[test]
    fn test_unknown_function_is_abi_error() {
        let abi = identity_registry(IdentityAbi::Current).unwrap();
        let err = encode_function_data(abi, "burn", &[]).unwrap_err();
        assert!(err.to_string().contains("burn"));
    }

    #[test]
    fn test_decode_logs_skips_foreign_logs() {
        let abi = identity_registry(IdentityAbi::Current).unwrap();
        let registry = address!("8004A818BFB912233c491871b3d84c89A494BD9e");
        let owner = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

        let transfer = Log {
            address: registry,
            data: LogData::new_unchecked(
                vec![
                    ERC721_TRANSFER_TOPIC,
                    Address::ZERO.into_word(),
                    owner.into_word(),
                    B256::from(U256::from(42).to_be_bytes::<32>()),
                ],
                Bytes::new(),
            ),
        };
        let foreign = Log {
            address: Address::repeat_byte(0x11),
            data: LogData::new_unchecked(vec![keccak256("Approval(address,address,uint256)")], Bytes::new()),
        };
        let no_topics = Log {
            address: Address::repeat_byte(0x22),
            data: LogData::new_unchecked(vec![], Bytes::from(vec![1, 2, 3])),
        };

        let events = decode_logs(abi, &[foreign, transfer, no_topics]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Transfer");
        assert_eq!(events[0].address, registry);
        assert_eq!(events[0].arg("from"), Some(&DynSolValue::Address(Address::ZERO)));
        assert_eq!(events[0].arg("to"), Some(&DynSolValue::Address(owner)));
        assert_eq!(
            expect_uint(events[0].arg("tokenId").unwrap(), "tokenId").unwrap(),
            U256::from(42)
        );
    }

    #[test]
    fn test_flatten_outputs() {
        let positional = vec![uint64(3), uint8(80)];
        assert_eq!(flatten_outputs(positional.clone()), positional);

        let tupled = vec![DynSolValue::Tuple(positional.clone())];
        assert_eq!(flatten_outputs(tupled), positional);

        let single_string = vec![string("ipfs://x")];
        assert_eq!(flatten_outputs(single_string.clone()), single_string);
    }

    #[test]
    fn test_extractors() {
        assert_eq!(expect_u8(&uint8(100), "score").unwrap(), 100);
        assert!(expect_u8(&uint256(U256::from(300)), "score").is_err());
        assert!(expect_address(&string("0x"), "owner").is_err());
        assert_eq!(
            expect_vec(&address_array(&[Address::ZERO]), "clients", expect_address).unwrap(),
            vec![Address::ZERO]
        );
        assert!(matches!(
            field(&[], 0, "count").unwrap_err(),
            Erc8004Error::UnexpectedOutput(_)
        ));
    }
}
