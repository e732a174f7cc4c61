//! String/bytes conversions for metadata values, tags and scores

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::B256;

use crate::abi::TagType;
use crate::types::{Erc8004Error, Result};

pub const MAX_SCORE: u8 = 100;

pub fn string_to_bytes(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// `0x`-prefixed lowercase hex
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn string_to_hex(value: &str) -> String {
    bytes_to_hex(value.as_bytes())
}

pub fn hex_to_bytes(value: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped)
        .map_err(|e| Erc8004Error::InvalidArgument(format!("Invalid hex string: {}", e)))
}

/// Decode a `bytes` metadata value to text.
///
/// Accepts the raw byte shape as well as a `0x`-prefixed hex string.
pub fn bytes_to_string(value: &DynSolValue) -> Result<String> {
    match value {
        DynSolValue::Bytes(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DynSolValue::String(s) if s.starts_with("0x") => {
            let bytes = hex_to_bytes(s)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        DynSolValue::String(s) => Ok(s.clone()),
        other => Err(Erc8004Error::UnexpectedOutput(format!(
            "expected bytes metadata value, got {:?}",
            other
        ))),
    }
}

/// Encode a tag for the registry's tag representation.
pub fn tag_to_value(tag: &str, tag_type: TagType) -> Result<DynSolValue> {
    match tag_type {
        TagType::String => Ok(DynSolValue::String(tag.to_string())),
        TagType::Bytes32 => {
            let bytes = tag.as_bytes();
            if bytes.len() > 32 {
                return Err(Erc8004Error::InvalidArgument(format!(
                    "Tag '{}' is {} bytes; bytes32 tags hold at most 32",
                    tag,
                    bytes.len()
                )));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(bytes);
            Ok(DynSolValue::FixedBytes(B256::from(word), 32))
        }
    }
}

/// Decode a tag from either representation.
pub fn value_to_tag(value: &DynSolValue) -> Result<String> {
    match value {
        DynSolValue::String(s) => Ok(s.clone()),
        DynSolValue::FixedBytes(word, _) => {
            let end = word
                .iter()
                .rposition(|b| *b != 0)
                .map(|i| i + 1)
                .unwrap_or(0);
            Ok(String::from_utf8_lossy(&word[..end]).into_owned())
        }
        other => Err(Erc8004Error::UnexpectedOutput(format!(
            "expected string or bytes32 tag, got {:?}",
            other
        ))),
    }
}

pub fn validate_score(score: u8, field: &str) -> Result<u8> {
    if score > MAX_SCORE {
        return Err(Erc8004Error::InvalidArgument(format!(
            "{} must be between 0 and {}, got {}",
            field, MAX_SCORE, score
        )));
    }
    Ok(score)
}

/// Range-check an untyped score (CLI input, JSON) before it becomes a `u8`.
pub fn score_from_i64(score: i64, field: &str) -> Result<u8> {
    match u8::try_from(score) {
        Ok(s) => validate_score(s, field),
        Err(_) => Err(Erc8004Error::InvalidArgument(format!(
            "{} must be between 0 and {}, got {}",
            field, MAX_SCORE, score
        ))),
    }
}
