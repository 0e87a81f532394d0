//! Minimal Ethereum ABI Word Codec
//!
//! Covers what the HTLC contracts need and nothing more:
//! - static 32-byte words (uint256, address, bool, bytes32)
//! - a single dynamic `bytes` value (the revealed secret)
//! - function selectors and event topics (Keccak-256)
//! - `0x` hex helpers used by the JSON-RPC layer

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Size of one ABI word
pub const WORD: usize = 32;

/// ABI decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("data too short: need {needed} bytes, got {got}")]
    ShortData { needed: usize, got: usize },

    #[error("{0} does not fit in 64 bits")]
    Overflow(&'static str),

    #[error("invalid dynamic offset: {0}")]
    InvalidOffset(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("log is missing topic {0}")]
    MissingTopic(usize),
}

// ============================================================================
// Hashing
// ============================================================================

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// 4-byte function selector for a canonical signature, e.g. `orders(bytes32)`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topic0 of an event with the given canonical signature
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_address(address: &H160) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn encode_u256(value: &U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

/// Calldata: selector followed by static words
pub fn encode_call(selector: [u8; 4], words: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + words.len() * WORD);
    data.extend_from_slice(&selector);
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

/// Encode a tuple whose only non-indexed member is one `bytes` value
pub fn encode_single_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut data = Vec::with_capacity(2 * WORD + padded);
    data.extend_from_slice(&encode_u256(&U256::from(WORD)));
    data.extend_from_slice(&encode_u256(&U256::from(bytes.len())));
    data.extend_from_slice(bytes);
    data.resize(2 * WORD + padded, 0);
    data
}

// ============================================================================
// Decoding
// ============================================================================

/// Borrow the `index`-th word of `data`
pub fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index * WORD;
    let end = start + WORD;
    data.get(start..end).ok_or(AbiError::ShortData {
        needed: end,
        got: data.len(),
    })
}

pub fn decode_u256(data: &[u8], index: usize) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(word(data, index)?))
}

pub fn decode_u64(data: &[u8], index: usize, name: &'static str) -> Result<u64, AbiError> {
    u256_to_u64(decode_u256(data, index)?, name)
}

pub fn decode_address(data: &[u8], index: usize) -> Result<H160, AbiError> {
    Ok(H160::from_slice(&word(data, index)?[12..]))
}

pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, AbiError> {
    Ok(word(data, index)?.iter().any(|b| *b != 0))
}

/// Decode a dynamic `bytes` value whose head slot is word `index`
pub fn decode_bytes(data: &[u8], index: usize) -> Result<Vec<u8>, AbiError> {
    let offset = u256_to_u64(decode_u256(data, index)?, "bytes offset")? as usize;
    if offset % WORD != 0 {
        return Err(AbiError::InvalidOffset(offset));
    }

    let len_word = data.get(offset..offset + WORD).ok_or(AbiError::ShortData {
        needed: offset + WORD,
        got: data.len(),
    })?;
    let len = u256_to_u64(U256::from_big_endian(len_word), "bytes length")? as usize;

    let start = offset + WORD;
    data.get(start..start + len)
        .map(<[u8]>::to_vec)
        .ok_or(AbiError::ShortData {
            needed: start + len,
            got: data.len(),
        })
}

pub fn u256_to_u64(value: U256, name: &'static str) -> Result<u64, AbiError> {
    if value > U256::from(u64::MAX) {
        return Err(AbiError::Overflow(name));
    }
    Ok(value.low_u64())
}

// ============================================================================
// Hex helpers
// ============================================================================

/// Decode `0x`-prefixed (or bare) hex
pub fn decode_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_h160(s: &str) -> Result<H160, AbiError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != 20 {
        return Err(AbiError::InvalidLength {
            expected: 20,
            got: bytes.len(),
        });
    }
    Ok(H160::from_slice(&bytes))
}

pub fn parse_h256(s: &str) -> Result<H256, AbiError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != 32 {
        return Err(AbiError::InvalidLength {
            expected: 32,
            got: bytes.len(),
        });
    }
    Ok(H256::from_slice(&bytes))
}

/// Parse a JSON-RPC quantity (`0x1a`)
pub fn parse_quantity(s: &str) -> Result<u64, AbiError> {
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16)
        .map_err(|e| AbiError::InvalidHex(format!("{}: {}", s, e)))
}

/// Format a JSON-RPC quantity
pub fn quantity(n: u64) -> String {
    format!("{:#x}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(
            hex::encode(selector("transferFrom(address,address,uint256)")),
            "23b872dd"
        );
        assert_eq!(
            hex::encode(event_topic("Transfer(address,address,uint256)").as_bytes()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_static_words() {
        let addr = H160::repeat_byte(0xab);
        let data = [encode_address(&addr), encode_u256(&U256::from(42u64))].concat();

        assert_eq!(decode_address(&data, 0).unwrap(), addr);
        assert_eq!(decode_u64(&data, 1, "amount").unwrap(), 42);
        assert!(decode_bool(&data, 1).unwrap());
        assert!(matches!(
            word(&data, 2),
            Err(AbiError::ShortData { needed: 96, got: 64 })
        ));
    }

    #[test]
    fn test_u64_overflow() {
        let data = encode_u256(&U256::MAX);
        assert_eq!(decode_u64(&data, 0, "expiry"), Err(AbiError::Overflow("expiry")));
    }

    #[test]
    fn test_dynamic_bytes() {
        let secret = b"a secret longer than one single abi word!".to_vec();
        let data = encode_single_bytes(&secret);
        assert_eq!(data.len() % WORD, 0);
        assert_eq!(decode_bytes(&data, 0).unwrap(), secret);

        // Truncated tail
        assert!(decode_bytes(&data[..WORD * 2 + 4], 0).is_err());
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(quantity(26), "0x1a");
        assert!(parse_h160("0x1234").is_err());
        let h = parse_h256(&format!("0x{}", "11".repeat(32))).unwrap();
        assert_eq!(h, H256::repeat_byte(0x11));
        assert_eq!(encode_hex(&[0xde, 0xad]), "0xdead");
    }
}
