//! Bitcoin HTLC Script and Funding Address
//!
//! # Script
//!
//! ```text
//! OP_IF
//!     OP_SHA256 <secret_hash> OP_EQUALVERIFY OP_DUP OP_HASH160 <redeemer_pkh>
//! OP_ELSE
//!     <wait_blocks> OP_CHECKSEQUENCEVERIFY OP_DROP OP_DUP OP_HASH160 <initiator_pkh>
//! OP_ENDIF
//! OP_EQUALVERIFY OP_CHECKSIG
//! ```
//!
//! Funds are locked at the P2WSH address of this script.
//!
//! # Spending Paths
//! - **Redeem**: `[sig, redeemer_pubkey, secret, 0x01, script]` (5 items)
//! - **Refund** (after `wait_blocks`): `[sig, initiator_pubkey, <empty>, script]` (4 items)

use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::*;
use bitcoin::script::Builder as ScriptBuilder;
use bitcoin::{Address, CompressedPublicKey, Network, ScriptBuf};

/// Witness items in a redeem spend
pub const REDEEM_WITNESS_ITEMS: usize = 5;

/// Position of the secret in a redeem witness
pub const REDEEM_SECRET_INDEX: usize = 2;

/// Witness items in a refund spend
pub const REFUND_WITNESS_ITEMS: usize = 4;

/// BIP-68 block-based relative locktime ceiling
pub const MAX_WAIT_BLOCKS: u32 = 0xFFFF;

/// Errors for HTLC derivation
#[derive(Debug, thiserror::Error)]
pub enum HtlcError {
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("invalid timelock: {0} blocks (must be 1..=65535)")]
    InvalidTimelock(u32),
}

/// Derived on-chain identity of a UTXO swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtlcScript {
    /// P2WSH witness script
    pub script: ScriptBuf,
    /// Funding address (P2WSH of `script`)
    pub address: Address,
    /// Initiator's P2WPKH address
    pub initiator: String,
    /// Redeemer's P2WPKH address
    pub redeemer: String,
}

/// Which branch of the HTLC an input spends, judged by witness shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendPath {
    Redeem,
    Refund,
    Unknown,
}

impl SpendPath {
    pub fn of(witness: &[String]) -> Self {
        match witness.len() {
            REDEEM_WITNESS_ITEMS => SpendPath::Redeem,
            REFUND_WITNESS_ITEMS => SpendPath::Refund,
            _ => SpendPath::Unknown,
        }
    }
}

/// Hex secret of a redeem witness; `None` for any other witness shape
pub fn redeem_secret_hex(witness: &[String]) -> Option<&str> {
    match SpendPath::of(witness) {
        SpendPath::Redeem => witness.get(REDEEM_SECRET_INDEX).map(String::as_str),
        _ => None,
    }
}

/// Parse a hex-encoded compressed secp256k1 public key
pub fn parse_pubkey(hex_str: &str) -> Result<CompressedPublicKey, HtlcError> {
    let bytes = hex::decode(hex_str).map_err(|_| HtlcError::InvalidKey(hex_str.to_string()))?;
    CompressedPublicKey::from_slice(&bytes).map_err(|_| HtlcError::InvalidKey(hex_str.to_string()))
}

/// Build the HTLC witness script
pub fn build_htlc_script(
    initiator: &CompressedPublicKey,
    redeemer: &CompressedPublicKey,
    secret_hash: &[u8; 32],
    wait_blocks: u32,
) -> Result<ScriptBuf, HtlcError> {
    if wait_blocks == 0 || wait_blocks > MAX_WAIT_BLOCKS {
        return Err(HtlcError::InvalidTimelock(wait_blocks));
    }

    let redeemer_pkh = redeemer.pubkey_hash().to_byte_array();
    let initiator_pkh = initiator.pubkey_hash().to_byte_array();

    Ok(ScriptBuilder::new()
        .push_opcode(OP_IF)
        .push_opcode(OP_SHA256)
        .push_slice(secret_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(redeemer_pkh)
        .push_opcode(OP_ELSE)
        .push_int(wait_blocks as i64)
        .push_opcode(OP_CSV)
        .push_opcode(OP_DROP)
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(initiator_pkh)
        .push_opcode(OP_ENDIF)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script())
}

/// Derive script, funding address and party identities
pub fn derive_htlc(
    network: Network,
    initiator_pubkey: &str,
    redeemer_pubkey: &str,
    secret_hash: &[u8; 32],
    wait_blocks: u32,
) -> Result<HtlcScript, HtlcError> {
    let initiator = parse_pubkey(initiator_pubkey)?;
    let redeemer = parse_pubkey(redeemer_pubkey)?;

    let script = build_htlc_script(&initiator, &redeemer, secret_hash, wait_blocks)?;
    let address = Address::p2wsh(&script, network);

    Ok(HtlcScript {
        address,
        initiator: Address::p2wpkh(&initiator, network).to_string(),
        redeemer: Address::p2wpkh(&redeemer, network).to_string(),
        script,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Compressed encodings of G, 2G and 3G
    pub const KEY_1: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    pub const KEY_2: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
    pub const KEY_3: &str = "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

    #[test]
    fn test_address_is_p2wsh_of_script() {
        let htlc = derive_htlc(Network::Testnet, KEY_1, KEY_2, &[0x42; 32], 144).unwrap();

        assert!(htlc.address.to_string().starts_with("tb1q"));
        assert_eq!(htlc.address.to_string().len(), 62);
        assert_eq!(htlc.address, Address::p2wsh(&htlc.script, Network::Testnet));
        assert!(htlc.initiator.starts_with("tb1q"));
        assert_ne!(htlc.initiator, htlc.redeemer);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0x42; 32], 144).unwrap();
        let b = derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0x42; 32], 144).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_parameter_changes_the_address() {
        let base = derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0x42; 32], 144).unwrap();

        let other_hash = derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0x43; 32], 144).unwrap();
        let other_wait = derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0x42; 32], 145).unwrap();
        let other_party = derive_htlc(Network::Bitcoin, KEY_1, KEY_3, &[0x42; 32], 144).unwrap();
        let swapped = derive_htlc(Network::Bitcoin, KEY_2, KEY_1, &[0x42; 32], 144).unwrap();

        for other in [other_hash, other_wait, other_party, swapped] {
            assert_ne!(base.address, other.address);
        }
    }

    #[test]
    fn test_script_layout() {
        let htlc = derive_htlc(Network::Regtest, KEY_1, KEY_2, &[0x42; 32], 144).unwrap();
        let bytes = htlc.script.as_bytes();

        assert_eq!(bytes[0], OP_IF.to_u8());
        assert_eq!(bytes[1], OP_SHA256.to_u8());
        assert_eq!(bytes[2], 32);
        assert_eq!(&bytes[3..35], &[0x42; 32]);
        assert_eq!(bytes[bytes.len() - 1], OP_CHECKSIG.to_u8());
        assert_eq!(bytes[bytes.len() - 3], OP_ENDIF.to_u8());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            derive_htlc(Network::Bitcoin, "zz", KEY_2, &[0; 32], 144),
            Err(HtlcError::InvalidKey(_))
        ));
        // x-only keys are not compressed keys
        assert!(matches!(
            derive_htlc(Network::Bitcoin, &KEY_1[2..], KEY_2, &[0; 32], 144),
            Err(HtlcError::InvalidKey(_))
        ));
        assert!(matches!(
            derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0; 32], 0),
            Err(HtlcError::InvalidTimelock(0))
        ));
        assert!(matches!(
            derive_htlc(Network::Bitcoin, KEY_1, KEY_2, &[0; 32], 70_000),
            Err(HtlcError::InvalidTimelock(70_000))
        ));
    }

    #[test]
    fn test_spend_path_by_witness_shape() {
        let redeem: Vec<String> = ["sig", "pk", "736563726574", "01", "script"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let refund: Vec<String> = ["sig", "pk", "", "script"].iter().map(|s| s.to_string()).collect();

        assert_eq!(SpendPath::of(&redeem), SpendPath::Redeem);
        assert_eq!(redeem_secret_hex(&redeem), Some("736563726574"));
        assert_eq!(SpendPath::of(&refund), SpendPath::Refund);
        assert_eq!(redeem_secret_hex(&refund), None);
        assert_eq!(redeem_secret_hex(&[]), None);
    }
}
