//! HTLC Order Records
//!
//! The swapper contract keeps one order record per swap, keyed by
//! `order_id = SHA-256(secret_hash || initiator)`.
//!
//! Two deployed contract generations return the record fields in a different
//! order, and the newer one carries an extra boolean. Records are therefore
//! decoded through a per-layout field table and bound by field name.

use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

use super::abi::{self, AbiError};

/// Canonical signature of the order getter
pub const ORDERS_SIGNATURE: &str = "orders(bytes32)";

/// Derive the order id the contract uses for `(secret_hash, initiator)`
pub fn derive_order_id(secret_hash: &H256, initiator: &H160) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(secret_hash.as_bytes());
    hasher.update(initiator.as_bytes());
    H256::from(<[u8; 32]>::from(hasher.finalize()))
}

/// Calldata for `orders(order_id)`
pub fn orders_calldata(order_id: &H256) -> Vec<u8> {
    abi::encode_call(abi::selector(ORDERS_SIGNATURE), &[order_id.to_fixed_bytes()])
}

/// One on-chain order record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub redeemer: H160,
    pub initiator: H160,
    /// Refund delay in blocks, counted from `initiated_at`
    pub expiry: u64,
    /// Block the order was funded in; 0 when never initiated
    pub initiated_at: u64,
    pub amount: U256,
    pub is_fulfilled: bool,
}

impl OrderRecord {
    pub fn is_initiated(&self) -> bool {
        self.initiated_at != 0
    }
}

/// Named slot of an order tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Redeemer,
    Initiator,
    Expiry,
    InitiatedAt,
    Amount,
    IsFulfilled,
    /// Present in the tuple but not tracked
    Unused,
}

/// Return-tuple layout of a deployed swapper contract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderLayout {
    /// `(isFulfilled, initiator, redeemer, initiatedAt, expiry, amount)`
    #[default]
    Standard,
    /// `(redeemer, initiator, expiry, initiatedAt, amount, isFulfilled, isInstant)`
    Extended,
}

const STANDARD_FIELDS: &[OrderField] = &[
    OrderField::IsFulfilled,
    OrderField::Initiator,
    OrderField::Redeemer,
    OrderField::InitiatedAt,
    OrderField::Expiry,
    OrderField::Amount,
];

const EXTENDED_FIELDS: &[OrderField] = &[
    OrderField::Redeemer,
    OrderField::Initiator,
    OrderField::Expiry,
    OrderField::InitiatedAt,
    OrderField::Amount,
    OrderField::IsFulfilled,
    OrderField::Unused,
];

impl OrderLayout {
    pub fn fields(&self) -> &'static [OrderField] {
        match self {
            OrderLayout::Standard => STANDARD_FIELDS,
            OrderLayout::Extended => EXTENDED_FIELDS,
        }
    }

    /// Word index of `field` in this layout
    pub fn position(&self, field: OrderField) -> Option<usize> {
        self.fields().iter().position(|f| *f == field)
    }

    /// Decode the return data of `orders(bytes32)`
    pub fn decode(&self, data: &[u8]) -> Result<OrderRecord, AbiError> {
        let needed = self.fields().len() * abi::WORD;
        if data.len() < needed {
            return Err(AbiError::ShortData {
                needed,
                got: data.len(),
            });
        }

        let mut record = OrderRecord::default();
        for (index, field) in self.fields().iter().enumerate() {
            match field {
                OrderField::Redeemer => record.redeemer = abi::decode_address(data, index)?,
                OrderField::Initiator => record.initiator = abi::decode_address(data, index)?,
                OrderField::Expiry => record.expiry = abi::decode_u64(data, index, "expiry")?,
                OrderField::InitiatedAt => {
                    record.initiated_at = abi::decode_u64(data, index, "initiatedAt")?
                }
                OrderField::Amount => record.amount = abi::decode_u256(data, index)?,
                OrderField::IsFulfilled => record.is_fulfilled = abi::decode_bool(data, index)?,
                OrderField::Unused => {}
            }
        }

        Ok(record)
    }

    /// Encode a record in this layout (the inverse of [`OrderLayout::decode`])
    pub fn encode(&self, record: &OrderRecord) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.fields().len() * abi::WORD);
        for field in self.fields() {
            let word = match field {
                OrderField::Redeemer => abi::encode_address(&record.redeemer),
                OrderField::Initiator => abi::encode_address(&record.initiator),
                OrderField::Expiry => abi::encode_u256(&U256::from(record.expiry)),
                OrderField::InitiatedAt => abi::encode_u256(&U256::from(record.initiated_at)),
                OrderField::Amount => abi::encode_u256(&record.amount),
                OrderField::IsFulfilled => abi::encode_u256(&U256::from(record.is_fulfilled as u8)),
                OrderField::Unused => [0u8; abi::WORD],
            };
            data.extend_from_slice(&word);
        }
        data
    }
}

impl FromStr for OrderLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "v1" => Ok(OrderLayout::Standard),
            "extended" | "v2" => Ok(OrderLayout::Extended),
            _ => Err(format!("unknown order layout: {}", s)),
        }
    }
}
