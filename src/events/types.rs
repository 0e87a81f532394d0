//! Canonical HTLC Event Model
//!
//! One event type and one decode path, shared by the live watcher, the
//! range backfill and the secret scan.

use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::evm::abi::{self, AbiError};
use crate::evm::reader::RawLog;

pub const INITIATED_SIGNATURE: &str = "Initiated(bytes32,bytes32,uint256,uint256)";
pub const REDEEMED_SIGNATURE: &str = "Redeemed(bytes32,bytes32,bytes)";
pub const REFUNDED_SIGNATURE: &str = "Refunded(bytes32)";

/// The three lifecycle events emitted by a swapper contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Initiated,
    Redeemed,
    Refunded,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Initiated, EventKind::Redeemed, EventKind::Refunded];

    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::Initiated => INITIATED_SIGNATURE,
            EventKind::Redeemed => REDEEMED_SIGNATURE,
            EventKind::Refunded => REFUNDED_SIGNATURE,
        }
    }

    pub fn topic(&self) -> H256 {
        abi::event_topic(self.signature())
    }

    /// Classify a topic0; `None` for foreign events
    pub fn from_topic(topic: &H256) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.topic() == *topic)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiated => write!(f, "initiated"),
            Self::Redeemed => write!(f, "redeemed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// Fields every event carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub order_id: H256,
    pub tx_hash: H256,
    pub block_number: u64,
}

/// A normalized swap lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HtlcEvent {
    Initiated {
        #[serde(flatten)]
        meta: EventMeta,
        amount: U256,
        /// Refund delay in blocks
        expiry: u64,
    },
    Redeemed {
        #[serde(flatten)]
        meta: EventMeta,
        #[serde(with = "hex_bytes")]
        secret: Vec<u8>,
        secret_hash: H256,
    },
    Refunded {
        #[serde(flatten)]
        meta: EventMeta,
    },
}

impl HtlcEvent {
    /// Decode a raw log. `Ok(None)` when the log is not an HTLC event.
    pub fn decode(log: &RawLog) -> Result<Option<Self>, AbiError> {
        let kind = match log.topics.first().and_then(EventKind::from_topic) {
            Some(kind) => kind,
            None => return Ok(None),
        };

        let meta = EventMeta {
            order_id: *log.topics.get(1).ok_or(AbiError::MissingTopic(1))?,
            tx_hash: log.tx_hash,
            block_number: log.block_number,
        };

        let event = match kind {
            EventKind::Initiated => HtlcEvent::Initiated {
                meta,
                amount: abi::decode_u256(&log.data, 0)?,
                expiry: abi::decode_u64(&log.data, 1, "expiry")?,
            },
            EventKind::Redeemed => HtlcEvent::Redeemed {
                meta,
                secret: abi::decode_bytes(&log.data, 0)?,
                secret_hash: *log.topics.get(2).ok_or(AbiError::MissingTopic(2))?,
            },
            EventKind::Refunded => HtlcEvent::Refunded { meta },
        };

        Ok(Some(event))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            HtlcEvent::Initiated { .. } => EventKind::Initiated,
            HtlcEvent::Redeemed { .. } => EventKind::Redeemed,
            HtlcEvent::Refunded { .. } => EventKind::Refunded,
        }
    }

    pub fn meta(&self) -> &EventMeta {
        match self {
            HtlcEvent::Initiated { meta, .. }
            | HtlcEvent::Redeemed { meta, .. }
            | HtlcEvent::Refunded { meta } => meta,
        }
    }

    pub fn order_id(&self) -> H256 {
        self.meta().order_id
    }

    pub fn block_number(&self) -> u64 {
        self.meta().block_number
    }

    /// Revealed secret, for redeem events
    pub fn secret(&self) -> Option<&[u8]> {
        match self {
            HtlcEvent::Redeemed { secret, .. } => Some(secret),
            _ => None,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::evm::abi::encode_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::evm::abi::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}
