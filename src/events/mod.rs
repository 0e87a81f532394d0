//! HTLC contract events
//!
//! - `types` - canonical event model and decoding
//! - `watcher` - live multiplexed subscriptions
//! - `backfill` - bounded historical queries

pub mod backfill;
pub mod types;
pub mod watcher;

pub use backfill::query_events_in_range;
pub use types::{EventKind, EventMeta, HtlcEvent};
pub use watcher::{EventStream, EventWatcher};

#[cfg(test)]
pub(crate) mod fixtures {
    use primitive_types::{H160, H256, U256};

    use super::EventKind;
    use crate::evm::abi;
    use crate::evm::reader::RawLog;

    pub fn contract() -> H160 {
        H160::repeat_byte(0xc0)
    }

    fn log(topics: Vec<H256>, data: Vec<u8>, block: u64) -> RawLog {
        RawLog {
            address: contract(),
            topics,
            data,
            block_number: block,
            log_index: 0,
            tx_hash: H256::from_low_u64_be(block),
        }
    }

    pub fn initiated_log(order: H256, amount: U256, expiry: u64, block: u64) -> RawLog {
        let mut data = abi::encode_u256(&amount).to_vec();
        data.extend_from_slice(&abi::encode_u256(&U256::from(expiry)));
        log(
            vec![EventKind::Initiated.topic(), order, H256::repeat_byte(0x5e)],
            data,
            block,
        )
    }

    pub fn redeemed_log(order: H256, secret_hash: H256, secret: &[u8], block: u64) -> RawLog {
        log(
            vec![EventKind::Redeemed.topic(), order, secret_hash],
            abi::encode_single_bytes(secret),
            block,
        )
    }

    pub fn refunded_log(order: H256, block: u64) -> RawLog {
        log(vec![EventKind::Refunded.topic(), order], vec![], block)
    }
}
