//! Contract Reader and Event Source Interfaces
//!
//! The account-chain side of the tracker only ever reads: one order record by
//! id, the chain tip, bounded log queries, and live log subscriptions.
//!
//! Implementations:
//! - `EvmRpcClient` - JSON-RPC over HTTP (polling subscriptions)
//! - mocks / fakes in tests

use async_trait::async_trait;
use primitive_types::{H160, H256, U256};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use super::abi::AbiError;
use super::order::OrderRecord;

/// Account-chain client errors
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("empty RPC result for {0}")]
    EmptyResult(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),
}

/// A log entry as returned by the node, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: H160,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: H256,
}

/// Log query / subscription filter
///
/// `topic0` matches any of the listed event topics; `topic1` and `topic2`
/// pin the indexed order id and secret hash when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: H160,
    pub from_block: u64,
    /// `None` leaves the range open (live subscriptions)
    pub to_block: Option<u64>,
    pub topic0: Vec<H256>,
    pub topic1: Option<H256>,
    pub topic2: Option<H256>,
}

impl LogFilter {
    pub fn new(address: H160, from_block: u64) -> Self {
        Self {
            address,
            from_block,
            to_block: None,
            topic0: Vec::new(),
            topic1: None,
            topic2: None,
        }
    }

    pub fn to_block(mut self, to_block: u64) -> Self {
        self.to_block = Some(to_block);
        self
    }

    pub fn topics(mut self, topics: impl IntoIterator<Item = H256>) -> Self {
        self.topic0 = topics.into_iter().collect();
        self
    }

    pub fn order_id(mut self, order_id: H256) -> Self {
        self.topic1 = Some(order_id);
        self
    }

    pub fn secret_hash(mut self, secret_hash: H256) -> Self {
        self.topic2 = Some(secret_hash);
        self
    }

    /// Same filter narrowed to `[from, to]`
    pub fn bounded(&self, from: u64, to: u64) -> Self {
        Self {
            from_block: from,
            to_block: Some(to),
            ..self.clone()
        }
    }

    /// Whether `log` satisfies the topic constraints (range is not checked)
    pub fn matches(&self, log: &RawLog) -> bool {
        let topic_ok = |i: usize, want: &Option<H256>| match want {
            Some(t) => log.topics.get(i) == Some(t),
            None => true,
        };

        log.address == self.address
            && (self.topic0.is_empty()
                || log.topics.first().is_some_and(|t| self.topic0.contains(t)))
            && topic_ok(1, &self.topic1)
            && topic_ok(2, &self.topic2)
    }
}

/// A live log subscription
///
/// `logs` carries matching logs in chain order; a message on `errors` means
/// the subscription is dead. Dropping the subscription stops the producer.
pub struct Subscription {
    pub logs: mpsc::Receiver<RawLog>,
    pub errors: mpsc::Receiver<ChainError>,
    _guard: Option<DropGuard>,
}

impl Subscription {
    pub fn new(logs: mpsc::Receiver<RawLog>, errors: mpsc::Receiver<ChainError>) -> Self {
        Self {
            logs,
            errors,
            _guard: None,
        }
    }

    /// Cancel the guard's token when this subscription is dropped
    pub fn with_guard(mut self, guard: DropGuard) -> Self {
        self._guard = Some(guard);
        self
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("guarded", &self._guard.is_some())
            .finish()
    }
}

/// Read access to the HTLC contract and chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Read one order record by id
    async fn get_order(&self, contract: &H160, order_id: &H256) -> Result<OrderRecord, ChainError>;

    /// Current chain tip
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Bounded log query
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError>;

    /// Native balance of `owner`
    async fn get_balance(&self, owner: &H160) -> Result<U256, ChainError>;

    /// Read-only contract call
    async fn call(&self, to: &H160, data: &[u8]) -> Result<Vec<u8>, ChainError>;
}

/// Live log subscriptions
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Subscribe to logs matching `filter` from `filter.from_block` onwards
    async fn subscribe(&self, filter: LogFilter) -> Result<Subscription, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(address: H160, topics: Vec<H256>) -> RawLog {
        RawLog {
            address,
            topics,
            data: vec![],
            block_number: 1,
            log_index: 0,
            tx_hash: H256::zero(),
        }
    }

    #[test]
    fn test_filter_matching() {
        let contract = H160::repeat_byte(1);
        let topic = H256::repeat_byte(2);
        let order = H256::repeat_byte(3);

        let filter = LogFilter::new(contract, 0).topics([topic]).order_id(order);

        assert!(filter.matches(&log_with(contract, vec![topic, order])));
        assert!(!filter.matches(&log_with(contract, vec![topic, H256::repeat_byte(9)])));
        assert!(!filter.matches(&log_with(H160::repeat_byte(7), vec![topic, order])));
        assert!(!filter.matches(&log_with(contract, vec![])));
    }

    #[test]
    fn test_bounded_keeps_topics() {
        let filter = LogFilter::new(H160::zero(), 0)
            .topics([H256::repeat_byte(1)])
            .secret_hash(H256::repeat_byte(2));

        let narrowed = filter.bounded(10, 20);
        assert_eq!(narrowed.from_block, 10);
        assert_eq!(narrowed.to_block, Some(20));
        assert_eq!(narrowed.topic0, filter.topic0);
        assert_eq!(narrowed.topic2, filter.topic2);
    }
}
