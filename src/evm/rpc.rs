//! EVM JSON-RPC Client
//!
//! Implements [`ContractReader`] with `eth_call`, `eth_blockNumber`,
//! `eth_getBalance` and `eth_getLogs`, and [`EventSource`] by polling
//! `eth_getLogs` over fixed block windows.

use async_trait::async_trait;
use primitive_types::{H160, H256, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::abi;
use super::order::{orders_calldata, OrderLayout, OrderRecord};
use super::range::{BlockWindows, DEFAULT_WINDOW};
use super::reader::{ChainError, ContractReader, EventSource, LogFilter, RawLog, Subscription};

/// Buffered logs per subscription
const SUBSCRIPTION_BUFFER: usize = 256;

/// Default poll interval for log subscriptions
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// JSON-RPC client for one EVM node
#[derive(Debug, Clone)]
pub struct EvmRpcClient {
    client: Client,
    url: String,
    layout: OrderLayout,
    poll_interval: Duration,
    window: u64,
    next_id: Arc<AtomicU64>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Log object as returned by `eth_getLogs`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    log_index: Option<String>,
    transaction_hash: Option<String>,
    #[serde(default)]
    removed: bool,
}

impl RpcLog {
    fn into_raw(self) -> Result<RawLog, ChainError> {
        let block_number = self
            .block_number
            .ok_or_else(|| ChainError::Parse("log without blockNumber".to_string()))?;

        Ok(RawLog {
            address: abi::parse_h160(&self.address)?,
            topics: self
                .topics
                .iter()
                .map(|t| abi::parse_h256(t))
                .collect::<Result<_, _>>()?,
            data: abi::decode_hex(&self.data)?,
            block_number: abi::parse_quantity(&block_number)?,
            log_index: match self.log_index {
                Some(index) => abi::parse_quantity(&index)?,
                None => 0,
            },
            tx_hash: match self.transaction_hash {
                Some(hash) => abi::parse_h256(&hash)?,
                None => H256::zero(),
            },
        })
    }
}

fn into_result<T: DeserializeOwned>(method: &str, resp: RpcResponse) -> Result<T, ChainError> {
    if let Some(err) = resp.error {
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    let result = resp
        .result
        .filter(|v| !v.is_null())
        .ok_or_else(|| ChainError::EmptyResult(method.to_string()))?;

    serde_json::from_value(result).map_err(|e| ChainError::Parse(format!("{}: {}", method, e)))
}

/// `eth_getLogs` filter object
fn filter_params(filter: &LogFilter) -> Value {
    let hex_topic = |t: &H256| Value::String(format!("{:#x}", t));

    let mut topics = vec![if filter.topic0.is_empty() {
        Value::Null
    } else {
        Value::Array(filter.topic0.iter().map(hex_topic).collect())
    }];
    if filter.topic1.is_some() || filter.topic2.is_some() {
        topics.push(filter.topic1.as_ref().map_or(Value::Null, hex_topic));
    }
    if let Some(t) = &filter.topic2 {
        topics.push(hex_topic(t));
    }

    json!({
        "address": format!("{:#x}", filter.address),
        "fromBlock": abi::quantity(filter.from_block),
        "toBlock": filter.to_block.map_or_else(|| "latest".to_string(), abi::quantity),
        "topics": topics,
    })
}

impl EvmRpcClient {
    /// Create a client for `url` reading orders with `layout`
    pub fn new(url: &str, layout: OrderLayout) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            layout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            window: DEFAULT_WINDOW,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Set the subscription poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the block window for subscription catch-up queries
    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn layout(&self) -> OrderLayout {
        self.layout
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        into_result(method, resp)
    }
}

/// Polling log subscription over any [`ContractReader`]
///
/// Each tick reads the tip and walks `[next, min(tip, to_block)]` in windows,
/// forwarding logs in order. The task ends on cancel, once `to_block` has
/// been covered, on the first error, or when the log receiver is dropped.
pub(crate) struct LogPoller<R> {
    reader: R,
    filter: LogFilter,
    poll_interval: Duration,
    window: u64,
}

impl<R: ContractReader + 'static> LogPoller<R> {
    pub(crate) fn new(reader: R, filter: LogFilter, poll_interval: Duration, window: u64) -> Self {
        Self {
            reader,
            filter,
            poll_interval,
            window,
        }
    }

    /// Start polling; dropping the returned subscription stops the task
    pub(crate) fn spawn(self) -> Subscription {
        let (log_tx, log_rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (err_tx, err_rx) = mpsc::channel(1);
        let token = CancellationToken::new();

        tokio::spawn(self.run(log_tx, err_tx, token.clone()));

        Subscription::new(log_rx, err_rx).with_guard(token.drop_guard())
    }

    async fn run(
        self,
        logs: mpsc::Sender<RawLog>,
        errors: mpsc::Sender<ChainError>,
        cancel: CancellationToken,
    ) {
        let filter = &self.filter;
        let mut next = filter.from_block;
        let mut ticker = tokio::time::interval(self.poll_interval);

        'poll: loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let tip = match self.reader.block_number().await {
                Ok(tip) => tip,
                Err(e) => {
                    let _ = errors.send(e).await;
                    break;
                }
            };
            let last = filter.to_block.map_or(tip, |to| to.min(tip));

            for (from, to) in BlockWindows::new(next, last, self.window) {
                match self.reader.get_logs(&filter.bounded(from, to)).await {
                    Ok(batch) => {
                        for log in batch {
                            if logs.send(log).await.is_err() {
                                break 'poll;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = errors.send(e).await;
                        break 'poll;
                    }
                }
                next = to + 1;
            }

            if filter.to_block.is_some_and(|to| next > to) {
                break;
            }
        }

        tracing::debug!(target: "swapwatch::chain", next_block = next, "Log poller stopped");
    }
}

#[async_trait]
impl ContractReader for EvmRpcClient {
    async fn get_order(&self, contract: &H160, order_id: &H256) -> Result<OrderRecord, ChainError> {
        let data = self.call(contract, &orders_calldata(order_id)).await?;
        Ok(self.layout.decode(&data)?)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let hex: String = self.request("eth_blockNumber", json!([])).await?;
        Ok(abi::parse_quantity(&hex)?)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError> {
        let logs: Vec<RpcLog> = self.request("eth_getLogs", json!([filter_params(filter)])).await?;
        logs.into_iter()
            .filter(|log| !log.removed)
            .map(RpcLog::into_raw)
            .collect()
    }

    async fn get_balance(&self, owner: &H160) -> Result<U256, ChainError> {
        let hex: String = self
            .request("eth_getBalance", json!([format!("{:#x}", owner), "latest"]))
            .await?;
        U256::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| ChainError::Parse(format!("balance {}: {:?}", hex, e)))
    }

    async fn call(&self, to: &H160, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let hex: String = self
            .request(
                "eth_call",
                json!([{ "to": format!("{:#x}", to), "data": abi::encode_hex(data) }, "latest"]),
            )
            .await?;
        Ok(abi::decode_hex(&hex)?)
    }
}

#[async_trait]
impl EventSource for EvmRpcClient {
    async fn subscribe(&self, filter: LogFilter) -> Result<Subscription, ChainError> {
        // Fail setup on an unreachable node instead of in the poller
        self.block_number().await?;

        Ok(LogPoller::new(self.clone(), filter, self.poll_interval, self.window).spawn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::reader::MockContractReader;
    use std::sync::Mutex;

    fn poll_log(block: u64) -> RawLog {
        RawLog {
            address: H160::repeat_byte(0xc0),
            topics: vec![H256::repeat_byte(0x01)],
            data: vec![],
            block_number: block,
            log_index: 0,
            tx_hash: H256::from_low_u64_be(block),
        }
    }

    #[tokio::test]
    async fn test_poller_advances_windows_until_to_block() {
        let ticks = Arc::new(AtomicU64::new(0));
        let queried = Arc::new(Mutex::new(Vec::new()));

        let mut reader = MockContractReader::new();
        let tick_count = ticks.clone();
        reader.expect_block_number().returning(move || {
            // Tip moves from 30 to 40 between polls
            Ok(if tick_count.fetch_add(1, Ordering::SeqCst) == 0 { 30 } else { 40 })
        });
        let seen = queried.clone();
        reader.expect_get_logs().returning(move |f: &LogFilter| {
            let from = f.from_block;
            let to = f.to_block.unwrap_or_default();
            seen.lock().unwrap().push((from, to));
            Ok(vec![poll_log(to)])
        });

        let filter = LogFilter::new(H160::repeat_byte(0xc0), 10).to_block(35);
        let mut sub = LogPoller::new(reader, filter, Duration::from_millis(1), 10).spawn();

        let mut blocks = Vec::new();
        while let Some(log) = sub.logs.recv().await {
            blocks.push(log.block_number);
        }

        assert_eq!(blocks, vec![19, 29, 30, 35]);
        assert_eq!(
            *queried.lock().unwrap(),
            vec![(10, 19), (20, 29), (30, 30), (31, 35)]
        );
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(sub.errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_poller_reports_query_error() {
        let mut reader = MockContractReader::new();
        reader.expect_block_number().returning(|| Ok(100));
        reader.expect_get_logs().times(1).returning(|_| {
            Err(ChainError::Rpc {
                code: -32005,
                message: "query returned more than 10000 results".into(),
            })
        });

        let filter = LogFilter::new(H160::zero(), 0);
        let mut sub = LogPoller::new(reader, filter, Duration::from_millis(1), 500).spawn();

        let err = sub.errors.recv().await.unwrap();
        assert!(matches!(err, ChainError::Rpc { code: -32005, .. }));
        assert!(sub.logs.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_subscription_stops_poller() {
        // The task owns the reader; the sender inside it closes when the task ends
        let (alive_tx, mut alive_rx) = mpsc::channel::<()>(1);

        let mut reader = MockContractReader::new();
        reader.expect_block_number().returning(move || {
            let _held = &alive_tx;
            Ok(5)
        });
        reader.expect_get_logs().returning(|_| Ok(vec![]));

        let filter = LogFilter::new(H160::zero(), 0);
        let sub = LogPoller::new(reader, filter, Duration::from_millis(1), 500).spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(sub);

        let ended = tokio::time::timeout(Duration::from_secs(5), alive_rx.recv()).await;
        assert!(matches!(ended, Ok(None)));
    }

    #[test]
    fn test_filter_params_shape() {
        let filter = LogFilter::new(H160::repeat_byte(0x11), 16)
            .to_block(32)
            .topics([H256::repeat_byte(0x01), H256::repeat_byte(0x02)])
            .secret_hash(H256::repeat_byte(0x03));

        let params = filter_params(&filter);
        assert_eq!(params["address"], format!("0x{}", "11".repeat(20)));
        assert_eq!(params["fromBlock"], "0x10");
        assert_eq!(params["toBlock"], "0x20");

        let topics = params["topics"].as_array().unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0].as_array().unwrap().len(), 2);
        assert!(topics[1].is_null());
        assert_eq!(topics[2], format!("0x{}", "03".repeat(32)));
    }

    #[test]
    fn test_open_filter_uses_latest() {
        let params = filter_params(&LogFilter::new(H160::zero(), 0));
        assert_eq!(params["toBlock"], "latest");
        assert_eq!(params["topics"], json!([null]));
    }

    #[test]
    fn test_log_conversion() {
        let log: RpcLog = serde_json::from_value(json!({
            "address": format!("0x{}", "c0".repeat(20)),
            "topics": [format!("0x{}", "01".repeat(32))],
            "data": "0xabcd",
            "blockNumber": "0x2a",
            "logIndex": "0x3",
            "transactionHash": format!("0x{}", "ff".repeat(32)),
            "removed": false
        }))
        .unwrap();

        let raw = log.into_raw().unwrap();
        assert_eq!(raw.address, H160::repeat_byte(0xc0));
        assert_eq!(raw.topics, vec![H256::repeat_byte(0x01)]);
        assert_eq!(raw.data, vec![0xab, 0xcd]);
        assert_eq!(raw.block_number, 42);
        assert_eq!(raw.log_index, 3);
        assert_eq!(raw.tx_hash, H256::repeat_byte(0xff));
    }

    #[test]
    fn test_pending_log_rejected() {
        let log: RpcLog = serde_json::from_value(json!({
            "address": format!("0x{}", "c0".repeat(20)),
            "topics": [],
            "data": "0x",
            "blockNumber": null
        }))
        .unwrap();

        assert!(matches!(log.into_raw(), Err(ChainError::Parse(_))));
    }

    #[test]
    fn test_rpc_error_and_empty_result() {
        let resp: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": -32000, "message": "execution reverted" }
        }))
        .unwrap();
        let err = into_result::<String>("eth_call", resp).unwrap_err();
        assert!(matches!(err, ChainError::Rpc { code: -32000, .. }));

        let resp: RpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert!(matches!(
            into_result::<String>("eth_blockNumber", resp),
            Err(ChainError::EmptyResult(_))
        ));

        let resp: RpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1b4"})).unwrap();
        assert_eq!(into_result::<String>("eth_blockNumber", resp).unwrap(), "0x1b4");
    }
}
