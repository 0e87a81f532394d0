//! Account chain (EVM) side of a swap
//!
//! - `abi` - word codec, selectors, topics, hex
//! - `order` - order ids and record layouts
//! - `reader` - read interfaces the trackers depend on
//! - `rpc` - JSON-RPC implementation of those interfaces
//! - `range` - block windows for log scans
//! - `swap` - state classification and secret recovery

pub mod abi;
pub mod order;
pub mod range;
pub mod reader;
pub mod rpc;
pub mod swap;

pub use order::{derive_order_id, OrderLayout, OrderRecord};
pub use range::BlockWindows;
pub use reader::{ChainError, ContractReader, EventSource, LogFilter, RawLog, Subscription};
pub use rpc::EvmRpcClient;
pub use swap::{AccountSwap, DEFAULT_SECRET_WINDOW};
