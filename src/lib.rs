//! swapwatch - HTLC Swap State Tracking
//!
//! Observes cross-chain atomic swaps secured by hash time-locked contracts on
//! two chain families and reports what the chains show.
//!
//! ## UTXO chain (Bitcoin family)
//!
//! Funds are locked at the P2WSH address of the HTLC script. [`UtxoSwap`]
//! classifies funding, funders, the redeem secret and refund expiry from an
//! indexer ([`EsploraClient`]).
//!
//! ## Account chain (EVM family)
//!
//! Funds are held in a swapper contract's order record. [`AccountSwap`]
//! classifies the order and recovers the secret from `Redeemed` logs through
//! a [`ContractReader`] ([`EvmRpcClient`]).
//!
//! ## Events
//!
//! [`EventWatcher`] multiplexes live `Initiated` / `Redeemed` / `Refunded`
//! subscriptions; [`query_events_in_range`] backfills a block range. Both
//! yield the same [`HtlcEvent`].
//!
//! Signing and broadcasting stay outside this crate; transfers are described
//! as unsigned [`TransferIntent`]s.

pub mod asset;
pub mod common;
pub mod esplora;
pub mod events;
pub mod evm;
pub mod state;
pub mod utxo;

// Re-exports: swaps and state
pub use evm::AccountSwap;
pub use state::{FundingStatus, SwapState};
pub use utxo::UtxoSwap;

// Re-exports: chain clients
pub use esplora::EsploraClient;
pub use evm::{ContractReader, EventSource, EvmRpcClient};
pub use utxo::UtxoIndexer;

// Re-exports: events
pub use events::{query_events_in_range, EventKind, EventStream, EventWatcher, HtlcEvent};

// Re-exports: assets
pub use asset::{Asset, AssetOps, ChainClients, TransferIntent};

// Re-exports: infrastructure
pub use common::{Result, SwapError, TrackerConfig};

/// Satoshi conversion helpers
pub mod units {
    pub const SATS_PER_BTC: u64 = 100_000_000;

    pub fn sats_to_btc(sats: u64) -> f64 {
        sats as f64 / SATS_PER_BTC as f64
    }

    pub fn format_sats(sats: u64) -> String {
        format!("{} sats ({:.8} BTC)", sats, sats_to_btc(sats))
    }
}
