//! UTXO chain side of a swap
//!
//! - `htlc` - script, funding address and witness layout
//! - `indexer` - what the tracker reads from a chain indexer
//! - `swap` - state classification

pub mod htlc;
pub mod indexer;
pub mod swap;

pub use htlc::{derive_htlc, HtlcError, HtlcScript, SpendPath};
pub use indexer::{IndexedTx, IndexerError, TxInput, TxStatus, Utxo, UtxoIndexer};
pub use swap::{UtxoSwap, MAX_FUNDING_OUTPUTS};
