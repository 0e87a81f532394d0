//! UTXO Indexer Interface
//!
//! What the UTXO swap tracker needs from a chain indexer. The field names
//! follow the Esplora JSON schema so `EsploraClient` can deserialize straight
//! into these types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Indexer errors
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Confirmation status of a transaction or output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
}

impl TxStatus {
    pub fn confirmed_at(height: u64) -> Self {
        Self {
            confirmed: true,
            block_height: Some(height),
        }
    }

    pub fn unconfirmed() -> Self {
        Self::default()
    }

    /// Block height, only when confirmed
    pub fn confirmed_height(&self) -> Option<u64> {
        if self.confirmed {
            self.block_height
        } else {
            None
        }
    }
}

/// Spendable output at an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Value in satoshis
    pub value: u64,
    pub status: TxStatus,
}

/// Output being spent by an input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prevout {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

/// Transaction input with its unlocking witness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub prevout: Option<Prevout>,
    /// Hex-encoded witness stack items
    #[serde(default)]
    pub witness: Vec<String>,
}

impl TxInput {
    /// Address of the output this input spends
    pub fn prevout_address(&self) -> Option<&str> {
        self.prevout.as_ref()?.scriptpubkey_address.as_deref()
    }
}

/// Transaction as seen by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedTx {
    pub txid: String,
    pub vin: Vec<TxInput>,
    pub status: TxStatus,
}

/// Chain indexer used by the UTXO swap tracker
#[async_trait]
pub trait UtxoIndexer: Send + Sync {
    /// All spendable outputs at `address`, confirmed or not
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, IndexerError>;

    /// One transaction with its inputs' prevouts and witnesses
    async fn get_tx(&self, txid: &str) -> Result<IndexedTx, IndexerError>;

    /// One page of transactions touching `address`. `cursor` is the last txid
    /// of the previous page; an empty page ends the listing.
    async fn get_address_txs(
        &self,
        address: &str,
        cursor: Option<&str>,
    ) -> Result<Vec<IndexedTx>, IndexerError>;

    /// Current chain tip height
    async fn get_tip_height(&self) -> Result<u64, IndexerError>;
}
