//! Esplora API Client
//!
//! HTTP implementation of [`UtxoIndexer`] against an Esplora instance
//! (blockstream.info, mempool.space, or a local electrs).

use async_trait::async_trait;
use reqwest::Client;

use crate::utxo::indexer::{IndexedTx, IndexerError, Utxo, UtxoIndexer};

/// Esplora API endpoints
pub const MAINNET_URL: &str = "https://blockstream.info/api";
pub const TESTNET_URL: &str = "https://blockstream.info/testnet/api";

/// Esplora HTTP client
#[derive(Debug, Clone)]
pub struct EsploraClient {
    client: Client,
    base_url: String,
}

impl EsploraClient {
    /// Create a new client with custom URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client for Bitcoin mainnet
    pub fn new_mainnet() -> Self {
        Self::new(MAINNET_URL)
    }

    /// Create a client for Bitcoin testnet
    pub fn new_testnet() -> Self {
        Self::new(TESTNET_URL)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path listing one page of address transactions
    ///
    /// The first page is `/address/:a/txs` (mempool plus newest confirmed);
    /// later pages continue the confirmed history after `cursor`.
    fn address_txs_url(&self, address: &str, cursor: Option<&str>) -> String {
        match cursor {
            None => format!("{}/address/{}/txs", self.base_url, address),
            Some(last) => format!("{}/address/{}/txs/chain/{}", self.base_url, address, last),
        }
    }
}

#[async_trait]
impl UtxoIndexer for EsploraClient {
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, IndexerError> {
        let url = format!("{}/address/{}/utxo", self.base_url, address);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(IndexerError::AddressNotFound(address.to_string()));
        }

        Ok(resp.json().await?)
    }

    async fn get_tx(&self, txid: &str) -> Result<IndexedTx, IndexerError> {
        let url = format!("{}/tx/{}", self.base_url, txid);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(IndexerError::TxNotFound(txid.to_string()));
        }

        Ok(resp.json().await?)
    }

    async fn get_address_txs(
        &self,
        address: &str,
        cursor: Option<&str>,
    ) -> Result<Vec<IndexedTx>, IndexerError> {
        let url = self.address_txs_url(address, cursor);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(IndexerError::AddressNotFound(address.to_string()));
        }

        Ok(resp.json().await?)
    }

    async fn get_tip_height(&self) -> Result<u64, IndexerError> {
        let url = format!("{}/blocks/tip/height", self.base_url);
        let resp = self.client.get(&url).send().await?;

        let height: u64 = resp
            .text()
            .await?
            .trim()
            .parse()
            .map_err(|e| IndexerError::ParseError(format!("invalid height: {}", e)))?;

        Ok(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_urls() {
        assert_eq!(EsploraClient::new_mainnet().base_url(), MAINNET_URL);
        assert_eq!(EsploraClient::new_testnet().base_url(), TESTNET_URL);
        assert_eq!(
            EsploraClient::new("http://localhost:3002/").base_url(),
            "http://localhost:3002"
        );
    }

    #[test]
    fn test_address_txs_paging_urls() {
        let client = EsploraClient::new("http://esplora");

        assert_eq!(
            client.address_txs_url("bc1qx", None),
            "http://esplora/address/bc1qx/txs"
        );
        assert_eq!(
            client.address_txs_url("bc1qx", Some("ab12")),
            "http://esplora/address/bc1qx/txs/chain/ab12"
        );
    }
}
