//! UTXO Swap Tracker
//!
//! Classifies a Bitcoin-family HTLC swap from indexer data: funded, who
//! funded it, whether the redeemer revealed the secret, and whether the
//! refund path has opened.

use bitcoin::{Address, Network, ScriptBuf};
use std::collections::BTreeSet;

use super::htlc::{self, HtlcScript, SpendPath};
use super::indexer::{IndexedTx, TxInput, UtxoIndexer};
use crate::common::error::{Result, SwapError};
use crate::state::{FundingStatus, SwapState};

/// A funding address with more outputs than this is rejected
pub const MAX_FUNDING_OUTPUTS: usize = 3;

/// Immutable description of one UTXO-side swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoSwap {
    network: Network,
    /// Amount in satoshis
    amount: u64,
    secret: Option<Vec<u8>>,
    secret_hash: [u8; 32],
    wait_blocks: u32,
    htlc: HtlcScript,
}

impl UtxoSwap {
    /// Derive the swap from the two parties' compressed public keys (hex)
    pub fn new(
        network: Network,
        initiator_pubkey: &str,
        redeemer_pubkey: &str,
        amount: u64,
        secret_hash: [u8; 32],
        wait_blocks: u32,
    ) -> Result<Self> {
        let htlc = htlc::derive_htlc(
            network,
            initiator_pubkey,
            redeemer_pubkey,
            &secret_hash,
            wait_blocks,
        )?;

        Ok(Self {
            network,
            amount,
            secret: None,
            secret_hash,
            wait_blocks,
            htlc,
        })
    }

    /// Same swap with a known secret
    pub fn with_secret(self, secret: Vec<u8>) -> Self {
        Self {
            secret: Some(secret),
            ..self
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref()
    }

    pub fn secret_hash(&self) -> &[u8; 32] {
        &self.secret_hash
    }

    pub fn wait_blocks(&self) -> u32 {
        self.wait_blocks
    }

    pub fn funding_address(&self) -> &Address {
        &self.htlc.address
    }

    pub fn script(&self) -> &ScriptBuf {
        &self.htlc.script
    }

    pub fn initiator(&self) -> &str {
        &self.htlc.initiator
    }

    pub fn redeemer(&self) -> &str {
        &self.htlc.redeemer
    }

    pub fn is_initiated_by(&self, address: &str) -> bool {
        self.htlc.initiator == address
    }

    pub fn is_redeemed_by(&self, address: &str) -> bool {
        self.htlc.redeemer == address
    }

    /// Check whether the funding address holds at least `amount` confirmed
    pub async fn query_funded(&self, indexer: &dyn UtxoIndexer) -> Result<FundingStatus> {
        let address = self.funding_address().to_string();
        let utxos = indexer.get_utxos(&address).await?;

        // Unconfirmed outputs count toward the limit too
        if utxos.len() > MAX_FUNDING_OUTPUTS {
            return Err(SwapError::TooManyFundingOutputs {
                count: utxos.len(),
                max: MAX_FUNDING_OUTPUTS,
            });
        }

        let mut total: u64 = 0;
        let mut height: u64 = 0;
        for utxo in &utxos {
            if let Some(h) = utxo.status.confirmed_height() {
                total = total.saturating_add(utxo.value);
                height = height.max(h);
            }
        }

        let funded = total >= self.amount;
        tracing::debug!(
            target: "swapwatch::swap",
            address = %address,
            total,
            amount = self.amount,
            funded,
            "Funding checked"
        );

        Ok(FundingStatus { funded, height })
    }

    /// Addresses whose outputs were spent into the confirmed funding outputs
    pub async fn query_funders(&self, indexer: &dyn UtxoIndexer) -> Result<BTreeSet<String>> {
        let mut funders = BTreeSet::new();

        if !self.query_funded(indexer).await?.funded {
            return Ok(funders);
        }

        let utxos = indexer.get_utxos(&self.funding_address().to_string()).await?;
        for utxo in utxos.iter().filter(|u| u.status.confirmed) {
            let tx = indexer.get_tx(&utxo.txid).await?;
            funders.extend(
                tx.vin
                    .iter()
                    .filter_map(|input| input.prevout_address())
                    .map(str::to_string),
            );
        }

        Ok(funders)
    }

    /// Find the secret revealed by a redeem spend of the funding address
    ///
    /// Returns the carried secret without any indexer call when the swap
    /// already knows it.
    pub async fn query_redeemed(&self, indexer: &dyn UtxoIndexer) -> Result<Option<Vec<u8>>> {
        if let Some(secret) = &self.secret {
            return Ok(Some(secret.clone()));
        }

        self.find_spend(indexer, |tx, input| match htlc::redeem_secret_hex(&input.witness) {
            Some(secret_hex) => hex::decode(secret_hex)
                .map(Some)
                .map_err(|e| SwapError::CorruptSecret {
                    txid: tx.txid.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        })
        .await
    }

    /// Confirmation height of the funding output taken back by a refund spend
    ///
    /// `None` while no refund of the funding address is visible.
    pub async fn query_refunded(&self, indexer: &dyn UtxoIndexer) -> Result<Option<u64>> {
        let refund = self
            .find_spend(indexer, |_, input| match SpendPath::of(&input.witness) {
                SpendPath::Refund => Ok(Some(input.txid.clone())),
                _ => Ok(None),
            })
            .await?;

        let Some(funding_txid) = refund else {
            return Ok(None);
        };

        let funding_tx = indexer.get_tx(&funding_txid).await?;
        Ok(Some(funding_tx.status.confirmed_height().unwrap_or(0)))
    }

    /// Page through the address history until `visit` yields a value for an
    /// input spending the funding address
    async fn find_spend<T>(
        &self,
        indexer: &dyn UtxoIndexer,
        mut visit: impl FnMut(&IndexedTx, &TxInput) -> Result<Option<T>> + Send,
    ) -> Result<Option<T>> {
        let address = self.funding_address().to_string();
        let mut cursor: Option<String> = None;

        loop {
            let page = indexer.get_address_txs(&address, cursor.as_deref()).await?;
            let Some(last) = page.last() else {
                return Ok(None);
            };

            for tx in &page {
                for input in &tx.vin {
                    if input.prevout_address() != Some(address.as_str()) {
                        continue;
                    }
                    if let Some(found) = visit(tx, input)? {
                        return Ok(Some(found));
                    }
                }
            }

            // An indexer that repeats its last page would loop forever
            if cursor.as_deref() == Some(last.txid.as_str()) {
                return Ok(None);
            }
            cursor = Some(last.txid.clone());
        }
    }

    /// Whether any confirmed funding output is at least `wait_blocks` deep
    pub async fn query_expired(&self, indexer: &dyn UtxoIndexer) -> Result<bool> {
        let tip = indexer.get_tip_height().await?;
        let utxos = indexer.get_utxos(&self.funding_address().to_string()).await?;

        Ok(utxos.iter().any(|utxo| {
            utxo.status
                .confirmed_height()
                .is_some_and(|h| tip.saturating_sub(h) >= self.wait_blocks as u64)
        }))
    }

    /// Aggregate the observable state
    ///
    /// A revealed secret wins over expiry. A refunded swap has emptied its
    /// funding address and is reported as `Expired`, not `Unfunded`.
    pub async fn state(&self, indexer: &dyn UtxoIndexer) -> Result<SwapState> {
        if let Some(secret) = self.query_redeemed(indexer).await? {
            return Ok(SwapState::Redeemed { secret });
        }

        let funding = self.query_funded(indexer).await?;
        if !funding.funded {
            return match self.query_refunded(indexer).await? {
                Some(height) => Ok(SwapState::Expired { height }),
                None => Ok(SwapState::Unfunded),
            };
        }

        if self.query_expired(indexer).await? {
            Ok(SwapState::Expired {
                height: funding.height,
            })
        } else {
            Ok(SwapState::Initiated {
                height: funding.height,
            })
        }
    }
}
