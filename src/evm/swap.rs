//! Account Swap Tracker
//!
//! Classifies an EVM-side swap from the swapper contract's order record and,
//! for the secret, from its `Redeemed` logs.

use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};

use super::order::{derive_order_id, OrderRecord};
use super::range::BlockWindows;
use super::reader::{ContractReader, LogFilter};
use crate::common::error::{Result, SwapError};
use crate::events::{EventKind, HtlcEvent};
use crate::state::{FundingStatus, SwapState};

/// Default number of blocks per secret-scan log query
pub const DEFAULT_SECRET_WINDOW: u64 = 500;

/// Immutable description of one account-chain swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSwap {
    order_id: H256,
    initiator: H160,
    redeemer: H160,
    contract: H160,
    secret_hash: H256,
    amount: U256,
    /// Refund delay in blocks
    expiry: u64,
}

impl AccountSwap {
    pub fn new(
        initiator: H160,
        redeemer: H160,
        contract: H160,
        secret_hash: H256,
        amount: U256,
        expiry: u64,
    ) -> Self {
        Self {
            order_id: derive_order_id(&secret_hash, &initiator),
            initiator,
            redeemer,
            contract,
            secret_hash,
            amount,
            expiry,
        }
    }

    pub fn order_id(&self) -> H256 {
        self.order_id
    }

    pub fn initiator(&self) -> H160 {
        self.initiator
    }

    pub fn redeemer(&self) -> H160 {
        self.redeemer
    }

    pub fn contract(&self) -> H160 {
        self.contract
    }

    pub fn secret_hash(&self) -> H256 {
        self.secret_hash
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn expiry(&self) -> u64 {
        self.expiry
    }

    async fn order(&self, reader: &dyn ContractReader) -> Result<OrderRecord> {
        Ok(reader.get_order(&self.contract, &self.order_id).await?)
    }

    pub async fn query_initiated(&self, reader: &dyn ContractReader) -> Result<FundingStatus> {
        let order = self.order(reader).await?;
        Ok(FundingStatus {
            funded: order.is_initiated(),
            height: order.initiated_at,
        })
    }

    pub async fn query_redeemed(&self, reader: &dyn ContractReader) -> Result<bool> {
        Ok(self.order(reader).await?.is_fulfilled)
    }

    /// Refund window is open and nobody settled the order
    pub async fn query_expired(&self, reader: &dyn ContractReader) -> Result<bool> {
        let order = self.order(reader).await?;
        if order.is_fulfilled || !order.is_initiated() {
            return Ok(false);
        }

        let tip = reader.block_number().await?;
        Ok(is_past_expiry(&order, tip))
    }

    /// Recover the secret from the order's `Redeemed` log
    ///
    /// Scans `[initiated_at, min(tip, initiated_at + expiry)]` in windows of
    /// `window` blocks (default [`DEFAULT_SECRET_WINDOW`]).
    pub async fn query_secret(
        &self,
        reader: &dyn ContractReader,
        window: Option<u64>,
    ) -> Result<Vec<u8>> {
        let order = self.order(reader).await?;
        if !order.is_fulfilled {
            return Err(SwapError::OrderNotFulfilled(self.order_id));
        }

        let tip = reader.block_number().await?;
        self.scan_secret(reader, &order, tip, window.unwrap_or(DEFAULT_SECRET_WINDOW))
            .await
    }

    /// Aggregate the observable state
    ///
    /// A fulfilled order is classified by its settlement log: `Redeemed`
    /// wins whenever it lands, `Refunded` reports `Expired`. Until either log
    /// is visible the order stays `Initiated`.
    pub async fn state(&self, reader: &dyn ContractReader, window: Option<u64>) -> Result<SwapState> {
        let order = self.order(reader).await?;
        if !order.is_initiated() {
            return Ok(SwapState::Unfunded);
        }

        let tip = reader.block_number().await?;

        if order.is_fulfilled {
            let window = window.unwrap_or(DEFAULT_SECRET_WINDOW);
            return match self.scan_settlement(reader, &order, tip, window).await? {
                Some(HtlcEvent::Redeemed { secret, .. }) => Ok(SwapState::Redeemed { secret }),
                Some(_) => Ok(SwapState::Expired {
                    height: order.initiated_at,
                }),
                None => {
                    tracing::warn!(
                        target: "swapwatch::chain",
                        order_id = %format!("{:#x}", self.order_id),
                        tip,
                        "Order fulfilled but no settlement log visible yet"
                    );
                    Ok(SwapState::Initiated {
                        height: order.initiated_at,
                    })
                }
            };
        }

        if is_past_expiry(&order, tip) {
            Ok(SwapState::Expired {
                height: order.initiated_at,
            })
        } else {
            Ok(SwapState::Initiated {
                height: order.initiated_at,
            })
        }
    }

    /// First `Redeemed` or `Refunded` log of this order in `[initiated_at, tip]`
    async fn scan_settlement(
        &self,
        reader: &dyn ContractReader,
        order: &OrderRecord,
        tip: u64,
        window: u64,
    ) -> Result<Option<HtlcEvent>> {
        let filter = LogFilter::new(self.contract, order.initiated_at)
            .topics([EventKind::Redeemed.topic(), EventKind::Refunded.topic()])
            .order_id(self.order_id);

        for (start, end) in BlockWindows::new(order.initiated_at, tip, window) {
            let mut logs = reader.get_logs(&filter.bounded(start, end)).await?;
            logs.sort_by_key(|log| (log.block_number, log.log_index));

            for log in &logs {
                match HtlcEvent::decode(log)? {
                    Some(HtlcEvent::Redeemed { secret_hash, .. }) if secret_hash != self.secret_hash => {}
                    Some(event @ (HtlcEvent::Redeemed { .. } | HtlcEvent::Refunded { .. })) => {
                        return Ok(Some(event))
                    }
                    _ => {}
                }
            }
        }

        Ok(None)
    }

    async fn scan_secret(
        &self,
        reader: &dyn ContractReader,
        order: &OrderRecord,
        tip: u64,
        window: u64,
    ) -> Result<Vec<u8>> {
        let from = order.initiated_at;
        let boundary = order.initiated_at.saturating_add(order.expiry);
        let to = tip.min(boundary);

        let filter = LogFilter::new(self.contract, from)
            .topics([EventKind::Redeemed.topic()])
            .order_id(self.order_id)
            .secret_hash(self.secret_hash);

        for (start, end) in BlockWindows::new(from, to, window) {
            let logs = reader.get_logs(&filter.bounded(start, end)).await?;
            tracing::debug!(
                target: "swapwatch::chain",
                order_id = %format!("{:#x}", self.order_id),
                start,
                end,
                logs = logs.len(),
                "Secret scan window"
            );

            for log in &logs {
                if let Some(HtlcEvent::Redeemed { secret, .. }) = HtlcEvent::decode(log)? {
                    return Ok(secret);
                }
            }
        }

        Err(SwapError::SecretNotFound {
            order_id: self.order_id,
            from,
            to,
            exhausted: to == boundary,
        })
    }
}

fn is_past_expiry(order: &OrderRecord, tip: u64) -> bool {
    tip.saturating_sub(order.initiated_at) >= order.expiry
}
