//! Live HTLC Event Watcher
//!
//! Opens one log subscription per event kind on the asset's swapper contract
//! and multiplexes them into a single stream of [`HtlcEvent`]s.
//!
//! The session ends when any of these happens:
//! - the cancellation token fires
//! - a subscription reports an error
//! - a subscription's log channel closes
//! - the consumer drops the stream
//!
//! Delivery is at-most-once; a restarted watcher replays from `start_block`.

use primitive_types::H160;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::asset::Asset;
use crate::common::error::Result;
use crate::common::logging::{self, EventCategory};
use crate::evm::reader::{ChainError, EventSource, LogFilter, RawLog, Subscription};

use super::types::{EventKind, HtlcEvent};

/// Receiving end of a watch session
pub type EventStream = mpsc::Receiver<HtlcEvent>;

/// Default stream buffer
const DEFAULT_BUFFER: usize = 64;

/// Watches swapper contracts through an [`EventSource`]
#[derive(Clone)]
pub struct EventWatcher {
    source: Arc<dyn EventSource>,
    buffer: usize,
}

impl EventWatcher {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            buffer: DEFAULT_BUFFER,
        }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Start a watch session from `start_block`
    ///
    /// Fails immediately for assets without a swapper contract. Subscription
    /// setup happens in the spawned session; if it fails the stream closes
    /// without yielding anything.
    pub fn watch(
        &self,
        cancel: CancellationToken,
        start_block: u64,
        asset: &Asset,
    ) -> Result<EventStream> {
        let swapper = asset.swapper_address()?;
        let (tx, rx) = mpsc::channel(self.buffer);

        let session = WatchSession {
            id: logging::generate_correlation_id(),
            source: self.source.clone(),
            swapper,
            start_block,
        };
        tokio::spawn(session.run(tx, cancel));

        Ok(rx)
    }
}

struct WatchSession {
    id: String,
    source: Arc<dyn EventSource>,
    swapper: H160,
    start_block: u64,
}

/// Why a session ended
#[derive(Debug)]
enum StopReason {
    Cancelled,
    ConsumerGone,
    SinkClosed(EventKind),
    SubscriptionError(EventKind, ChainError),
}

impl WatchSession {
    fn filter(&self, kind: EventKind) -> LogFilter {
        LogFilter::new(self.swapper, self.start_block).topics([kind.topic()])
    }

    async fn run(self, tx: mpsc::Sender<HtlcEvent>, cancel: CancellationToken) {
        logging::log_system_event(
            "watch started",
            &self.id,
            serde_json::json!({
                "swapper": format!("{:#x}", self.swapper),
                "start_block": self.start_block,
            }),
        );

        let subscriptions = tokio::try_join!(
            self.source.subscribe(self.filter(EventKind::Initiated)),
            self.source.subscribe(self.filter(EventKind::Redeemed)),
            self.source.subscribe(self.filter(EventKind::Refunded)),
        );

        let (initiated, redeemed, refunded) = match subscriptions {
            Ok(subs) => subs,
            Err(e) => {
                logging::log_chain_error(EventCategory::Event, "watch subscribe", "CHAIN_ERROR", &e.to_string());
                return;
            }
        };

        let reason = self.pump(&tx, &cancel, initiated, redeemed, refunded).await;

        match &reason {
            StopReason::SubscriptionError(kind, e) => logging::log_chain_error(
                EventCategory::Event,
                &format!("{} subscription", kind),
                "CHAIN_ERROR",
                &e.to_string(),
            ),
            _ => logging::log_system_event(
                "watch stopped",
                &self.id,
                serde_json::json!({ "reason": format!("{:?}", reason) }),
            ),
        }
    }

    async fn pump(
        &self,
        tx: &mpsc::Sender<HtlcEvent>,
        cancel: &CancellationToken,
        mut initiated: Subscription,
        mut redeemed: Subscription,
        mut refunded: Subscription,
    ) -> StopReason {
        loop {
            let (kind, log) = tokio::select! {
                biased;

                _ = cancel.cancelled() => return StopReason::Cancelled,
                _ = tx.closed() => return StopReason::ConsumerGone,

                Some(e) = initiated.errors.recv() => {
                    return StopReason::SubscriptionError(EventKind::Initiated, e)
                }
                Some(e) = redeemed.errors.recv() => {
                    return StopReason::SubscriptionError(EventKind::Redeemed, e)
                }
                Some(e) = refunded.errors.recv() => {
                    return StopReason::SubscriptionError(EventKind::Refunded, e)
                }

                log = initiated.logs.recv() => (EventKind::Initiated, log),
                log = redeemed.logs.recv() => (EventKind::Redeemed, log),
                log = refunded.logs.recv() => (EventKind::Refunded, log),
            };

            let Some(log) = log else {
                return StopReason::SinkClosed(kind);
            };

            if let Some(event) = self.normalize(&log) {
                logging::log_htlc_event(&event, Some(&self.id));
                // A stalled consumer must not hold the session past cancel
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => return StopReason::Cancelled,
                    sent = tx.send(event) => {
                        if sent.is_err() {
                            return StopReason::ConsumerGone;
                        }
                    }
                }
            }
        }
    }

    fn normalize(&self, log: &RawLog) -> Option<HtlcEvent> {
        match HtlcEvent::decode(log) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    target: "swapwatch::event",
                    session = %self.id,
                    block = log.block_number,
                    tx_hash = %format!("{:#x}", log.tx_hash),
                    error = %e,
                    "Skipping undecodable log"
                );
                None
            }
        }
    }
}
