//! Historical event queries

use crate::asset::Asset;
use crate::common::error::{Result, SwapError};
use crate::evm::reader::{ContractReader, LogFilter};

use super::types::{EventKind, HtlcEvent};

/// All HTLC events of the asset's swapper in `[from, to]`, in chain order
///
/// Issues exactly one log query; chunk large ranges with
/// [`crate::evm::BlockWindows`].
pub async fn query_events_in_range(
    reader: &dyn ContractReader,
    asset: &Asset,
    from: u64,
    to: u64,
) -> Result<Vec<HtlcEvent>> {
    if from > to {
        return Err(SwapError::InvalidRange { from, to });
    }

    let swapper = asset.swapper_address()?;
    let filter = LogFilter::new(swapper, from)
        .to_block(to)
        .topics(EventKind::ALL.iter().map(EventKind::topic));

    let mut logs = reader.get_logs(&filter).await?;
    logs.sort_by_key(|log| (log.block_number, log.log_index));

    let mut events = Vec::with_capacity(logs.len());
    for log in &logs {
        if let Some(event) = HtlcEvent::decode(log)? {
            events.push(event);
        }
    }

    tracing::debug!(
        target: "swapwatch::event",
        swapper = %format!("{:#x}", swapper),
        from,
        to,
        events = events.len(),
        "Backfilled events"
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::fixtures;
    use crate::evm::abi;
    use crate::evm::reader::MockContractReader;
    use primitive_types::{H160, H256, U256};

    fn asset() -> Asset {
        Asset::Native {
            swapper: fixtures::contract(),
        }
    }

    #[tokio::test]
    async fn test_initiated_then_redeemed_in_block_order() {
        let order = H256::repeat_byte(1);
        let mut reader = MockContractReader::new();
        reader
            .expect_get_logs()
            .times(1)
            .withf(|f: &LogFilter| {
                f.from_block == 100
                    && f.to_block == Some(200)
                    && f.topic0.len() == 3
                    && f.topic1.is_none()
                    && f.address == fixtures::contract()
            })
            .returning(move |_| {
                // Node returns them out of order
                Ok(vec![
                    fixtures::redeemed_log(order, H256::repeat_byte(2), b"secret", 150),
                    fixtures::initiated_log(order, U256::from(10u64), 50, 120),
                ])
            });

        let events = query_events_in_range(&reader, &asset(), 100, 200).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::Initiated);
        assert_eq!(events[0].block_number(), 120);
        assert_eq!(events[1].kind(), EventKind::Redeemed);
        assert_eq!(events[1].block_number(), 150);
    }

    #[tokio::test]
    async fn test_same_block_sorted_by_log_index() {
        let order = H256::repeat_byte(1);
        let mut reader = MockContractReader::new();
        reader.expect_get_logs().returning(move |_| {
            let mut refund = fixtures::refunded_log(order, 7);
            refund.log_index = 5;
            let mut init = fixtures::initiated_log(order, U256::one(), 1, 7);
            init.log_index = 2;
            Ok(vec![refund, init])
        });

        let events = query_events_in_range(&reader, &asset(), 0, 10).await.unwrap();
        assert_eq!(
            events.iter().map(HtlcEvent::kind).collect::<Vec<_>>(),
            vec![EventKind::Initiated, EventKind::Refunded]
        );
    }

    #[tokio::test]
    async fn test_unknown_topics_skipped_malformed_rejected() {
        let mut reader = MockContractReader::new();
        reader.expect_get_logs().times(1).returning(|_| {
            let mut foreign = fixtures::refunded_log(H256::repeat_byte(1), 3);
            foreign.topics[0] = abi::event_topic("Approval(address,address,uint256)");
            Ok(vec![foreign, fixtures::refunded_log(H256::repeat_byte(2), 4)])
        });
        let events = query_events_in_range(&reader, &asset(), 0, 10).await.unwrap();
        assert_eq!(events.len(), 1);

        let mut reader = MockContractReader::new();
        reader.expect_get_logs().returning(|_| {
            let mut bad = fixtures::initiated_log(H256::repeat_byte(1), U256::one(), 1, 3);
            bad.data.clear();
            Ok(vec![bad])
        });
        let err = query_events_in_range(&reader, &asset(), 0, 10).await.unwrap_err();
        assert!(matches!(err, SwapError::Decode(_)));
    }

    #[tokio::test]
    async fn test_invalid_range_and_asset() {
        let mut reader = MockContractReader::new();
        reader.expect_get_logs().times(0);

        assert!(matches!(
            query_events_in_range(&reader, &asset(), 10, 9).await,
            Err(SwapError::InvalidRange { from: 10, to: 9 })
        ));

        let nft = Asset::NonFungible {
            token: H160::zero(),
            token_id: U256::one(),
        };
        assert!(matches!(
            query_events_in_range(&reader, &nft, 0, 9).await,
            Err(SwapError::UnsupportedAssetKind(_))
        ));
    }

    #[tokio::test]
    async fn test_single_block_range() {
        let mut reader = MockContractReader::new();
        reader
            .expect_get_logs()
            .withf(|f: &LogFilter| f.from_block == 5 && f.to_block == Some(5))
            .returning(|_| Ok(vec![]));

        assert!(query_events_in_range(&reader, &asset(), 5, 5).await.unwrap().is_empty());
    }
}
