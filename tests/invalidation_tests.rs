// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Block-driven invalidation through a running marketplace.

mod helpers;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use helpers::*;
use ledger_market::config::StreamSettings;
use ledger_market::transport::{RetryConfig, RetryPolicy};
use ledger_market::{
    Address, BlockRef, BlockStream, CacheStats, InvalidationTarget, Invalidator, Lookup,
    MarketplaceConfigBuilder, NegativeCache, ReferenceSnapshot,
};

fn no_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn test_touched_item_is_refetched_after_block() {
    let fixture = Fixture::sample().await;
    let market = &fixture.marketplace;
    let items = market.items();

    let before = items.get(sample::held_item()).await.unwrap().unwrap();
    assert_eq!(before.owner(), Some(sample::wallet()));
    let collection_reads = fixture.ledger.reads(sample::collection());

    let buyer = address(0x79);
    fixture.ledger.set_contract(
        sample::held_item(),
        item_contract(3, Some(sample::collection()), buyer, "3.json"),
    );
    // Still served from cache until a block says otherwise
    let cached = items.get(sample::held_item()).await.unwrap().unwrap();
    assert_eq!(cached.owner(), Some(sample::wallet()));

    fixture
        .ledger
        .push_block(block(101, &[sample::held_item()]));
    wait_until(|| market.invalidator_stats().blocks == 1).await;

    let after = items.get(sample::held_item()).await.unwrap().unwrap();
    assert_eq!(after.owner(), Some(buyer));
    assert_eq!(fixture.ledger.reads(sample::held_item()), 2);
    // The collection was not touched and stays cached
    assert_eq!(fixture.ledger.reads(sample::collection()), collection_reads);
    assert_eq!(market.snapshot().current().seqno(), 101);
}

#[tokio::test]
async fn test_cached_absence_is_evicted_when_account_appears() {
    let fixture = Fixture::sample().await;
    let market = &fixture.marketplace;
    let newcomer = address(0x31);

    assert_eq!(market.items().get(newcomer).await.unwrap(), None);

    fixture.ledger.set_contract(
        newcomer,
        item_contract(0, None, sample::wallet(), "https://meta.test/t.json"),
    );
    assert_eq!(market.items().get(newcomer).await.unwrap(), None);

    fixture.ledger.push_block(block(101, &[newcomer]));
    wait_until(|| market.invalidator_stats().blocks == 1).await;

    assert!(market.items().get(newcomer).await.unwrap().is_some());
}

#[tokio::test]
async fn test_item_listed_for_sale_becomes_sale_model() {
    let fixture = Fixture::sample().await;
    let market = &fixture.marketplace;
    let new_sale = address(0x57);

    assert!(!market
        .items()
        .get(sample::held_item())
        .await
        .unwrap()
        .unwrap()
        .is_on_sale());

    fixture.ledger.set_contract(
        new_sale,
        sale_contract(address(MARKETPLACE), sample::held_item(), sample::wallet()),
    );
    fixture.ledger.set_contract(
        sample::held_item(),
        item_contract(3, Some(sample::collection()), new_sale, "3.json"),
    );
    fixture
        .ledger
        .push_block(block(101, &[sample::held_item(), new_sale]));
    wait_until(|| market.invalidator_stats().blocks == 1).await;

    let item = market.items().get(sample::held_item()).await.unwrap().unwrap();
    assert!(item.is_on_sale());
    assert_eq!(item.owner(), Some(sample::wallet()));
}

#[tokio::test]
async fn test_blocks_apply_in_order_and_gaps_are_discarded() {
    let fixture = Fixture::sample().await;
    let market = &fixture.marketplace;

    fixture.ledger.push_block(block(101, &[]));
    // Skips 102
    fixture.ledger.push_block(block(103, &[]));
    fixture.ledger.push_block(block(102, &[]));
    wait_until(|| market.invalidator_stats().blocks == 2).await;

    let stream = market.stream_stats();
    assert_eq!(stream.last_confirmed, 102);
    assert_eq!(stream.gaps, 1);
    assert_eq!(market.invalidator_stats().faults, 1);
    assert_eq!(market.snapshot().current().seqno(), 102);
}

#[tokio::test]
async fn test_terminated_stream_is_restarted_from_last_confirmed() {
    let config = MarketplaceConfigBuilder::minimal(address(MARKETPLACE))
        .stream(StreamSettings {
            max_restarts: 0,
            retry: no_retry(),
            restart_delay: Duration::from_millis(1),
            ..StreamSettings::default()
        })
        .build();
    let fixture = Fixture::start(sample_ledger(), sample_metadata(), sample_approvals(), config).await;
    let market = &fixture.marketplace;

    market.items().get(sample::held_item()).await.unwrap().unwrap();

    fixture.ledger.push_failure();
    wait_until(|| market.invalidator_stats().stream_restarts == 1).await;

    fixture.ledger.set_contract(
        sample::held_item(),
        item_contract(3, Some(sample::collection()), address(0x79), "3.json"),
    );
    fixture
        .ledger
        .push_block(block(101, &[sample::held_item()]));
    wait_until(|| market.invalidator_stats().blocks == 1).await;

    let item = market.items().get(sample::held_item()).await.unwrap().unwrap();
    assert_eq!(item.owner(), Some(address(0x79)));
    assert_eq!(market.stream_stats().failed_fetches, 1);
}

#[tokio::test]
async fn test_lagging_invalidator_clears_every_cache() {
    init_tracing();
    let ledger = Arc::new(MockLedger::new());
    let stream = BlockStream::new(
        ledger.clone(),
        100,
        StreamSettings {
            capacity: 1,
            retry: no_retry(),
            ..StreamSettings::default()
        },
    );
    let cache: NegativeCache<ledger_market::Address, u8> = NegativeCache::new("lagging");
    cache
        .get_or_compute(address(0x01), || async { Ok(Lookup::Present(1)) })
        .await
        .unwrap();
    let invalidator = Invalidator::new().with_target(Arc::new(cache.clone()));

    let mut events = stream.subscribe();
    stream.start();
    for seqno in 101..=103 {
        ledger.push_block(block(seqno, &[]));
    }
    wait_until(|| stream.stats().delivered == 3).await;

    // Runs until the stream closes, so stop watching once the backlog is drained
    let _ = tokio::time::timeout(Duration::from_millis(50), invalidator.run(&mut events)).await;

    let stats = invalidator.stats();
    assert_eq!(stats.full_clears, 1);
    assert_eq!(stats.blocks, 1, "only the newest block was still buffered");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_invalidator_advances_snapshot() {
    init_tracing();
    let ledger: Arc<MockLedger> = Arc::new(MockLedger::new());
    let snapshot = ReferenceSnapshot::establish(ledger.clone(), RetryPolicy::none())
        .await
        .unwrap();
    let invalidator = Invalidator::new().with_snapshot(snapshot.clone());

    invalidator.apply(&block(101, &[]));
    assert_eq!(snapshot.current(), block_ref(101));

    // Replays never move it back
    invalidator.apply(&block(99, &[]));
    assert_eq!(snapshot.current().seqno(), 101);
}

/// Records the reference block visible while entries are evicted
struct SnapshotRecorder {
    snapshot: ReferenceSnapshot,
    seen: Mutex<Vec<BlockRef>>,
}

impl InvalidationTarget for SnapshotRecorder {
    fn name(&self) -> &str {
        "snapshot_recorder"
    }

    fn invalidate_touched(&self, _touched: &HashSet<Address>) -> usize {
        self.seen.lock().unwrap().push(self.snapshot.current());
        0
    }

    fn invalidate_all(&self) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

#[tokio::test]
async fn test_snapshot_advances_before_entries_are_evicted() {
    init_tracing();
    let ledger = Arc::new(MockLedger::new());
    let snapshot = ReferenceSnapshot::establish(ledger.clone(), RetryPolicy::none())
        .await
        .unwrap();
    let recorder = Arc::new(SnapshotRecorder {
        snapshot: snapshot.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let invalidator = Invalidator::new()
        .with_snapshot(snapshot)
        .with_target(recorder.clone());

    invalidator.apply(&block(101, &[address(0x01)]));
    invalidator.apply(&block(102, &[address(0x01)]));

    // A refetch racing the eviction can never pin to the pre-block state
    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![block_ref(101), block_ref(102)]
    );
}
