//! Integration tests for spec §8 scenario 5 (rollback re-initialization) and
//! the UTXO cache capacity invariant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cardano_dex_indexer::bus::EventBus;
use cardano_dex_indexer::cache::UtxoCache;
use cardano_dex_indexer::chain::ChainDataProvider;
use cardano_dex_indexer::chain_service::{BlockSource, ChainService, ChainSyncEvent};
use cardano_dex_indexer::error::IndexerResult;
use cardano_dex_indexer::model::{OutputRef, Slot, TxOutput};

struct RecordingSource {
    started_from: Mutex<Vec<Slot>>,
    at_tip: AtomicBool,
}

#[async_trait]
impl BlockSource for RecordingSource {
    async fn start(&self, from_point: Slot) -> IndexerResult<()> {
        self.started_from.lock().unwrap().push(from_point);
        Ok(())
    }

    async fn next_event(&self) -> IndexerResult<Option<ChainSyncEvent>> {
        Ok(None)
    }

    fn is_at_tip(&self) -> bool {
        self.at_tip.load(Ordering::Relaxed)
    }
}

struct EmptyResolver;

#[async_trait]
impl ChainDataProvider for EmptyResolver {
    async fn resolve_inputs(&self, _refs: &[OutputRef]) -> IndexerResult<Vec<TxOutput>> {
        Ok(Vec::new())
    }
    async fn find_block_nearest(&self, _slot: Slot) -> IndexerResult<Option<Slot>> {
        Ok(None)
    }
}

/// Scenario 5: sync at slot 100, rollback to slot 90 arrives. The
/// re-initialization point must be `min(persistedSyncPoint, rollbackPoint -
/// slotConversionOffset)` (spec §9) — never rounded up to the rollback
/// point itself.
#[tokio::test]
async fn rollback_reinitializes_at_or_before_the_rollback_point() {
    let source = Arc::new(RecordingSource {
        started_from: Mutex::new(Vec::new()),
        at_tip: AtomicBool::new(false),
    });
    let (bus, _sub) = EventBus::new(4);
    let service = ChainService::new(source.clone(), Arc::new(EmptyResolver), bus);

    service.start(100).await.unwrap();
    service.restart_block_sync(90).await.unwrap();

    let calls = source.started_from.lock().unwrap().clone();
    // First call is the initial start(100); second is the restart, which
    // must not exceed the rollback point.
    assert_eq!(calls[0], 100);
    assert!(calls[1] <= 90);
}

/// UTXO cache at capacity: inserting N new keys evicts the N oldest
/// (FIFO eviction, spec §8 boundary behavior).
#[tokio::test]
async fn cache_evicts_oldest_entries_once_full() {
    let cache = UtxoCache::new(2);
    cache
        .add_outputs(
            "tx1",
            &[TxOutput {
                address: "addr1".to_string(),
                value: vec![("lovelace".to_string(), 1)],
                datum: None,
            }],
        )
        .await;
    cache
        .add_outputs(
            "tx2",
            &[TxOutput {
                address: "addr2".to_string(),
                value: vec![("lovelace".to_string(), 2)],
                datum: None,
            }],
        )
        .await;
    cache
        .add_outputs(
            "tx3",
            &[TxOutput {
                address: "addr3".to_string(),
                value: vec![("lovelace".to_string(), 3)],
                datum: None,
            }],
        )
        .await;

    let stats = cache.stats().await;
    assert!(stats.size <= 2);

    let tx1_ref = cardano_dex_indexer::model::OutputRef::new(
        cardano_dex_indexer::model::TxHash("tx1".to_string()),
        0,
    );
    assert!(cache.get(&tx1_ref).await.is_none(), "oldest entry should have been evicted");
}
