//! Bounded, FIFO-evicting UTXO cache (spec §4.1).
//!
//! Maps `(txHash, outputIndex)` to the resolved output. Backed by a single
//! lock-guarded linked hash map rather than a separate map-plus-queue pair
//! (spec §9 REDESIGN FLAG: "consolidate into a single lock-guarded
//! structure"), so there is one invariant to maintain instead of two.
//!
//! Eviction is strictly FIFO by first insertion; reads never promote an
//! entry. This is a deliberate simplification over a true LRU: UTXOs are
//! almost always consumed soon after creation, so promote-on-read buys
//! nothing here.

use std::sync::atomic::{AtomicU64, Ordering};

use hashlink::LinkedHashMap;
use tokio::sync::Mutex;
use tracing::{instrument, warn};

use crate::error::IndexerError;
use crate::model::{OutputRef, TxOutput};

/// Default cache capacity (spec §4.1: "default 100 000").
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Point-in-time cache statistics (spec §4.1 `stats()`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,
    /// Configured maximum size.
    pub max_size: usize,
    /// `size / max_size` as a percentage.
    pub utilization_percent: f64,
}

/// Bounded FIFO cache from `(tx-hash, output-index)` to a resolved output.
pub struct UtxoCache {
    capacity: usize,
    entries: Mutex<LinkedHashMap<String, TxOutput>>,
    evictions: AtomicU64,
}

impl UtxoCache {
    /// Create a cache with the given maximum entry count.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(LinkedHashMap::new()),
            evictions: AtomicU64::new(0),
        }
    }

    /// Insert every output of a transaction, keyed by `(txHash, index)`.
    ///
    /// Idempotent for duplicate calls: a key already present is left
    /// untouched (its insertion order, and thus its eviction priority, does
    /// not change). Evicts the oldest entries first whenever the map would
    /// be at or above capacity after the insert.
    #[instrument(skip(self, outputs), fields(tx_hash = %tx_hash, count = outputs.len()))]
    pub async fn add_outputs(&self, tx_hash: &str, outputs: &[TxOutput]) {
        let mut guard = self.entries.lock().await;
        for (index, output) in outputs.iter().enumerate() {
            let key = format!("{tx_hash}#{index}");
            if guard.contains_key(&key) {
                continue;
            }
            while guard.len() >= self.capacity {
                if guard.pop_front().is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                } else {
                    break;
                }
            }
            guard.insert(key, output.clone());
        }
    }

    /// Look up a single reference.
    #[instrument(skip(self))]
    pub async fn get(&self, reference: &OutputRef) -> Option<TxOutput> {
        let guard = self.entries.lock().await;
        guard.get(&reference.cache_key()).cloned()
    }

    /// Look up many references at once, returning only the subset found, in
    /// the order they were found scanning `refs`.
    pub async fn get_many(&self, refs: &[OutputRef]) -> Vec<(OutputRef, TxOutput)> {
        let guard = self.entries.lock().await;
        refs.iter()
            .filter_map(|r| guard.get(&r.cache_key()).cloned().map(|o| (r.clone(), o)))
            .collect()
    }

    /// Explicitly remove a single entry, if present.
    pub async fn remove_spent(&self, reference: &OutputRef) {
        let mut guard = self.entries.lock().await;
        guard.remove(&reference.cache_key());
    }

    /// Current size / capacity / utilization.
    pub async fn stats(&self) -> CacheStats {
        let guard = self.entries.lock().await;
        let size = guard.len();
        #[allow(clippy::cast_precision_loss)]
        let utilization_percent = (size as f64 / self.capacity as f64) * 100.0;
        CacheStats {
            size,
            max_size: self.capacity,
            utilization_percent,
        }
    }

    /// Total entries evicted over the cache's lifetime.
    pub fn total_evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// Attempt a cache mutation, logging and swallowing any failure as a miss
/// (spec §4.1: "Cache mutation errors are logged and swallowed; the caller
/// treats a cache failure as a miss").
pub fn log_cache_failure(err: &IndexerError) {
    warn!(error = %err, "UTXO cache operation failed; treating as miss");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TxHash;

    fn output(tag: &str) -> TxOutput {
        TxOutput {
            address: format!("addr_{tag}"),
            value: vec![("lovelace".to_string(), 1)],
            datum: None,
        }
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("tx1", &[output("a"), output("b")]).await;

        let got = cache.get(&OutputRef::new(TxHash("tx1".into()), 0)).await;
        assert_eq!(got.unwrap().address, "addr_a");
    }

    #[tokio::test]
    async fn add_outputs_is_idempotent_for_duplicate_calls() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("tx1", &[output("a")]).await;
        cache.add_outputs("tx1", &[output("a")]).await;
        assert_eq!(cache.stats().await.size, 1);
    }

    #[tokio::test]
    async fn capacity_is_never_exceeded_and_evicts_oldest_first() {
        let cache = UtxoCache::new(2);
        cache.add_outputs("tx1", &[output("a")]).await;
        cache.add_outputs("tx2", &[output("b")]).await;
        cache.add_outputs("tx3", &[output("c")]).await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 2);
        assert_eq!(cache.total_evictions(), 1);

        // tx1's output was the oldest and should be gone.
        assert!(cache.get(&OutputRef::new(TxHash("tx1".into()), 0)).await.is_none());
        assert!(cache.get(&OutputRef::new(TxHash("tx2".into()), 0)).await.is_some());
        assert!(cache.get(&OutputRef::new(TxHash("tx3".into()), 0)).await.is_some());
    }

    #[tokio::test]
    async fn reads_do_not_promote_entries() {
        let cache = UtxoCache::new(2);
        cache.add_outputs("tx1", &[output("a")]).await;
        cache.add_outputs("tx2", &[output("b")]).await;

        // Repeatedly reading tx1 must not protect it from eviction.
        for _ in 0..5 {
            let _ = cache.get(&OutputRef::new(TxHash("tx1".into()), 0)).await;
        }
        cache.add_outputs("tx3", &[output("c")]).await;

        assert!(cache.get(&OutputRef::new(TxHash("tx1".into()), 0)).await.is_none());
        assert!(cache.get(&OutputRef::new(TxHash("tx2".into()), 0)).await.is_some());
    }

    #[tokio::test]
    async fn get_many_returns_only_the_found_subset() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("tx1", &[output("a")]).await;

        let refs = vec![
            OutputRef::new(TxHash("tx1".into()), 0),
            OutputRef::new(TxHash("missing".into()), 0),
        ];
        let found = cache.get_many(&refs).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.tx_hash.0, "tx1");
    }

    #[tokio::test]
    async fn remove_spent_drops_the_entry() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("tx1", &[output("a")]).await;
        cache.remove_spent(&OutputRef::new(TxHash("tx1".into()), 0)).await;
        assert!(cache.get(&OutputRef::new(TxHash("tx1".into()), 0)).await.is_none());
    }
}
