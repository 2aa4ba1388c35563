//! Hybrid resolver: cache-first chain-data provider with a fallback backend
//! (spec §4.2).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::cache::UtxoCache;
use crate::chain::ChainDataProvider;
use crate::error::IndexerResult;
use crate::model::{OutputRef, Slot, TxOutput};

/// Report resolver metrics every this many `resolve_inputs` invocations
/// (spec §4.2: "Every 100 invocations (or equivalent threshold)").
const METRICS_REPORT_INTERVAL: u64 = 100;

/// Atomic counters backing the resolver's exported metrics (spec §9
/// REDESIGN FLAG: "replace incrementing shared integers with atomic
/// counters and a periodic emitter").
#[derive(Default)]
pub struct ResolverMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    calls: AtomicU64,
    /// `utxo_resolution_missing` (spec §7).
    pub resolution_missing: AtomicU64,
    /// `utxo_resolution_count_mismatch` (spec §7).
    pub resolution_count_mismatch: AtomicU64,
}

impl ResolverMetrics {
    /// Current cache hit / miss totals and derived hit rate.
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };
        (hits, misses, hit_rate)
    }
}

/// Composes the UTXO cache with a fallback [`ChainDataProvider`].
pub struct HybridResolver {
    cache: Arc<UtxoCache>,
    fallback: Arc<dyn ChainDataProvider>,
    metrics: ResolverMetrics,
}

impl HybridResolver {
    /// Build a resolver over a shared cache and fallback provider.
    #[must_use]
    pub fn new(cache: Arc<UtxoCache>, fallback: Arc<dyn ChainDataProvider>) -> Self {
        Self {
            cache,
            fallback,
            metrics: ResolverMetrics::default(),
        }
    }

    /// Access the resolver's metrics counters.
    #[must_use]
    pub const fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }

    async fn maybe_report_metrics(&self) {
        let calls = self.metrics.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % METRICS_REPORT_INTERVAL == 0 {
            let (hits, misses, hit_rate) = self.metrics.snapshot();
            let stats = self.cache.stats().await;
            info!(
                hits,
                misses,
                hit_rate,
                cache_size = stats.size,
                cache_utilization_percent = stats.utilization_percent,
                "resolver metrics checkpoint"
            );
        }
    }
}

#[async_trait]
impl ChainDataProvider for HybridResolver {
    #[instrument(skip(self, refs), fields(count = refs.len()))]
    async fn resolve_inputs(&self, refs: &[OutputRef]) -> IndexerResult<Vec<TxOutput>> {
        self.maybe_report_metrics().await;

        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let cached = self.cache.get_many(refs).await;
        let hit_count = cached.len();
        let miss_count = refs.len() - hit_count;
        self.metrics.hits.fetch_add(hit_count as u64, Ordering::Relaxed);
        self.metrics.misses.fetch_add(miss_count as u64, Ordering::Relaxed);

        if miss_count == 0 {
            // Preserve input order (all hits; `cached` is already aligned to
            // the scan over `refs` since get_many walks refs in order).
            return Ok(cached.into_iter().map(|(_, output)| output).collect());
        }

        let misses: Vec<OutputRef> = refs
            .iter()
            .filter(|r| !cached.iter().any(|(hit_ref, _)| hit_ref == *r))
            .cloned()
            .collect();

        let fetched = self.fallback.resolve_inputs(&misses).await?;

        if fetched.len() != misses.len() {
            self.metrics
                .resolution_count_mismatch
                .fetch_add(1, Ordering::Relaxed);
            let missing = misses.len() - fetched.len();
            self.metrics
                .resolution_missing
                .fetch_add(missing as u64, Ordering::Relaxed);
            warn!(
                requested = misses.len(),
                returned = fetched.len(),
                "fallback provider returned fewer outputs than requested"
            );
        }

        // Walk refs in original order, emitting the cached hit or the next
        // positionally-aligned fallback result (spec §4.2 step 4).
        let mut cache_iter = cached.into_iter();
        let mut fallback_iter = fetched.into_iter();
        let mut combined = Vec::with_capacity(refs.len());
        let mut miss_cursor = 0usize;

        for reference in refs {
            if miss_cursor < misses.len() && misses[miss_cursor] == *reference {
                if let Some(output) = fallback_iter.next() {
                    combined.push(output);
                }
                miss_cursor += 1;
            } else if let Some((_, output)) = cache_iter.next() {
                combined.push(output);
            }
        }

        Ok(combined)
    }

    async fn find_block_nearest(&self, slot: Slot) -> IndexerResult<Option<Slot>> {
        self.fallback.find_block_nearest(slot).await
    }
}
