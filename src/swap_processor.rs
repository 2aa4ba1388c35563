//! Swap processor: per-block orchestrator that turns raw block bodies into
//! swaps and pool reserve snapshots (spec §4.4).
//!
//! Qualification happens before any input resolution: a transaction only
//! pays the cost of a chain-data round trip once at least one of its outputs
//! is controlled by a known pool script (spec §4.4 "narrow to transactions
//! whose outputs match a known pool credential before resolving anything").

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::chain::ChainDataProvider;
use crate::dex::ClassifierRegistry;
use crate::error::IndexerResult;
use crate::model::{Block, DexCode, OutputRef, PoolReserveSnapshot, QualifiedTx, Slot, Swap, TxBody};

/// Swaps extracted from a single block (spec §3 "`SwapsComputed` event").
#[derive(Debug, Clone)]
pub struct SwapsComputed {
    /// The block's slot.
    pub slot: Slot,
    /// Every swap found in the block, across all registered DEXes.
    pub swaps: Vec<Swap>,
}

/// Pool reserve snapshots extracted from a single block (spec §3
/// "`PoolReservesComputed` event").
#[derive(Debug, Clone)]
pub struct PoolReservesComputed {
    /// The block's slot.
    pub slot: Slot,
    /// Every pool reserve snapshot found in the block.
    pub reserves: Vec<PoolReserveSnapshot>,
    /// Whether this block produced any swaps, used by the dispatcher to
    /// decide whether a `PricesCalculated` event should follow (spec §4.8).
    pub has_swaps: bool,
}

/// Resolves qualifying transactions in a block and runs every registered
/// classifier over them.
pub struct SwapProcessor {
    registry: Arc<ClassifierRegistry>,
    resolver: Arc<dyn ChainDataProvider>,
}

impl SwapProcessor {
    /// Build a processor over a classifier registry and chain-data resolver.
    #[must_use]
    pub fn new(registry: Arc<ClassifierRegistry>, resolver: Arc<dyn ChainDataProvider>) -> Self {
        Self { registry, resolver }
    }

    /// Process a block, returning its swaps and pool reserve snapshots.
    ///
    /// Blocks with no qualifying transactions short-circuit to empty results
    /// without touching the chain-data provider (spec §4.4).
    #[instrument(skip(self, block), fields(slot = block.slot, tx_count = block.transactions.len()))]
    pub async fn process_block(
        &self,
        block: &Block,
    ) -> IndexerResult<(SwapsComputed, PoolReservesComputed)> {
        let known_hashes = self.registry.all_pool_script_hashes();

        let qualifying: Vec<&TxBody> = block
            .transactions
            .iter()
            .filter(|tx| tx_touches_known_pool(tx, &known_hashes))
            .collect();

        if qualifying.is_empty() {
            return Ok((
                SwapsComputed {
                    slot: block.slot,
                    swaps: Vec::new(),
                },
                PoolReservesComputed {
                    slot: block.slot,
                    reserves: Vec::new(),
                    has_swaps: false,
                },
            ));
        }

        let mut swaps = Vec::new();
        let mut reserves = Vec::new();

        #[allow(clippy::cast_possible_truncation)]
        for (block_index, tx) in qualifying.into_iter().enumerate() {
            let qualified = self
                .qualify(tx, block.slot, block_index as u32, &known_hashes)
                .await?;
            for dex in self.dexes_touched(&qualified) {
                let Some(classifier) = self.registry.get(dex) else {
                    continue;
                };
                swaps.extend(classifier.compute_swaps(&qualified));
                reserves.extend(classifier.compute_pool_reserves(&qualified));
            }
        }

        let has_swaps = !swaps.is_empty();
        Ok((
            SwapsComputed {
                slot: block.slot,
                swaps,
            },
            PoolReservesComputed {
                slot: block.slot,
                reserves,
                has_swaps,
            },
        ))
    }

    async fn qualify(
        &self,
        tx: &TxBody,
        slot: Slot,
        block_index: u32,
        known_hashes: &[(String, DexCode)],
    ) -> IndexerResult<QualifiedTx> {
        let input_refs: Vec<OutputRef> = tx.input_refs.clone();
        let inputs = self.resolver.resolve_inputs(&input_refs).await?;

        let matched_script_hashes = known_hashes
            .iter()
            .filter(|(hash, _)| tx.outputs.iter().any(|o| o.address.contains(hash.as_str())))
            .map(|(hash, _)| hash.clone())
            .collect();

        Ok(QualifiedTx {
            hash: tx.hash.clone(),
            slot,
            block_index,
            inputs,
            outputs: tx.outputs.clone(),
            matched_script_hashes,
        })
    }

    /// Which DEXes' pool scripts this qualified transaction actually touched,
    /// so a transaction only runs through the classifiers that could plausibly
    /// produce something for it.
    fn dexes_touched(&self, tx: &QualifiedTx) -> Vec<DexCode> {
        let mut dexes: Vec<DexCode> = self
            .registry
            .all_pool_script_hashes()
            .into_iter()
            .filter(|(hash, _)| tx.matched_script_hashes.contains(hash))
            .map(|(_, dex)| dex)
            .collect();
        dexes.sort_unstable();
        dexes.dedup();
        dexes
    }
}

fn tx_touches_known_pool(tx: &TxBody, known_hashes: &[(String, DexCode)]) -> bool {
    known_hashes
        .iter()
        .any(|(hash, _)| tx.outputs.iter().any(|o| o.address.contains(hash.as_str())))
}
