//! Chain-data provider contract and its implementations (spec §4.2, §6).
//!
//! A `ChainDataProvider` resolves historical outputs and locates blocks by
//! slot. The pipeline's own cache-backed implementation is [`hybrid::HybridResolver`];
//! [`http::HttpFallbackProvider`] and [`sql::SqlMirrorProvider`] are the two
//! fallback backends named in spec §6 ("remote API, local node mirror, DB
//! mirror").

pub mod http;
pub mod hybrid;
pub mod node;
pub mod sql;

use async_trait::async_trait;

use crate::error::IndexerResult;
use crate::model::{OutputRef, Slot, TxOutput};

pub use hybrid::HybridResolver;

/// Resolves historical chain data: past outputs and block locations.
///
/// Implementors are contracted (spec §6) to return `resolve_inputs` results
/// positionally aligned with the iteration order of `refs`, and may return
/// fewer elements than requested when some outputs could not be resolved
/// (spec §8 scenario 6, "fallback partial failure").
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Resolve a set of output references to their decoded outputs.
    async fn resolve_inputs(&self, refs: &[OutputRef]) -> IndexerResult<Vec<TxOutput>>;

    /// Find the closest block at or before `slot`.
    async fn find_block_nearest(&self, slot: Slot) -> IndexerResult<Option<Slot>>;
}
