//! DEX classifiers (spec §4.3): per-protocol extractors that detect pool
//! interactions, decode datums, and emit swaps and pool reserves.
//!
//! Dependency injection is a typed plug-in factory (spec §9 REDESIGN FLAG:
//! "re-architect as a small plug-in factory that maps a configuration enum
//! to a constructor, avoiding global registries") rather than the
//! named-service registry the source used.

pub mod cbor;
pub mod common;
pub mod minswap_v1;
pub mod minswap_v2;
pub mod sundaeswap;
pub mod wingriders;

use std::collections::HashMap;

use tracing::warn;

use crate::model::{DexCode, PoolReserveSnapshot, QualifiedTx, Swap};

/// Capability set every DEX protocol extractor implements (spec §4.3).
pub trait DexClassifier: Send + Sync {
    /// Short machine-readable DEX code.
    fn dex_code(&self) -> DexCode;

    /// Human-readable DEX name.
    fn dex_name(&self) -> &str {
        self.dex_code().name()
    }

    /// Script hashes that identify this protocol's pool UTXOs.
    fn pool_script_hashes(&self) -> &[String];

    /// Extract swaps from a fully-qualified transaction.
    ///
    /// A pool output with a malformed datum must not be fatal: the
    /// classifier logs a warning and emits nothing for that pool (spec
    /// §4.3 edge case).
    fn compute_swaps(&self, tx: &QualifiedTx) -> Vec<Swap>;

    /// Extract pool reserve snapshots from a fully-qualified transaction.
    fn compute_pool_reserves(&self, tx: &QualifiedTx) -> Vec<PoolReserveSnapshot>;
}

/// Maps configured [`DexCode`]s to their classifier instance, built once at
/// startup from the configured allow-list.
pub struct ClassifierRegistry {
    classifiers: HashMap<DexCode, Box<dyn DexClassifier>>,
}

impl ClassifierRegistry {
    /// Build a registry containing exactly the classifiers named in
    /// `allow_list`, constructed via [`build_classifier`]. Unknown codes are
    /// logged and skipped rather than treated as fatal, since an operator
    /// typo in an allow-list should not prevent startup of the rest of the
    /// pipeline.
    #[must_use]
    pub fn new(allow_list: &[DexCode]) -> Self {
        let mut classifiers: HashMap<DexCode, Box<dyn DexClassifier>> = HashMap::new();
        for &code in allow_list {
            classifiers.insert(code, build_classifier(code));
        }
        Self { classifiers }
    }

    /// All script hashes recognized across every registered classifier,
    /// used by the swap processor to qualify transactions (spec §4.4).
    #[must_use]
    pub fn all_pool_script_hashes(&self) -> Vec<(String, DexCode)> {
        self.classifiers
            .values()
            .flat_map(|c| {
                c.pool_script_hashes()
                    .iter()
                    .map(move |hash| (hash.clone(), c.dex_code()))
            })
            .collect()
    }

    /// Look up the classifier for a DEX code, if it is registered.
    #[must_use]
    pub fn get(&self, code: DexCode) -> Option<&dyn DexClassifier> {
        self.classifiers.get(&code).map(std::convert::AsRef::as_ref)
    }
}

/// Construct the classifier instance for a given [`DexCode`].
#[must_use]
pub fn build_classifier(code: DexCode) -> Box<dyn DexClassifier> {
    match code {
        DexCode::MinswapV1 => Box::new(minswap_v1::MinswapV1Classifier::new()),
        DexCode::MinswapV2 => Box::new(minswap_v2::MinswapV2Classifier::new()),
        DexCode::Sundaeswap => Box::new(sundaeswap::SundaeswapClassifier::new()),
        DexCode::Wingriders => Box::new(wingriders::WingridersClassifier::new()),
    }
}

/// Log a malformed-datum edge case uniformly across classifiers (spec
/// §4.3: "classifier emits nothing and logs a warning (not fatal)").
pub fn warn_malformed_datum(dex: DexCode, tx_hash: &str, detail: &str) {
    warn!(dex = %dex, tx_hash, detail, "pool output had a malformed datum; skipping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_only_contains_allow_listed_classifiers() {
        let registry = ClassifierRegistry::new(&[DexCode::MinswapV1, DexCode::Wingriders]);
        assert!(registry.get(DexCode::MinswapV1).is_some());
        assert!(registry.get(DexCode::Wingriders).is_some());
        assert!(registry.get(DexCode::Sundaeswap).is_none());
    }

    #[test]
    fn all_pool_script_hashes_covers_every_registered_classifier() {
        let registry = ClassifierRegistry::new(&[DexCode::MinswapV1, DexCode::Sundaeswap]);
        let hashes = registry.all_pool_script_hashes();
        let dexes: Vec<DexCode> = hashes.into_iter().map(|(_, d)| d).collect();
        assert!(dexes.contains(&DexCode::MinswapV1));
        assert!(dexes.contains(&DexCode::Sundaeswap));
    }
}
