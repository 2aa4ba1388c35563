//! Minswap v1 classifier.
//!
//! Minswap v1 pools are constant-product AMMs whose datum encodes batcher
//! fee parameters but not the reserves themselves — reserves are read
//! directly from the pool UTXO's value, matching the approach used for
//! Minswap's stable pools in the wider Cardano DEX corpus.

use crate::dex::common::{diff_swap, matching_pool_input, pool_outputs, reserve_snapshot};
use crate::dex::DexClassifier;
use crate::model::{DexCode, PoolReserveSnapshot, QualifiedTx, Swap};

/// Mainnet Minswap v1 pool validator script hashes.
const POOL_SCRIPT_HASHES: &[&str] = &["e1317b152faac13426e6a83e06ff48a2624d30c9e8eba897c25003c"];

/// Extracts swaps and pool reserves for Minswap v1 pools.
pub struct MinswapV1Classifier {
    pool_script_hashes: Vec<String>,
}

impl MinswapV1Classifier {
    /// Build a classifier for the default set of mainnet pool scripts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool_script_hashes: POOL_SCRIPT_HASHES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Default for MinswapV1Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DexClassifier for MinswapV1Classifier {
    fn dex_code(&self) -> DexCode {
        DexCode::MinswapV1
    }

    fn pool_script_hashes(&self) -> &[String] {
        &self.pool_script_hashes
    }

    fn compute_swaps(&self, tx: &QualifiedTx) -> Vec<Swap> {
        let mut swaps = Vec::new();
        #[allow(clippy::cast_possible_truncation)]
        for (swap_index, pool_output) in pool_outputs(&tx.outputs, &self.pool_script_hashes)
            .into_iter()
            .enumerate()
        {
            let Some(pool_input) = matching_pool_input(&tx.inputs, &self.pool_script_hashes, pool_output) else {
                continue;
            };
            let Some((asset1_unit, asset2_unit, amount1, amount2, direction, outlier)) =
                diff_swap(pool_input, pool_output)
            else {
                continue;
            };
            swaps.push(Swap {
                tx_hash: tx.hash.clone(),
                slot: tx.slot,
                swap_index: swap_index as u32,
                dex: self.dex_code(),
                asset1_unit,
                asset2_unit,
                amount1,
                amount2,
                direction,
                outlier,
            });
        }
        swaps
    }

    fn compute_pool_reserves(&self, tx: &QualifiedTx) -> Vec<PoolReserveSnapshot> {
        pool_outputs(&tx.outputs, &self.pool_script_hashes)
            .into_iter()
            .filter_map(|pool_output| reserve_snapshot(tx, self.dex_code(), pool_output))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TxHash;

    fn qualified_tx_with_pool_swap() -> QualifiedTx {
        let pool_addr = format!("addr1w{}", POOL_SCRIPT_HASHES[0]);
        QualifiedTx {
            hash: TxHash("tx1".to_string()),
            slot: 1_000_000,
            block_index: 0,
            inputs: vec![crate::model::TxOutput {
                address: pool_addr.clone(),
                value: vec![("lovelace".to_string(), 1_000_000_000), ("policy.tokenX".to_string(), 5_050)],
                datum: None,
            }],
            outputs: vec![crate::model::TxOutput {
                address: pool_addr,
                value: vec![("lovelace".to_string(), 1_010_000_000), ("policy.tokenX".to_string(), 5_000)],
                datum: None,
            }],
            matched_script_hashes: vec![POOL_SCRIPT_HASHES[0].to_string()],
        }
    }

    #[test]
    fn computes_one_swap_from_pool_reserve_delta() {
        let classifier = MinswapV1Classifier::new();
        let swaps = classifier.compute_swaps(&qualified_tx_with_pool_swap());
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].amount1, 10_000_000);
        assert_eq!(swaps[0].amount2, 50);
    }

    #[test]
    fn computes_one_pool_reserve_row() {
        let classifier = MinswapV1Classifier::new();
        let reserves = classifier.compute_pool_reserves(&qualified_tx_with_pool_swap());
        assert_eq!(reserves.len(), 1);
        assert_eq!(reserves[0].reserve1, 1_010_000_000);
        assert_eq!(reserves[0].reserve2, 5_000);
    }

    #[test]
    fn a_batched_settlement_touching_two_pools_emits_one_swap_and_reserve_row_per_pool() {
        let classifier = MinswapV1Classifier::new();
        let pool_addr = format!("addr1w{}", POOL_SCRIPT_HASHES[0]);
        let pool_output = |unit2: &str, lovelace: i128, token: i128| crate::model::TxOutput {
            address: pool_addr.clone(),
            value: vec![("lovelace".to_string(), lovelace), (unit2.to_string(), token)],
            datum: None,
        };
        let tx = QualifiedTx {
            hash: TxHash("tx1".to_string()),
            slot: 1,
            block_index: 0,
            inputs: vec![
                pool_output("policy.a", 1_000_000_000, 5_000),
                pool_output("policy.b", 2_000_000_000, 8_000),
            ],
            outputs: vec![
                pool_output("policy.a", 1_010_000_000, 4_950),
                pool_output("policy.b", 1_990_000_000, 8_080),
            ],
            matched_script_hashes: vec![POOL_SCRIPT_HASHES[0].to_string()],
        };

        let swaps = classifier.compute_swaps(&tx);
        let reserves = classifier.compute_pool_reserves(&tx);
        assert_eq!(swaps.len(), 2);
        assert_eq!(reserves.len(), 2);
        assert_eq!(swaps[0].swap_index, 0);
        assert_eq!(swaps[1].swap_index, 1);
    }

    #[test]
    fn no_pool_output_means_no_swaps_or_reserves() {
        let classifier = MinswapV1Classifier::new();
        let tx = QualifiedTx {
            hash: TxHash("tx2".to_string()),
            slot: 1,
            block_index: 0,
            inputs: vec![],
            outputs: vec![],
            matched_script_hashes: vec![],
        };
        assert!(classifier.compute_swaps(&tx).is_empty());
        assert!(classifier.compute_pool_reserves(&tx).is_empty());
    }
}
