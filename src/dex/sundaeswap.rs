//! SundaeSwap classifier.
//!
//! SundaeSwap batches settlements, so a single transaction commonly touches
//! several pools at once; this classifier walks every qualifying output
//! rather than stopping at the first match (spec §4.3: "Transactions
//! touching multiple pools -> emit one swap (and one reserve row) per
//! touched pool").

use crate::dex::common::{diff_swap, matching_pool_input, pool_outputs, reserve_snapshot};
use crate::dex::DexClassifier;
use crate::model::{DexCode, PoolReserveSnapshot, QualifiedTx, Swap};

/// Mainnet SundaeSwap pool validator script hashes.
const POOL_SCRIPT_HASHES: &[&str] = &["4020e7fc2de75a0729c3cc1a9b600dd8a3c2398772efe7df9b9a1e2"];

/// Extracts swaps and pool reserves for SundaeSwap pools.
pub struct SundaeswapClassifier {
    pool_script_hashes: Vec<String>,
}

impl SundaeswapClassifier {
    /// Build a classifier for the default set of mainnet pool scripts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool_script_hashes: POOL_SCRIPT_HASHES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Default for SundaeswapClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DexClassifier for SundaeswapClassifier {
    fn dex_code(&self) -> DexCode {
        DexCode::Sundaeswap
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
            .filter_map(|output| reserve_snapshot(tx, self.dex_code(), output))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TxHash, TxOutput};

    fn pool_output(hash: &str, unit2: &str, lovelace: i128, token: i128) -> TxOutput {
        TxOutput {
            address: format!("addr1w{hash}"),
            value: vec![("lovelace".to_string(), lovelace), (unit2.to_string(), token)],
            datum: None,
        }
    }

    #[test]
    fn emits_one_swap_and_one_reserve_row_per_touched_pool() {
        let classifier = SundaeswapClassifier::new();
        let hash = POOL_SCRIPT_HASHES[0];
        let tx = QualifiedTx {
            hash: TxHash("tx1".to_string()),
            slot: 1,
            block_index: 0,
            inputs: vec![
                pool_output(hash, "policy.a", 1_000_000_000, 5_000),
                pool_output(hash, "policy.b", 2_000_000_000, 8_000),
            ],
            outputs: vec![
                pool_output(hash, "policy.a", 1_010_000_000, 4_950),
                pool_output(hash, "policy.b", 1_990_000_000, 8_080),
            ],
            matched_script_hashes: vec![hash.to_string()],
        };

        let swaps = classifier.compute_swaps(&tx);
        let reserves = classifier.compute_pool_reserves(&tx);
        assert_eq!(swaps.len(), 2);
        assert_eq!(reserves.len(), 2);
    }
}
