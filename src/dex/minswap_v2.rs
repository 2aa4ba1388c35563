//! Minswap v2 classifier.
//!
//! Minswap v2 uses a disjoint script set from v1 and additionally stamps
//! every pool datum with a constructor-0 marker; classifiers validate that
//! marker before trusting the UTXO as a genuine pool state, logging and
//! skipping (spec §4.3) rather than failing the whole transaction when a
//! datum is malformed.

use crate::dex::cbor::{constr_fields, decode_cbor};
use crate::dex::common::{diff_swap, matching_pool_input, pool_outputs, reserve_snapshot};
use crate::dex::{warn_malformed_datum, DexClassifier};
use crate::model::{DexCode, PoolReserveSnapshot, QualifiedTx, Swap, TxOutput};

/// Mainnet Minswap v2 pool validator script hashes.
const POOL_SCRIPT_HASHES: &[&str] = &["ea07b733d932129c378af627436e7cbc2ef0bf96e0036bb51b3bde7"];

/// Expected constructor tag for a valid Minswap v2 pool datum.
const POOL_DATUM_CONSTR_TAG: u64 = 0;

/// Extracts swaps and pool reserves for Minswap v2 pools.
pub struct MinswapV2Classifier {
    pool_script_hashes: Vec<String>,
}

impl MinswapV2Classifier {
    /// Build a classifier for the default set of mainnet pool scripts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool_script_hashes: POOL_SCRIPT_HASHES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn validate_pool_datum(&self, tx_hash: &str, output: &TxOutput) -> bool {
        let Some(datum_bytes) = &output.datum else {
            warn_malformed_datum(self.dex_code(), tx_hash, "pool output missing datum");
            return false;
        };
        match decode_cbor(datum_bytes).and_then(|v| {
            constr_fields(&v)
                .map(|(tag, _)| tag)
                .ok_or_else(|| crate::error::IndexerError::decoding("datum is not a constructor", None))
        }) {
            Ok(tag) if tag == POOL_DATUM_CONSTR_TAG => true,
            Ok(tag) => {
                warn_malformed_datum(self.dex_code(), tx_hash, &format!("unexpected constructor tag {tag}"));
                false
            }
            Err(e) => {
                warn_malformed_datum(self.dex_code(), tx_hash, &e.to_string());
                false
            }
        }
    }
}

impl Default for MinswapV2Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DexClassifier for MinswapV2Classifier {
    fn dex_code(&self) -> DexCode {
        DexCode::MinswapV2
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
            if !self.validate_pool_datum(&tx.hash.0, pool_output) {
                continue;
            }
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
            .filter(|output| self.validate_pool_datum(&tx.hash.0, output))
            .filter_map(|pool_output| reserve_snapshot(tx, self.dex_code(), pool_output))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TxHash;
    use ciborium::value::Value;

    fn valid_datum() -> Vec<u8> {
        let value = Value::Tag(121, Box::new(Value::Array(vec![])));
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf).unwrap();
        buf
    }

    fn qualified_tx(datum: Option<Vec<u8>>) -> QualifiedTx {
        let pool_addr = format!("addr1w{}", POOL_SCRIPT_HASHES[0]);
        QualifiedTx {
            hash: TxHash("tx1".to_string()),
            slot: 1_000_000,
            block_index: 0,
            inputs: vec![TxOutput {
                address: pool_addr.clone(),
                value: vec![("lovelace".to_string(), 1_000_000_000), ("policy.tokenX".to_string(), 5_050)],
                datum: datum.clone(),
            }],
            outputs: vec![TxOutput {
                address: pool_addr,
                value: vec![("lovelace".to_string(), 1_010_000_000), ("policy.tokenX".to_string(), 5_000)],
                datum,
            }],
            matched_script_hashes: vec![POOL_SCRIPT_HASHES[0].to_string()],
        }
    }

    #[test]
    fn valid_datum_yields_a_swap() {
        let classifier = MinswapV2Classifier::new();
        let swaps = classifier.compute_swaps(&qualified_tx(Some(valid_datum())));
        assert_eq!(swaps.len(), 1);
    }

    #[test]
    fn missing_datum_is_skipped_not_fatal() {
        let classifier = MinswapV2Classifier::new();
        let swaps = classifier.compute_swaps(&qualified_tx(None));
        assert!(swaps.is_empty());
    }

    #[test]
    fn malformed_datum_bytes_are_skipped_not_fatal() {
        let classifier = MinswapV2Classifier::new();
        let swaps = classifier.compute_swaps(&qualified_tx(Some(vec![0xff, 0xff])));
        assert!(swaps.is_empty());
    }
}
