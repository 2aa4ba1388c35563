//! WingRiders classifier.
//!
//! Grounded in the `BaseDex`-style WingRiders v2 extractor from the wider
//! Cardano DEX corpus: pool datums carry the LP token policy id as their
//! first constructor field, which is checked against the configured LP
//! policy before trusting the output as a genuine pool state.

use crate::dex::cbor::{constr_fields, decode_cbor, value_to_hex};
use crate::dex::common::{diff_swap, matching_pool_input, pool_outputs, reserve_snapshot};
use crate::dex::{warn_malformed_datum, DexClassifier};
use crate::model::{DexCode, PoolReserveSnapshot, QualifiedTx, Swap, TxOutput};

/// Mainnet WingRiders pool validator script hashes.
const POOL_SCRIPT_HASHES: &[&str] = &["c101e3f15cf1e6ddbb4971d369b0848a08cbe6f38b66ec4fcf7e38b8"];

/// WingRiders LP token policy id, checked against the pool datum's first field.
const LP_TOKEN_POLICY_ID: &str = "026a18d04a0c642759bb3d83b12e3344894e5c1c7b2aeb1a2113a570";

/// Extracts swaps and pool reserves for WingRiders pools.
pub struct WingridersClassifier {
    pool_script_hashes: Vec<String>,
}

impl WingridersClassifier {
    /// Build a classifier for the default set of mainnet pool scripts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool_script_hashes: POOL_SCRIPT_HASHES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn validate_lp_policy(&self, tx_hash: &str, output: &TxOutput) -> bool {
        let Some(datum_bytes) = &output.datum else {
            warn_malformed_datum(self.dex_code(), tx_hash, "pool output missing datum");
            return false;
        };
        let decoded = match decode_cbor(datum_bytes) {
            Ok(v) => v,
            Err(e) => {
                warn_malformed_datum(self.dex_code(), tx_hash, &e.to_string());
                return false;
            }
        };
        let Some((_, fields)) = constr_fields(&decoded) else {
            warn_malformed_datum(self.dex_code(), tx_hash, "datum is not a constructor");
            return false;
        };
        match fields.first().and_then(value_to_hex) {
            Some(policy) if policy == LP_TOKEN_POLICY_ID => true,
            Some(other) => {
                warn_malformed_datum(self.dex_code(), tx_hash, &format!("unexpected LP policy {other}"));
                false
            }
            None => {
                warn_malformed_datum(self.dex_code(), tx_hash, "datum missing LP policy field");
                false
            }
        }
    }
}

impl Default for WingridersClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DexClassifier for WingridersClassifier {
    fn dex_code(&self) -> DexCode {
        DexCode::Wingriders
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
            if !self.validate_lp_policy(&tx.hash.0, pool_output) {
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
            .filter(|output| self.validate_lp_policy(&tx.hash.0, output))
            .filter_map(|pool_output| reserve_snapshot(tx, self.dex_code(), pool_output))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TxHash;
    use ciborium::value::Value;

    fn datum_with_policy(policy_hex: &str) -> Vec<u8> {
        let bytes = hex::decode(policy_hex).unwrap();
        let value = Value::Tag(121, Box::new(Value::Array(vec![Value::Bytes(bytes)])));
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf).unwrap();
        buf
    }

    fn qualified_tx(datum: Option<Vec<u8>>) -> QualifiedTx {
        let pool_addr = format!("addr1w{}", POOL_SCRIPT_HASHES[0]);
        QualifiedTx {
            hash: TxHash("tx1".to_string()),
            slot: 1,
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
    fn correct_lp_policy_yields_a_swap() {
        let classifier = WingridersClassifier::new();
        let swaps = classifier.compute_swaps(&qualified_tx(Some(datum_with_policy(LP_TOKEN_POLICY_ID))));
        assert_eq!(swaps.len(), 1);
    }

    #[test]
    fn wrong_lp_policy_is_skipped_not_fatal() {
        let classifier = WingridersClassifier::new();
        let swaps = classifier.compute_swaps(&qualified_tx(Some(datum_with_policy(
            "000000000000000000000000000000000000000000000000000000",
        ))));
        assert!(swaps.is_empty());
    }
}
