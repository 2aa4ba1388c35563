//! Shared extraction helpers used by every constant-product AMM classifier.
//!
//! Every supported protocol (Minswap v1/v2, SundaeSwap, WingRiders) is a
//! constant-product pool whose state lives in the value carried by its pool
//! UTXO. What differs between protocols is which script hashes identify a
//! pool output and what, if anything, the attached datum encodes beyond the
//! reserves themselves — so the reserve/swap arithmetic is factored out
//! here and each classifier supplies only its own identification logic.

use crate::model::{DexCode, PoolReserveSnapshot, QualifiedTx, SwapDirection, TxOutput, Value};

/// ADA's canonical unit string (spec §3: "`lovelace` denotes the native coin").
pub const LOVELACE: &str = "lovelace";

/// ADA has 6 decimal places; the second pool asset's decimals are generally
/// unknown at the classifier layer (spec §4.5: "normalized ... when known").
pub const LOVELACE_DECIMALS: u32 = 6;

/// Find every output whose address is controlled by one of `hashes`, in
/// output order.
///
/// Wire-level address decoding is out of scope (spec §1); this treats a
/// configured script hash as a substring match against the bech32 address,
/// which is how the pool-qualification step (spec §4.4) narrows candidate
/// outputs before a classifier ever sees them. Pools of a given protocol
/// commonly share one validator address, so a batch settlement touching N
/// pools carries N such outputs interleaved with ordinary wallet outputs
/// (spec §4.3: "Transactions touching multiple pools -> emit one swap (and
/// one reserve row) per touched pool").
#[must_use]
pub fn pool_outputs<'a>(outputs: &'a [TxOutput], hashes: &[String]) -> Vec<&'a TxOutput> {
    outputs
        .iter()
        .filter(|o| hashes.iter().any(|h| o.address.contains(h.as_str())))
        .collect()
}

/// Match a pool output to the pool input carrying the same asset pair.
///
/// Since pools of a given protocol commonly share one validator address,
/// the second asset's unit (the pool-specific native asset) is what
/// distinguishes one pool's input from another's when a transaction
/// settles several pools at once.
#[must_use]
pub fn matching_pool_input<'a>(
    inputs: &'a [TxOutput],
    hashes: &[String],
    output: &TxOutput,
) -> Option<&'a TxOutput> {
    let (_, _, out_unit2, _) = asset_pair_from_value(&output.value)?;
    inputs.iter().find(|i| {
        hashes.iter().any(|h| i.address.contains(h.as_str()))
            && asset_pair_from_value(&i.value)
                .map(|(_, _, unit2, _)| unit2 == out_unit2)
                .unwrap_or(false)
    })
}

/// Pull the lovelace amount and the first non-lovelace native asset amount
/// out of a UTXO's value, in that order.
#[must_use]
pub fn asset_pair_from_value(value: &Value) -> Option<(String, i128, String, i128)> {
    let lovelace = value.iter().find(|(unit, _)| unit == LOVELACE)?.1;
    let (unit2, amount2) = value.iter().find(|(unit, _)| unit != LOVELACE)?;
    Some((LOVELACE.to_string(), lovelace, unit2.clone(), *amount2))
}

/// Build the pool-reserve snapshot for a transaction that touches a single
/// pool (spec §4.3: "Transactions touching multiple pools -> emit one swap
/// (and one reserve row) per touched pool" — callers loop over each touched
/// pool output and call this once per output).
#[must_use]
pub fn reserve_snapshot(
    tx: &QualifiedTx,
    dex: DexCode,
    pool_output: &TxOutput,
) -> Option<PoolReserveSnapshot> {
    let (asset1_unit, reserve1, asset2_unit, reserve2) = asset_pair_from_value(&pool_output.value)?;
    Some(PoolReserveSnapshot {
        tx_hash: tx.hash.clone(),
        slot: tx.slot,
        block_index: tx.block_index,
        dex,
        asset1_unit,
        asset2_unit,
        reserve1,
        reserve2,
    })
}

/// Derive a swap from the reserve delta between the pool's input state (its
/// state before this transaction) and output state (its state after).
///
/// Returns `None` when there is no prior pool input to diff against (e.g.
/// the pool's first-ever transaction), matching spec §4.3's instruction that
/// a classifier simply emits nothing rather than fabricating a swap.
#[must_use]
pub fn diff_swap(
    pool_input: &TxOutput,
    pool_output: &TxOutput,
) -> Option<(String, String, i128, i128, SwapDirection, bool)> {
    let (_, reserve1_before, _, reserve2_before) = asset_pair_from_value(&pool_input.value)?;
    let (asset1_unit, reserve1_after, asset2_unit, reserve2_after) =
        asset_pair_from_value(&pool_output.value)?;

    let delta1 = reserve1_after - reserve1_before;
    let delta2 = reserve2_after - reserve2_before;

    let direction = if delta1 > 0 {
        SwapDirection::Asset1ToAsset2
    } else {
        SwapDirection::Asset2ToAsset1
    };
    let outlier = delta1 == 0 || delta2 == 0;

    Some((asset1_unit, asset2_unit, delta1.abs(), delta2.abs(), direction, outlier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_pair_from_value_picks_lovelace_and_first_native_asset() {
        let value: Value = vec![
            ("lovelace".to_string(), 10_000_000),
            ("policy.tokenX".to_string(), 50),
        ];
        let (unit1, amount1, unit2, amount2) = asset_pair_from_value(&value).unwrap();
        assert_eq!(unit1, "lovelace");
        assert_eq!(amount1, 10_000_000);
        assert_eq!(unit2, "policy.tokenX");
        assert_eq!(amount2, 50);
    }

    #[test]
    fn diff_swap_computes_reserve_delta_as_swap_amounts() {
        let pool_input = TxOutput {
            address: "addr_pool".to_string(),
            value: vec![("lovelace".to_string(), 1_000_000_000), ("policy.x".to_string(), 5_000)],
            datum: None,
        };
        let pool_output = TxOutput {
            address: "addr_pool".to_string(),
            value: vec![("lovelace".to_string(), 1_010_000_000), ("policy.x".to_string(), 4_950)],
            datum: None,
        };
        let (a1, a2, amt1, amt2, dir, outlier) = diff_swap(&pool_input, &pool_output).unwrap();
        assert_eq!(a1, "lovelace");
        assert_eq!(a2, "policy.x");
        assert_eq!(amt1, 10_000_000);
        assert_eq!(amt2, 50);
        assert!(matches!(dir, SwapDirection::Asset1ToAsset2));
        assert!(!outlier);
    }

    #[test]
    fn diff_swap_flags_zero_delta_as_outlier() {
        let pool_input = TxOutput {
            address: "addr_pool".to_string(),
            value: vec![("lovelace".to_string(), 1_000_000_000), ("policy.x".to_string(), 5_000)],
            datum: None,
        };
        let pool_output = pool_input.clone();
        let (.., outlier) = diff_swap(&pool_input, &pool_output).unwrap();
        assert!(outlier);
    }
}
