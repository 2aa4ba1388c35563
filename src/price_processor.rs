//! Price processor: turns swaps into persistable prices (spec §4.5).
//!
//! Decimal normalization only ever applies to the lovelace side, which is
//! always 6 decimals (spec §3 "Asset"); the non-lovelace side's decimals are
//! not resolvable without the asset registry this indexer doesn't carry, so
//! it is treated as 0 decimals, matching the raw-amount convention already
//! used by `dex::common::diff_swap`.

use crate::dex::common::LOVELACE_DECIMALS;
use crate::model::{Price, Swap, SLOT_CONVERSION_OFFSET};

/// Convert a swap into its persisted price row.
///
/// `asset_unit`/`quote_asset_unit` follow the swap's own asset1/asset2
/// assignment (asset1 is always lovelace, spec §4.3): the non-lovelace side
/// is the priced asset, lovelace is the quote.
#[must_use]
pub fn swap_to_price(swap: &Swap) -> Price {
    let amount1_normalized = normalize(swap.amount1, LOVELACE_DECIMALS);
    let amount2_normalized = normalize(swap.amount2, 0);

    let price = if amount2_normalized == 0.0 {
        0.0
    } else {
        amount1_normalized / amount2_normalized
    };

    Price {
        asset_unit: swap.asset2_unit.clone(),
        quote_asset_unit: swap.asset1_unit.clone(),
        dex: swap.dex,
        time: slot_to_time(swap.slot),
        tx_hash: swap.tx_hash.clone(),
        swap_index: swap.swap_index,
        price,
        amount1: swap.amount1,
        amount2: swap.amount2,
        direction: swap.direction,
        outlier: swap.outlier,
    }
}

/// Convert every swap in a block into its price, in the same order.
#[must_use]
pub fn swaps_to_prices(swaps: &[Swap]) -> Vec<Price> {
    swaps.iter().map(swap_to_price).collect()
}

#[allow(clippy::cast_precision_loss)]
fn normalize(amount: i128, decimals: u32) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

#[allow(clippy::cast_possible_wrap)]
fn slot_to_time(slot: crate::model::Slot) -> i64 {
    slot as i64 - SLOT_CONVERSION_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DexCode, SwapDirection, TxHash};

    #[test]
    fn single_minswap_swap_prices_at_point_two() {
        // Spec §8 scenario 2: 10 ADA for 50 X -> price 0.2.
        let swap = Swap {
            tx_hash: TxHash("tx1".to_string()),
            slot: 1_596_491_091,
            swap_index: 0,
            dex: DexCode::MinswapV1,
            asset1_unit: "lovelace".to_string(),
            asset2_unit: "policy.x".to_string(),
            amount1: 10_000_000,
            amount2: 50,
            direction: SwapDirection::Asset1ToAsset2,
            outlier: false,
        };

        let price = swap_to_price(&swap);
        assert_eq!(price.asset_unit, "policy.x");
        assert_eq!(price.quote_asset_unit, "lovelace");
        assert!((price.price - 0.2).abs() < 1e-9);
        assert_eq!(price.time, 0);
    }

    #[test]
    fn zero_amount2_does_not_divide_by_zero() {
        let swap = Swap {
            tx_hash: TxHash("tx1".to_string()),
            slot: 1,
            swap_index: 0,
            dex: DexCode::MinswapV1,
            asset1_unit: "lovelace".to_string(),
            asset2_unit: "policy.x".to_string(),
            amount1: 10_000_000,
            amount2: 0,
            direction: SwapDirection::Asset1ToAsset2,
            outlier: true,
        };
        let price = swap_to_price(&swap);
        assert_eq!(price.price, 0.0);
    }

    #[test]
    fn swaps_to_prices_preserves_order() {
        let swaps = vec![
            Swap {
                tx_hash: TxHash("a".to_string()),
                slot: 1,
                swap_index: 0,
                dex: DexCode::MinswapV1,
                asset1_unit: "lovelace".to_string(),
                asset2_unit: "policy.x".to_string(),
                amount1: 1,
                amount2: 1,
                direction: SwapDirection::Asset1ToAsset2,
                outlier: false,
            },
            Swap {
                tx_hash: TxHash("b".to_string()),
                slot: 2,
                swap_index: 0,
                dex: DexCode::Sundaeswap,
                asset1_unit: "lovelace".to_string(),
                asset2_unit: "policy.y".to_string(),
                amount1: 1,
                amount2: 1,
                direction: SwapDirection::Asset1ToAsset2,
                outlier: false,
            },
        ];
        let prices = swaps_to_prices(&swaps);
        assert_eq!(prices[0].tx_hash.0, "a");
        assert_eq!(prices[1].tx_hash.0, "b");
    }
}
