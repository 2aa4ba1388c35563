//! Row structs returned by the persistence layer's queries.

use chrono::{DateTime, Utc};

/// A row in `asset`: unit string, surrogate id, optional metadata.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssetRow {
    /// Surrogate id.
    pub id: i64,
    /// On-chain unit string (`lovelace` for ADA).
    pub unit: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Optional decimal precision.
    pub decimals: Option<i32>,
}

/// A row in `tx`: surrogate id keyed by the transaction's hex hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TxRow {
    /// Surrogate id.
    pub id: i64,
    /// Hex-encoded transaction hash.
    pub hash: String,
}

/// A row in `price` / `latest_price`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    /// Priced asset id.
    pub asset_id: i64,
    /// Quote asset id.
    pub quote_asset_id: i64,
    /// DEX provider code.
    pub dex: String,
    /// Slot-derived time.
    pub time: DateTime<Utc>,
    /// Transaction surrogate id.
    pub tx_id: i64,
    /// Intra-transaction swap index.
    pub swap_index: i32,
    /// Price ratio.
    pub price: f64,
    /// Raw amount of the priced asset.
    pub amount1: i64,
    /// Raw amount of the quote asset.
    pub amount2: i64,
    /// `true` if asset1 was given and asset2 received.
    pub direction_asset1_to_asset2: bool,
    /// Set when the underlying swap looked anomalous.
    pub outlier: Option<bool>,
}

/// A row in `pool_reserve` / `latest_pool_reserve`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PoolReserveRow {
    /// Synthetic pool id (`asset1Unit:asset2Unit:dexCode`).
    pub pool_id: String,
    /// Asset1 surrogate id.
    pub asset1_id: i64,
    /// Asset2 surrogate id.
    pub asset2_id: i64,
    /// DEX provider code.
    pub provider: String,
    /// Slot-derived time.
    pub time: DateTime<Utc>,
    /// Reserve of asset1.
    pub reserve1: i64,
    /// Reserve of asset2.
    pub reserve2: i64,
    /// Transaction surrogate id.
    pub tx_id: i64,
}
