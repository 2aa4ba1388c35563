//! Domain model shared by every layer of the pipeline.
//!
//! Block and transaction shapes here represent what an embedded block-sync
//! library would hand the dispatcher after wire-level decoding (out of scope
//! per spec §1) — this module defines the typed surface the rest of the
//! crate is built against, not a CBOR/wire decoder.

use std::fmt;

/// A monotonic chain slot.
pub type Slot = u64;

/// `time (seconds) = slot - slotConversionOffset` (spec GLOSSARY). Cardano
/// mainnet's Shelley-era genesis: slot 0 = unix time 1_596_491_091.
pub const SLOT_CONVERSION_OFFSET: i64 = 1_596_491_091;

/// A transaction hash, hex-encoded for display and storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a UTXO: `(txHash, outputIndex)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRef {
    /// Hash of the transaction that produced this output.
    pub tx_hash: TxHash,
    /// Index of the output within that transaction's outputs.
    pub index: u32,
}

impl OutputRef {
    /// Build a reference from its components.
    #[must_use]
    pub fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }

    /// The `txHash#outputIndex` cache key used throughout the spec.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}#{}", self.tx_hash, self.index)
    }
}

/// A decoded on-chain value: a list of `(asset unit, amount)` pairs.
///
/// `lovelace` denotes the native coin (spec §3 "Asset").
pub type Value = Vec<(String, i128)>;

/// An optional attached Plutus datum, as raw CBOR bytes.
pub type Datum = Option<Vec<u8>>;

/// A resolved transaction output: address, value, optional datum.
#[derive(Debug, Clone)]
pub struct TxOutput {
    /// Bech32 address (or the raw script hash-derived address).
    pub address: String,
    /// Native coin and native-asset amounts carried by this output.
    pub value: Value,
    /// Attached datum, if any.
    pub datum: Datum,
}

/// A fully-qualified transaction: everything a classifier needs.
///
/// Inputs have already been resolved via the chain-data provider (spec
/// §4.3: "hash, matched dex credential, block slot, resolved inputs,
/// outputs, witnesses").
#[derive(Debug, Clone)]
pub struct QualifiedTx {
    /// The transaction's hash.
    pub hash: TxHash,
    /// The block slot this transaction was included in.
    pub slot: Slot,
    /// Index of this transaction within its block, used for tie-breaking
    /// when multiple transactions touch the same pool in one block.
    pub block_index: u32,
    /// Resolved inputs, in the transaction's own input order.
    pub inputs: Vec<TxOutput>,
    /// Outputs, in the transaction's own output order.
    pub outputs: Vec<TxOutput>,
    /// Script hashes (or matching pool credentials) this transaction touched.
    pub matched_script_hashes: Vec<String>,
}

/// A transaction body as delivered by the upstream block-sync feed, before
/// input resolution.
#[derive(Debug, Clone)]
pub struct TxBody {
    /// The transaction's hash.
    pub hash: TxHash,
    /// References to this transaction's inputs (not yet resolved).
    pub input_refs: Vec<OutputRef>,
    /// This transaction's own outputs.
    pub outputs: Vec<TxOutput>,
}

/// A block as delivered by the upstream block-sync feed.
#[derive(Debug, Clone)]
pub struct Block {
    /// The block's slot number.
    pub slot: Slot,
    /// Transaction bodies, in block order.
    pub transactions: Vec<TxBody>,
}

/// The set of supported DEX protocols (spec §4.3, extensible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DexCode {
    /// Minswap v1 constant-product AMM.
    MinswapV1,
    /// Minswap v2 constant-product AMM (separate script set from v1).
    MinswapV2,
    /// Sundaeswap constant-product AMM.
    Sundaeswap,
    /// WingRiders constant-product AMM.
    Wingriders,
}

impl DexCode {
    /// Short machine-readable code, as persisted in `price.dex` / `pool_reserve.provider`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MinswapV1 => "minswap",
            Self::MinswapV2 => "minswap_v2",
            Self::Sundaeswap => "sundaeswap",
            Self::Wingriders => "wingriders",
        }
    }

    /// Human-readable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MinswapV1 => "Minswap",
            Self::MinswapV2 => "Minswap V2",
            Self::Sundaeswap => "SundaeSwap",
            Self::Wingriders => "WingRiders",
        }
    }

    /// Parse a configuration allow-list entry into a `DexCode`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minswap" | "minswap_v1" => Some(Self::MinswapV1),
            "minswap_v2" => Some(Self::MinswapV2),
            "sundaeswap" | "sundae" => Some(Self::Sundaeswap),
            "wingriders" => Some(Self::Wingriders),
            _ => None,
        }
    }
}

impl fmt::Display for DexCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which side of the pool was bought in a swap (spec §3 "direction flag").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// Asset1 was given, asset2 was received.
    Asset1ToAsset2,
    /// Asset2 was given, asset1 was received.
    Asset2ToAsset1,
}

/// A transient swap value, produced by a classifier and consumed by the
/// price processor (spec §3 "Swap").
#[derive(Debug, Clone)]
pub struct Swap {
    /// Hash of the transaction this swap occurred in.
    pub tx_hash: TxHash,
    /// Block slot the swap occurred in.
    pub slot: Slot,
    /// Index of this swap within its transaction (for multi-pool transactions).
    pub swap_index: u32,
    /// DEX protocol that produced this swap.
    pub dex: DexCode,
    /// Unit of the first asset.
    pub asset1_unit: String,
    /// Unit of the second asset.
    pub asset2_unit: String,
    /// Amount of asset1 involved.
    pub amount1: i128,
    /// Amount of asset2 involved.
    pub amount2: i128,
    /// Direction of the swap.
    pub direction: SwapDirection,
    /// Whether this swap looks anomalous (zero amount, self-trade) and
    /// should be flagged as an outlier downstream (spec §4.3).
    pub outlier: bool,
}

/// A pool reserve snapshot, as observed in a pool-output UTXO (spec §3
/// "PoolReserve").
#[derive(Debug, Clone)]
pub struct PoolReserveSnapshot {
    /// Hash of the transaction that produced this snapshot.
    pub tx_hash: TxHash,
    /// Block slot the snapshot occurred in.
    pub slot: Slot,
    /// Index of this transaction within its block (used to keep "last
    /// write wins" deterministic when two transactions touch the same
    /// pool in one block).
    pub block_index: u32,
    /// DEX protocol that owns this pool.
    pub dex: DexCode,
    /// Unit of the first asset.
    pub asset1_unit: String,
    /// Unit of the second asset.
    pub asset2_unit: String,
    /// Reserve of asset1 after this transaction.
    pub reserve1: i128,
    /// Reserve of asset2 after this transaction.
    pub reserve2: i128,
}

impl PoolReserveSnapshot {
    /// The synthetic pool id: `asset1Unit:asset2Unit:dexCode` (spec §3).
    #[must_use]
    pub fn pool_id(&self) -> String {
        format!("{}:{}:{}", self.asset1_unit, self.asset2_unit, self.dex)
    }
}

/// A persisted price row (spec §3 "Price").
#[derive(Debug, Clone)]
pub struct Price {
    /// Unit of the priced asset.
    pub asset_unit: String,
    /// Unit of the quote asset.
    pub quote_asset_unit: String,
    /// DEX provider code.
    pub dex: DexCode,
    /// Slot-derived time in seconds.
    pub time: i64,
    /// Hash of the transaction that produced this price.
    pub tx_hash: TxHash,
    /// Intra-transaction swap index.
    pub swap_index: u32,
    /// Price ratio (decimal-normalized when asset decimals are known).
    pub price: f64,
    /// Raw amount of the priced asset.
    pub amount1: i128,
    /// Raw amount of the quote asset.
    pub amount2: i128,
    /// Direction of the underlying swap.
    pub direction: SwapDirection,
    /// Set when the underlying swap looked anomalous.
    pub outlier: bool,
}

// i128 amounts are serialized as decimal strings: JSON numbers lose
// precision above 2^53 and an external JSON sink (spec §6) must not
// silently truncate a swap amount.
impl serde::Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Price", 11)?;
        state.serialize_field("asset_unit", &self.asset_unit)?;
        state.serialize_field("quote_asset_unit", &self.quote_asset_unit)?;
        state.serialize_field("dex", self.dex.code())?;
        state.serialize_field("time", &self.time)?;
        state.serialize_field("tx_hash", &self.tx_hash.0)?;
        state.serialize_field("swap_index", &self.swap_index)?;
        state.serialize_field("price", &self.price)?;
        state.serialize_field("amount1", &self.amount1.to_string())?;
        state.serialize_field("amount2", &self.amount2.to_string())?;
        state.serialize_field(
            "direction",
            match self.direction {
                SwapDirection::Asset1ToAsset2 => "asset1_to_asset2",
                SwapDirection::Asset2ToAsset1 => "asset2_to_asset1",
            },
        )?;
        state.serialize_field("outlier", &self.outlier)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_ref_cache_key_matches_spec_format() {
        let r = OutputRef::new(TxHash("abc123".to_string()), 2);
        assert_eq!(r.cache_key(), "abc123#2");
    }

    #[test]
    fn dex_code_round_trips_through_parse_and_code() {
        for dex in [
            DexCode::MinswapV1,
            DexCode::MinswapV2,
            DexCode::Sundaeswap,
            DexCode::Wingriders,
        ] {
            assert_eq!(DexCode::parse(dex.code()), Some(dex));
        }
    }

    #[test]
    fn dex_code_parse_is_case_insensitive() {
        assert_eq!(DexCode::parse("WingRiders"), Some(DexCode::Wingriders));
        assert_eq!(DexCode::parse("unknown-dex"), None);
    }

    #[test]
    fn pool_id_matches_spec_synthetic_format() {
        let snapshot = PoolReserveSnapshot {
            tx_hash: TxHash("deadbeef".to_string()),
            slot: 100,
            block_index: 0,
            dex: DexCode::MinswapV1,
            asset1_unit: "lovelace".to_string(),
            asset2_unit: "policy.tokenX".to_string(),
            reserve1: 1_000,
            reserve2: 2_000,
        };
        assert_eq!(snapshot.pool_id(), "lovelace:policy.tokenX:minswap");
    }
}
