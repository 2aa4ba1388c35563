//! SQL-mirror chain-data fallback provider (spec §6: "local mirror").
//!
//! Resolves outputs from a read-only mirror of chain UTXOs maintained by a
//! separate ingestion process, queried through the same connection pool
//! used for persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::chain::ChainDataProvider;
use crate::error::{IndexerError, IndexerResult};
use crate::model::{OutputRef, Slot, TxOutput, Value};

/// A chain-data fallback provider backed by a local Postgres UTXO mirror.
pub struct SqlMirrorProvider {
    pool: PgPool,
}

impl SqlMirrorProvider {
    /// Build a provider over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChainDataProvider for SqlMirrorProvider {
    #[instrument(skip(self, refs), fields(count = refs.len()))]
    async fn resolve_inputs(&self, refs: &[OutputRef]) -> IndexerResult<Vec<TxOutput>> {
        let mut resolved = Vec::with_capacity(refs.len());
        for reference in refs {
            let row = sqlx::query_as::<_, (String, serde_json::Value, Option<Vec<u8>>)>(
                r"
                SELECT address, value, datum
                FROM utxo_mirror
                WHERE tx_hash = $1 AND output_index = $2
                ",
            )
            .bind(&reference.tx_hash.0)
            .bind(i64::from(reference.index))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::chain_data("sql mirror lookup failed", Some(Box::new(e)))
            })?;

            if let Some((address, value_json, datum)) = row {
                let value: Value = serde_json::from_value(value_json).unwrap_or_default();
                resolved.push(TxOutput {
                    address,
                    value,
                    datum,
                });
            }
        }
        Ok(resolved)
    }

    async fn find_block_nearest(&self, slot: Slot) -> IndexerResult<Option<Slot>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT slot FROM block_mirror WHERE slot <= $1 ORDER BY slot DESC LIMIT 1
            ",
        )
        .bind(i64::try_from(slot).unwrap_or(i64::MAX))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IndexerError::chain_data("sql mirror block lookup failed", Some(Box::new(e))))?;

        Ok(row.map(|(s,)| u64::try_from(s).unwrap_or_default()))
    }
}
