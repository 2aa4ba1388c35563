//! Persistence layer (spec §4.6): batched upserts for assets, transactions,
//! prices, and pool reserves against a PostgreSQL-compatible store.
//!
//! # Architecture
//!
//! - `models`: row structs returned by query_as
//! - `repository`: the batched-upsert operations that are the only path
//!   through which anything is written to the database
//! - Connection pooling via `sqlx::PgPool`; migrations applied at startup

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use crate::error::{IndexerError, IndexerResult};

pub mod models;
pub mod repository;

pub use repository::PersistenceLayer;

/// Bounded connection pool (spec §5: "Database connection pool (bounded,
/// default 20)").
const MAX_CONNECTIONS: u32 = 20;

/// Create a PostgreSQL connection pool, run pending migrations, and verify
/// the expected tables exist.
pub async fn create_pool(database_url: &str) -> IndexerResult<PgPool> {
    info!(database_url, "connecting to database");

    let options: PgConnectOptions = database_url
        .parse()
        .map_err(|e| IndexerError::database(format!("invalid database URL: {database_url}"), Some(Box::new(e))))?;

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| IndexerError::database(format!("failed to connect to database at {database_url}"), Some(Box::new(e))))?;

    info!("running database migrations");
    run_migrations(&pool).await?;
    verify_database(&pool).await?;
    info!("database migrations complete");

    Ok(pool)
}

/// Run all pending migrations from `./migrations`.
pub async fn run_migrations(pool: &PgPool) -> IndexerResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| IndexerError::database("failed to run database migrations", Some(Box::new(e))))?;
    Ok(())
}

/// Verify the pipeline's required tables exist after migration.
pub async fn verify_database(pool: &PgPool) -> IndexerResult<()> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r"
        SELECT table_name FROM information_schema.tables
        WHERE table_schema = 'public'
        AND table_name IN ('asset', 'tx', 'price', 'latest_price', 'pool_reserve', 'latest_pool_reserve')
        ",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| IndexerError::database("failed to verify database schema", Some(Box::new(e))))?;

    if rows.len() < 6 {
        return Err(IndexerError::database(
            format!("database schema incomplete: expected 6 tables, found {}", rows.len()),
            None,
        ));
    }

    Ok(())
}
