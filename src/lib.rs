//! # Cardano DEX Indexer
//!
//! Streaming indexer that turns a continuous Cardano block feed into
//! per-swap prices and pool reserve snapshots, persisted into a
//! PostgreSQL-compatible store for downstream price/volume/TVL services.
//!
//! ## Architecture
//!
//! The crate is organized around the pipeline described in the spec:
//! - `model`: shared domain types (blocks, swaps, prices, pool reserves)
//! - `cache` / `chain`: UTXO resolution (bounded cache + hybrid fallback)
//! - `dex`: per-protocol classifiers (Minswap v1/v2, Sundaeswap, WingRiders)
//! - `swap_processor` / `price_processor`: per-block swap and price derivation
//! - `events` / `bus` / `dispatcher`: the tagged-union event pipeline
//! - `chain_service`: upstream sync session, barrier, and rollback handling
//! - `db`: batched Postgres persistence
//! - `publisher` / `metrics`: external price forwarding and counters
//! - `config` / `cli`: configuration loading and process entry points

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bus;
pub mod cache;
pub mod chain;
pub mod chain_service;
pub mod cli;
pub mod config;
pub mod db;
pub mod dex;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod metrics;
pub mod model;
pub mod observability;
pub mod price_processor;
pub mod publisher;
pub mod swap_processor;
