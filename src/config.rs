//! Configuration management for the Cardano DEX indexer.
//!
//! Loads from (in priority order) environment variables, an optional
//! properties (TOML) file, then built-in defaults (spec §6). All operations
//! return [`IndexerResult`] for uniform error handling.
//!
//! ## Environment Variables
//!
//! Required:
//! - `DATABASE_URL`: PostgreSQL connection string
//!
//! Optional (with defaults):
//! - `CONFIG_FILE`: path to a TOML properties file layered beneath env vars
//! - `UPSTREAM_ADDRESS` / `UPSTREAM_PORT`: upstream chain-sync node
//! - `CHAIN_DATA_SERVICE`: `hybrid`, `blockfrost`, `koios`, `yacistore`, `carp` (default: `hybrid`)
//! - `FALLBACK_BASE_URL`: base URL for the HTTP fallback provider
//! - `DEX_ALLOW_LIST`: comma-separated DEX codes (default: all four)
//! - `UTXO_CACHE_SIZE`: cache capacity (default: 100000)
//! - `EVENT_BUS_CAPACITY`: event bus buffer size (default: 50)
//! - `PUBLISH_EVENTS`: enable the external publisher (default: false)
//! - `RUN_MODE`: `livesync` or `historical` (default: `livesync`)
//! - `METRICS_PORT`: Prometheus metrics server port (default: 9100)
//! - `RUST_LOG`: logging level (default: "info")

use std::collections::HashMap;
use std::env;

use crate::error::{IndexerError, IndexerResult};
use crate::model::DexCode;

/// Run mode (spec §6 "run mode (`livesync` or historical)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Continuous sync from the chain tip.
    LiveSync,
    /// Bounded replay from a checkpoint.
    Historical,
}

impl RunMode {
    /// Parse a `--mode`/`RUN_MODE` value.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is neither `livesync` nor `historical`.
    pub fn parse(s: &str) -> IndexerResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "livesync" | "live-sync" | "live" => Ok(Self::LiveSync),
            "historical" => Ok(Self::Historical),
            other => Err(IndexerError::config(
                format!("RUN_MODE must be 'livesync' or 'historical', got '{other}'"),
                None,
            )),
        }
    }
}

/// Chain-data-service selection (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDataService {
    /// Cache plus configured fallback.
    Hybrid,
    /// Blockfrost-style HTTP API directly.
    Blockfrost,
    /// Koios-style HTTP API directly.
    Koios,
    /// Yaci Store local mirror.
    Yacistore,
    /// Carp local mirror.
    Carp,
}

impl ChainDataService {
    fn parse(s: &str) -> IndexerResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "blockfrost" => Ok(Self::Blockfrost),
            "koios" => Ok(Self::Koios),
            "yacistore" => Ok(Self::Yacistore),
            "carp" => Ok(Self::Carp),
            other => Err(IndexerError::config(
                format!("CHAIN_DATA_SERVICE must be one of hybrid/blockfrost/koios/yacistore/carp, got '{other}'"),
                None,
            )),
        }
    }
}

/// Runtime configuration for the indexer.
#[derive(Debug, Clone)]
pub struct Config {
    database_url: String,
    upstream_address: String,
    upstream_port: u16,
    chain_data_service: ChainDataService,
    fallback_base_url: String,
    dex_allow_list: Vec<DexCode>,
    utxo_cache_size: usize,
    event_bus_capacity: usize,
    publish_events: bool,
    run_mode: RunMode,
    metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables, an optional TOML file
    /// named by `CONFIG_FILE`, then defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing, a numeric field fails
    /// to parse, or an enum-valued field names an unrecognized variant.
    pub fn from_env() -> IndexerResult<Self> {
        dotenvy::dotenv().ok();

        let file_values = load_properties_file()?;
        let lookup = |key: &str| env::var(key).ok().or_else(|| file_values.get(key).cloned());

        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            IndexerError::config("DATABASE_URL environment variable is required", None)
        })?;

        let upstream_address =
            lookup("UPSTREAM_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string());

        let upstream_port = parse_or_default(lookup("UPSTREAM_PORT"), 3001, "UPSTREAM_PORT")?;

        let chain_data_service = lookup("CHAIN_DATA_SERVICE")
            .map(|v| ChainDataService::parse(&v))
            .transpose()?
            .unwrap_or(ChainDataService::Hybrid);

        let fallback_base_url =
            lookup("FALLBACK_BASE_URL").unwrap_or_else(|| "https://cardano-mainnet.blockfrost.io/api/v0".to_string());

        let dex_allow_list = match lookup("DEX_ALLOW_LIST") {
            Some(raw) => parse_dex_allow_list(&raw)?,
            None => vec![
                DexCode::MinswapV1,
                DexCode::MinswapV2,
                DexCode::Sundaeswap,
                DexCode::Wingriders,
            ],
        };

        let utxo_cache_size = parse_or_default(
            lookup("UTXO_CACHE_SIZE"),
            crate::cache::DEFAULT_CAPACITY,
            "UTXO_CACHE_SIZE",
        )?;

        let event_bus_capacity = parse_or_default(
            lookup("EVENT_BUS_CAPACITY"),
            crate::bus::DEFAULT_CAPACITY,
            "EVENT_BUS_CAPACITY",
        )?;

        let publish_events = lookup("PUBLISH_EVENTS")
            .unwrap_or_else(|| "false".to_string())
            .parse::<bool>()
            .map_err(|e| IndexerError::config("PUBLISH_EVENTS must be 'true' or 'false'", Some(Box::new(e))))?;

        let run_mode = lookup("RUN_MODE")
            .map(|v| RunMode::parse(&v))
            .transpose()?
            .unwrap_or(RunMode::LiveSync);

        let metrics_port = parse_or_default(lookup("METRICS_PORT"), 9100, "METRICS_PORT")?;

        Ok(Self {
            database_url,
            upstream_address,
            upstream_port,
            chain_data_service,
            fallback_base_url,
            dex_allow_list,
            utxo_cache_size,
            event_bus_capacity,
            publish_events,
            run_mode,
            metrics_port,
        })
    }

    /// PostgreSQL connection string.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Upstream chain-sync node address.
    #[must_use]
    pub fn upstream_address(&self) -> &str {
        &self.upstream_address
    }

    /// Upstream chain-sync node port.
    #[must_use]
    pub const fn upstream_port(&self) -> u16 {
        self.upstream_port
    }

    /// Selected chain-data service.
    #[must_use]
    pub const fn chain_data_service(&self) -> ChainDataService {
        self.chain_data_service
    }

    /// Base URL for the HTTP fallback provider.
    #[must_use]
    pub fn fallback_base_url(&self) -> &str {
        &self.fallback_base_url
    }

    /// Enabled DEX classifiers.
    #[must_use]
    pub fn dex_allow_list(&self) -> &[DexCode] {
        &self.dex_allow_list
    }

    /// UTXO cache capacity.
    #[must_use]
    pub const fn utxo_cache_size(&self) -> usize {
        self.utxo_cache_size
    }

    /// Event bus buffer capacity.
    #[must_use]
    pub const fn event_bus_capacity(&self) -> usize {
        self.event_bus_capacity
    }

    /// Whether the external publisher is enabled.
    #[must_use]
    pub const fn publish_events(&self) -> bool {
        self.publish_events
    }

    /// Configured run mode.
    #[must_use]
    pub const fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Metrics server port.
    #[must_use]
    pub const fn metrics_port(&self) -> u16 {
        self.metrics_port
    }
}

fn parse_or_default<T>(raw: Option<String>, default: T, field: &str) -> IndexerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .parse::<T>()
            .map_err(|e| IndexerError::config(format!("{field} must be a valid number"), Some(Box::new(e)))),
        None => Ok(default),
    }
}

fn parse_dex_allow_list(raw: &str) -> IndexerResult<Vec<DexCode>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            DexCode::parse(s).ok_or_else(|| {
                IndexerError::config(format!("DEX_ALLOW_LIST contains unrecognized DEX code '{s}'"), None)
            })
        })
        .collect()
}

fn load_properties_file() -> IndexerResult<HashMap<String, String>> {
    let Ok(path) = env::var("CONFIG_FILE") else {
        return Ok(HashMap::new());
    };
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| IndexerError::config(format!("failed to read config file {path}"), Some(Box::new(e))))?;
    let parsed: toml::Value = toml::from_str(&contents)
        .map_err(|e| IndexerError::config(format!("failed to parse config file {path}"), Some(Box::new(e))))?;

    let mut values = HashMap::new();
    if let toml::Value::Table(table) = parsed {
        for (key, value) in table {
            if let Some(s) = value.as_str() {
                values.insert(key.to_ascii_uppercase(), s.to_string());
            } else {
                values.insert(key.to_ascii_uppercase(), value.to_string());
            }
        }
    }
    Ok(values)
}
