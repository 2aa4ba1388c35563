//! Command-line interface for the Cardano DEX indexer.
//!
//! # Commands
//!
//! - `run --mode livesync|historical [--from-point <slot>]`: boots the chain
//!   service, event bus, dispatcher, and persistence layer and runs until
//!   shutdown.
//! - `migrate`: applies pending database migrations and exits.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::bus::EventBus;
use crate::chain::hybrid::HybridResolver;
use crate::chain::http::HttpFallbackProvider;
use crate::chain_service::ChainService;
use crate::config::Config;
use crate::db;
use crate::dex::ClassifierRegistry;
use crate::dispatcher::Dispatcher;
use crate::error::{IndexerError, IndexerResult};
use crate::metrics::Metrics;
use crate::publisher::ExternalPublisher;
use crate::swap_processor::SwapProcessor;

/// Cardano DEX indexer.
#[derive(Parser, Debug)]
#[command(name = "cardano-dex-indexer")]
#[command(about = "Streaming Cardano DEX swap and pool-reserve indexer", long_about = None)]
#[command(version)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the indexing pipeline until shutdown.
    Run {
        /// Sync mode: `livesync` or `historical`.
        #[arg(long, default_value = "livesync")]
        mode: String,

        /// Slot to start syncing from, overriding the persisted checkpoint.
        #[arg(long)]
        from_point: Option<u64>,
    },

    /// Apply pending database migrations and exit.
    Migrate,
}

/// Parse CLI arguments and execute the appropriate command.
///
/// # Errors
///
/// Returns an error if configuration loading, database connection, or
/// pipeline execution fails.
pub async fn run() -> IndexerResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { mode, from_point } => run_pipeline(&mode, from_point).await,
        Commands::Migrate => run_migrate().await,
    }
}

async fn run_migrate() -> IndexerResult<()> {
    let config = Config::from_env()?;
    let pool = db::create_pool(config.database_url()).await?;
    db::run_migrations(&pool).await?;
    info!("migrations applied");
    Ok(())
}

async fn run_pipeline(mode_override: &str, from_point: Option<u64>) -> IndexerResult<()> {
    let config = Config::from_env()?;
    let run_mode = crate::config::RunMode::parse(mode_override)?;
    info!(?run_mode, from_point, "starting indexer");

    let pool = db::create_pool(config.database_url()).await?;
    let persistence = Arc::new(db::PersistenceLayer::new(pool));

    let cache = Arc::new(crate::cache::UtxoCache::new(config.utxo_cache_size()));
    let fallback = Arc::new(HttpFallbackProvider::new(config.fallback_base_url().to_string()));
    let resolver = Arc::new(HybridResolver::new(cache.clone(), fallback));

    let registry = Arc::new(ClassifierRegistry::new(config.dex_allow_list()));
    let swap_processor = Arc::new(SwapProcessor::new(registry, resolver.clone()));

    let (bus, subscriber) = EventBus::new(config.event_bus_capacity());
    let publisher = Arc::new(ExternalPublisher::new(
        format!("{}/prices", config.fallback_base_url()),
        config.publish_events(),
    ));
    let metrics = Arc::new(Metrics::new());

    let metrics_handle = tokio::spawn(crate::metrics::serve(config.metrics_port(), metrics.clone(), None));

    // Wire-level block decoding is an upstream library's job (spec §1); this
    // process wires its own resolver/dispatcher/persistence stack and leaves
    // `BlockSource` as the integration seam a deployment plugs a decoding
    // library into (e.g. a node's chain-sync mini-protocol client).
    let source: Arc<dyn crate::chain_service::BlockSource> = Arc::new(crate::chain::node::NodeBlockSource::new(
        config.upstream_address().to_string(),
        config.upstream_port(),
    ));
    let chain_service = Arc::new(ChainService::new(source, resolver, bus.clone()));

    let dispatcher = Arc::new(Dispatcher::new(
        bus,
        swap_processor,
        cache,
        persistence,
        publisher,
        chain_service.clone(),
        metrics,
        config.publish_events(),
    ));

    let dispatcher_handle = tokio::spawn(async move { dispatcher.run(subscriber).await });

    let start_point = from_point.unwrap_or(0);
    let sync_result = tokio::select! {
        result = chain_service.start(start_point) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    dispatcher_handle.abort();

    if let Err(e) = sync_result {
        error!(error = %e, "chain sync terminated with an error");
        return Err(e);
    }

    if let Err(e) = metrics_handle.await {
        if !e.is_cancelled() {
            error!(error = %e, "metrics server task panicked");
        }
    }

    info!("shutdown complete");
    Ok(())
}
