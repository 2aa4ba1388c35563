//! Entry point for the Cardano DEX indexer.
//!
//! Thin `#[tokio::main]` wrapper: initialize tracing, delegate to the CLI
//! module for all layer orchestration, map a returned error to a non-zero
//! exit code (spec §6 "exit code 0 on graceful shutdown, non-zero on
//! unrecoverable init failure").

use cardano_dex_indexer::{cli, observability};

#[tokio::main]
async fn main() {
    if let Err(e) = observability::init_tracing(None, None, false) {
        eprintln!("failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
