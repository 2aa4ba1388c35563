//! Atomic error counters (spec §7) and a minimal Prometheus-text-exposition
//! endpoint (spec §6: "Prometheus-style metrics on a configurable port").
//!
//! Full metrics backend wiring (dashboards, alerting) is out of scope (spec
//! §1 "logging and metrics backends"); this module owns only the named
//! counters the dispatcher and resolver increment and a bare-bones endpoint
//! to scrape them from.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::chain::hybrid::ResolverMetrics;
use crate::error::{IndexerError, IndexerResult};

/// Named counters from spec §7: `pool_reserve_persist_failed`,
/// `price_publish_failed`, `event_processing_failed`,
/// `utxo_resolution_missing`, `utxo_resolution_count_mismatch`.
#[derive(Default)]
pub struct Metrics {
    /// `pool_reserve_persist_failed`.
    pub pool_reserve_persist_failed: AtomicU64,
    /// `price_publish_failed`.
    pub price_publish_failed: AtomicU64,
    /// `event_processing_failed`.
    pub event_processing_failed: AtomicU64,
}

impl Metrics {
    /// Build a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Clone)]
struct MetricsState {
    metrics: Arc<Metrics>,
    resolver_metrics: Option<Arc<ResolverMetrics>>,
}

/// Serve the metrics text-exposition endpoint until the process shuts down.
pub async fn serve(
    port: u16,
    metrics: Arc<Metrics>,
    resolver_metrics: Option<Arc<ResolverMetrics>>,
) -> IndexerResult<()> {
    let state = MetricsState {
        metrics,
        resolver_metrics,
    };
    let app = Router::new().route("/metrics", get(render_metrics)).with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "metrics server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IndexerError::fatal(format!("failed to bind metrics port {port}"), Some(Box::new(e))))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| IndexerError::fatal("metrics server crashed", Some(Box::new(e))))?;

    Ok(())
}

async fn render_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    let mut out = String::new();
    write_counter(
        &mut out,
        "pool_reserve_persist_failed",
        state.metrics.pool_reserve_persist_failed.load(Ordering::Relaxed),
    );
    write_counter(
        &mut out,
        "price_publish_failed",
        state.metrics.price_publish_failed.load(Ordering::Relaxed),
    );
    write_counter(
        &mut out,
        "event_processing_failed",
        state.metrics.event_processing_failed.load(Ordering::Relaxed),
    );

    if let Some(rm) = &state.resolver_metrics {
        write_counter(
            &mut out,
            "utxo_resolution_missing",
            rm.resolution_missing.load(Ordering::Relaxed),
        );
        write_counter(
            &mut out,
            "utxo_resolution_count_mismatch",
            rm.resolution_count_mismatch.load(Ordering::Relaxed),
        );
    }

    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}

fn write_counter(out: &mut String, name: &str, value: u64) {
    out.push_str(&format!("# TYPE {name} counter\n{name} {value}\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_counter_formats_prometheus_text_exposition() {
        let mut out = String::new();
        write_counter(&mut out, "event_processing_failed", 3);
        assert_eq!(out, "# TYPE event_processing_failed counter\nevent_processing_failed 3\n");
    }
}
