//! External publisher: best-effort forwarder of computed prices to an
//! external event sink (spec §4.10/§6, optional).
//!
//! Fire-and-forget semantics with retry-on-transient-failure; a publish
//! failure is never fatal for the pipeline (spec §7: "retried with backoff
//! up to a bounded attempt count ... non-fatal for external publish").

use std::time::Duration;

use reqwest::Client;
use tracing::{instrument, warn};

use crate::error::{IndexerError, IndexerResult};
use crate::model::Price;

/// Backoff schedule for transient publish failures.
const BACKOFF_SECS: [u64; 3] = [1, 4, 10];

/// Forwards prices to an external sink as JSON, one at a time, fire-and-forget.
pub struct ExternalPublisher {
    endpoint: String,
    client: Client,
    enabled: bool,
}

impl ExternalPublisher {
    /// Build a publisher targeting `endpoint`. When `enabled` is false,
    /// `publish` is a no-op (spec §6 "event publishing enable flag").
    #[must_use]
    pub fn new(endpoint: String, enabled: bool) -> Self {
        Self {
            endpoint,
            client: Client::new(),
            enabled,
        }
    }

    /// Publish one price as JSON, retrying transient failures with backoff.
    ///
    /// Returns an error only after the retry budget is exhausted; callers
    /// treat this as non-fatal (spec §7) and continue the pipeline.
    #[instrument(skip(self, price), fields(tx_hash = %price.tx_hash))]
    pub async fn publish(&self, price: &Price) -> IndexerResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut last_err = None;
        for (attempt, delay) in std::iter::once(0).chain(BACKOFF_SECS).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }

            match self.client.post(&self.endpoint).json(price).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    last_err = Some(format!("external sink returned status {}", resp.status()));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                }
            }
            warn!(attempt, "external price publish attempt failed, retrying");
        }

        Err(IndexerError::chain_data(
            format!(
                "external price publish exhausted retries: {}",
                last_err.unwrap_or_else(|| "unknown error".to_string())
            ),
            None,
        ))
    }
}
