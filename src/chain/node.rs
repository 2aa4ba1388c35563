//! Upstream chain-sync integration seam (spec §1: "wire-level block decoding
//! ... handled by an upstream library").
//!
//! [`NodeBlockSource`] is the documented plug point a deployment wires a real
//! chain-sync client into (e.g. a node's mini-protocol client over the
//! configured address/port); it owns none of the block-decoding logic this
//! crate deliberately excludes.

use async_trait::async_trait;
use tracing::warn;

use crate::chain_service::{BlockSource, ChainSyncEvent};
use crate::error::{IndexerError, IndexerResult};
use crate::model::Slot;

/// Connects to an upstream node's chain-sync endpoint at `address:port`.
///
/// This crate's scope ends at consuming decoded [`crate::model::Block`]
/// values; decoding the wire protocol itself belongs to the library a
/// deployment links in here.
pub struct NodeBlockSource {
    address: String,
    port: u16,
}

impl NodeBlockSource {
    /// Point at an upstream node's chain-sync endpoint.
    #[must_use]
    pub const fn new(address: String, port: u16) -> Self {
        Self { address, port }
    }
}

#[async_trait]
impl BlockSource for NodeBlockSource {
    async fn start(&self, from_point: Slot) -> IndexerResult<()> {
        warn!(
            address = %self.address,
            port = self.port,
            from_point,
            "NodeBlockSource has no wire-protocol client linked in; wire one in before running livesync"
        );
        Err(IndexerError::fatal(
            "no chain-sync client is linked into this build; NodeBlockSource is an integration seam, not a client",
            None,
        ))
    }

    async fn next_event(&self) -> IndexerResult<Option<ChainSyncEvent>> {
        Ok(None)
    }

    fn is_at_tip(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_fails_clearly_when_no_client_is_linked_in() {
        let source = NodeBlockSource::new("127.0.0.1".to_string(), 3001);
        assert!(source.start(0).await.is_err());
    }
}
