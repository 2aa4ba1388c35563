//! Event dispatcher: the single consumer loop that pattern-matches events
//! and drives downstream work (spec §4.8).
//!
//! **Completion invariant.** For every `BlockReceived`, exactly one
//! block-processed signal must eventually reach the chain service: either
//! from the pool-reserves path when a block has no swaps, or from the
//! prices path when it does. An error handling `PricesCalculated` still
//! signals (the block was processed up to the point of failure); an error
//! handling `BlockReceived` must not, so the upstream sync can retry.

use std::sync::Arc;

use tracing::{error, instrument, warn};

use crate::bus::EventSubscriber;
use crate::chain_service::ChainService;
use crate::db::PersistenceLayer;
use crate::events::Event;
use crate::metrics::Metrics;
use crate::price_processor::swaps_to_prices;
use crate::publisher::ExternalPublisher;
use crate::swap_processor::SwapProcessor;
use crate::bus::EventBus;
use std::sync::atomic::Ordering;

/// Owns the dispatcher's downstream collaborators and runs its consume loop.
pub struct Dispatcher {
    bus: EventBus,
    swap_processor: Arc<SwapProcessor>,
    cache: Arc<crate::cache::UtxoCache>,
    persistence: Arc<PersistenceLayer>,
    publisher: Arc<ExternalPublisher>,
    chain_service: Arc<ChainService>,
    metrics: Arc<Metrics>,
    publish_events: bool,
}

impl Dispatcher {
    /// Build a dispatcher over its downstream collaborators.
    #[must_use]
    pub fn new(
        bus: EventBus,
        swap_processor: Arc<SwapProcessor>,
        cache: Arc<crate::cache::UtxoCache>,
        persistence: Arc<PersistenceLayer>,
        publisher: Arc<ExternalPublisher>,
        chain_service: Arc<ChainService>,
        metrics: Arc<Metrics>,
        publish_events: bool,
    ) -> Self {
        Self {
            bus,
            swap_processor,
            cache,
            persistence,
            publisher,
            chain_service,
            metrics,
            publish_events,
        }
    }

    /// Run the single consumer loop until the event bus closes.
    pub async fn run(&self, mut subscriber: EventSubscriber) {
        while let Some(event) = subscriber.recv().await {
            self.dispatch(event).await;
        }
    }

    #[instrument(skip(self, event))]
    async fn dispatch(&self, event: Event) {
        match event {
            Event::BlockReceived { block } => {
                // Errors here must not signal: the invariant reserves the
                // signal for the pool-reserves/prices paths below.
                if let Err(e) = self.handle_block_received(&block).await {
                    error!(error = %e, slot = block.slot, "failed to process BlockReceived");
                    self.metrics.event_processing_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            Event::SwapsComputed { slot, swaps } => {
                let prices = swaps_to_prices(&swaps);
                if self
                    .bus
                    .publish(Event::PricesCalculated { slot, prices })
                    .await
                    .is_err()
                {
                    warn!(slot, "event bus closed while publishing PricesCalculated");
                }
            }
            Event::PoolReservesComputed { slot, reserves, has_swaps } => {
                if let Err(e) = self.persistence.persist_pool_reserves(&reserves).await {
                    error!(error = %e, slot, "failed to persist pool reserves");
                    self.metrics.pool_reserve_persist_failed.fetch_add(1, Ordering::Relaxed);
                }
                if !has_swaps {
                    self.chain_service.signal_block_processed();
                }
            }
            Event::PricesCalculated { slot, prices } => {
                // This path owns the completion invariant when the block had
                // swaps: it signals even if persistence or publish fails.
                if let Err(e) = self.persistence.persist_prices(&prices).await {
                    error!(error = %e, slot, "failed to persist prices");
                    self.metrics.event_processing_failed.fetch_add(1, Ordering::Relaxed);
                } else if let Err(e) = self.persistence.refresh_views(&prices).await {
                    error!(error = %e, slot, "failed to refresh views");
                }

                if self.publish_events {
                    for price in &prices {
                        if let Err(e) = self.publisher.publish(price).await {
                            warn!(error = %e, slot, "external price publish failed");
                            self.metrics.price_publish_failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }

                self.chain_service.signal_block_processed();
            }
            Event::Rollback { point } => {
                let reinit_point = self.chain_service.reinit_point_for(point);
                if let Err(e) = self.persistence.rollback_to(reinit_point).await {
                    error!(error = %e, point, reinit_point, "failed to roll back persisted state");
                    self.metrics.event_processing_failed.fetch_add(1, Ordering::Relaxed);
                }
                if let Err(e) = self.chain_service.restart_block_sync(point).await {
                    error!(error = %e, point, "failed to restart chain sync after rollback");
                }
                self.chain_service.signal_rollback_processed();
            }
        }
    }

    async fn handle_block_received(&self, block: &crate::model::Block) -> crate::error::IndexerResult<()> {
        for tx in &block.transactions {
            self.cache.add_outputs(&tx.hash.0, &tx.outputs).await;
        }

        let (swaps_computed, reserves_computed) = self.swap_processor.process_block(block).await?;

        if self
            .bus
            .publish(Event::PoolReservesComputed {
                slot: reserves_computed.slot,
                reserves: reserves_computed.reserves,
                has_swaps: reserves_computed.has_swaps,
            })
            .await
            .is_err()
        {
            warn!(slot = block.slot, "event bus closed while publishing PoolReservesComputed");
            return Ok(());
        }

        if reserves_computed.has_swaps {
            if self
                .bus
                .publish(Event::SwapsComputed {
                    slot: swaps_computed.slot,
                    swaps: swaps_computed.swaps,
                })
                .await
                .is_err()
            {
                warn!(slot = block.slot, "event bus closed while publishing SwapsComputed");
            }
        }

        Ok(())
    }
}
