//! Chain service: owns the upstream sync session, the block-processed
//! barrier, and rollback handling (spec §4.9).
//!
//! Wire-level block decoding is an upstream library's job (spec §1); this
//! module only depends on a [`BlockSource`] abstraction over "start from a
//! point, deliver blocks and rollbacks in order, restart from a new point"
//! (spec §6), which is the typed surface such a library would expose.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{info, instrument, warn};

use crate::bus::EventBus;
use crate::chain::ChainDataProvider;
use crate::error::IndexerResult;
use crate::events::Event;
use crate::model::{Block, Slot, SLOT_CONVERSION_OFFSET};

/// A single message from the upstream chain-sync feed.
#[derive(Debug, Clone)]
pub enum ChainSyncEvent {
    /// A new block, in order.
    Block(Block),
    /// The chain rolled back to `point`.
    RollbackTo(Slot),
}

/// The typed surface an embedded block-sync library exposes (spec §6).
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Open (or reopen) a session starting at `from_point`.
    async fn start(&self, from_point: Slot) -> IndexerResult<()>;

    /// Await the next block or rollback notification.
    async fn next_event(&self) -> IndexerResult<Option<ChainSyncEvent>>;

    /// Whether the feed has reached the chain tip.
    fn is_at_tip(&self) -> bool;
}

/// One-shot barrier gating delivery of the next block or rollback (spec §9:
/// "avoid long-lived condition variables that can be left in an
/// inconsistent state on exception").
#[derive(Default)]
struct Barrier(Notify);

impl Barrier {
    async fn wait(&self) {
        self.0.notified().await;
    }

    fn signal(&self) {
        self.0.notify_one();
    }
}

/// Drives the sync loop: deliver a block, publish it, wait for the
/// dispatcher's completion signal before requesting the next one.
pub struct ChainService {
    source: Arc<dyn BlockSource>,
    resolver: Arc<dyn ChainDataProvider>,
    bus: EventBus,
    block_barrier: Barrier,
    rollback_barrier: Barrier,
    persisted_sync_point: AtomicU64,
    synced: AtomicBool,
}

impl ChainService {
    /// Build a chain service over a block source, a resolver (used for
    /// `determineInitialisationState`), and the bus it publishes onto.
    #[must_use]
    pub fn new(source: Arc<dyn BlockSource>, resolver: Arc<dyn ChainDataProvider>, bus: EventBus) -> Self {
        Self {
            source,
            resolver,
            bus,
            block_barrier: Barrier::default(),
            rollback_barrier: Barrier::default(),
            persisted_sync_point: AtomicU64::new(0),
            synced: AtomicBool::new(false),
        }
    }

    /// Open a sync session from `from_point` and run the strictly-in-order
    /// delivery loop until the source is exhausted or an unrecoverable
    /// error occurs.
    #[instrument(skip(self))]
    pub async fn start(&self, from_point: Slot) -> IndexerResult<()> {
        self.source.start(from_point).await?;
        self.persisted_sync_point.store(from_point, Ordering::Relaxed);

        loop {
            let Some(event) = self.source.next_event().await? else {
                info!("chain-sync feed closed");
                return Ok(());
            };

            match event {
                ChainSyncEvent::Block(block) => {
                    self.persisted_sync_point.store(block.slot, Ordering::Relaxed);
                    self.synced.store(self.source.is_at_tip(), Ordering::Relaxed);
                    if self.bus.publish(Event::BlockReceived { block }).await.is_err() {
                        warn!("event bus closed while publishing BlockReceived; stopping sync");
                        return Ok(());
                    }
                    self.block_barrier.wait().await;
                }
                ChainSyncEvent::RollbackTo(point) => {
                    if self.bus.publish(Event::Rollback { point }).await.is_err() {
                        warn!("event bus closed while publishing Rollback; stopping sync");
                        return Ok(());
                    }
                    self.rollback_barrier.wait().await;
                }
            }
        }
    }

    /// Release the one-shot barrier gating delivery of the next block.
    pub fn signal_block_processed(&self) {
        self.block_barrier.signal();
    }

    /// Release the one-shot barrier gating delivery after a rollback.
    pub fn signal_rollback_processed(&self) {
        self.rollback_barrier.signal();
    }

    /// The point a rollback to `point` actually reinitializes from (spec §9:
    /// "do not round up to the rollback point — the persisted sync point
    /// may lag behind the tip"). Exposed separately so callers that need to
    /// purge persisted state below this point (e.g. the dispatcher's
    /// `Rollback` handling) agree with the sync session on exactly where
    /// that point is.
    #[must_use]
    pub fn reinit_point_for(&self, point: Slot) -> Slot {
        std::cmp::min(self.persisted_sync_point.load(Ordering::Relaxed), point)
    }

    /// Tear down the current session and restart from `point`.
    #[instrument(skip(self))]
    pub async fn restart_block_sync(&self, point: Slot) -> IndexerResult<()> {
        let reinit_point = self.reinit_point_for(point);
        info!(point, reinit_point, "restarting chain sync after rollback");
        self.source.start(reinit_point).await
    }

    /// `true` once the tip has been reached in live-sync mode.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }

    /// Map a wall-clock time to an approximate block point by consulting
    /// the chain-data provider (spec §4.9).
    pub async fn determine_initialisation_state(&self, time_seconds: i64) -> IndexerResult<Option<Slot>> {
        let approx_slot = (time_seconds + SLOT_CONVERSION_OFFSET).max(0);
        #[allow(clippy::cast_sign_loss)]
        self.resolver.find_block_nearest(approx_slot as Slot).await
    }
}
