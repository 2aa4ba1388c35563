//! Pipeline events: a tagged union of everything that flows across the
//! event bus (spec §9 REDESIGN FLAG: "model as a tagged union; exhaustiveness
//! should be statically verifiable" rather than the source's loosely-typed
//! dynamic dispatch).
//!
//! The dispatcher (spec §4.8) matches every variant exhaustively; adding a
//! new variant here is a compile error everywhere a match isn't updated.

use crate::model::{Block, PoolReserveSnapshot, Price, Slot, Swap};

/// Every event the chain service, swap processor, price processor, and
/// publisher can produce.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new block arrived from the upstream chain-sync feed.
    BlockReceived {
        /// The received block.
        block: Block,
    },

    /// Swaps were extracted from a block (spec §4.4).
    SwapsComputed {
        /// The block's slot.
        slot: Slot,
        /// Every swap found in the block.
        swaps: Vec<Swap>,
    },

    /// Pool reserve snapshots were extracted from a block (spec §4.4).
    PoolReservesComputed {
        /// The block's slot.
        slot: Slot,
        /// Every pool reserve snapshot found in the block.
        reserves: Vec<PoolReserveSnapshot>,
        /// Whether this block produced any swaps.
        has_swaps: bool,
    },

    /// Prices were derived from a block's swaps (spec §4.5).
    PricesCalculated {
        /// The block's slot.
        slot: Slot,
        /// Every price derived from the block's swaps.
        prices: Vec<Price>,
    },

    /// The chain-sync feed rolled back to an earlier point (spec §4.9).
    Rollback {
        /// The slot the chain rolled back to.
        point: Slot,
    },
}

impl Event {
    /// The slot this event pertains to, if it has one (`Rollback` carries
    /// its own rollback point instead of a "current" slot).
    #[must_use]
    pub const fn slot(&self) -> Option<Slot> {
        match self {
            Self::BlockReceived { block } => Some(block.slot),
            Self::SwapsComputed { slot, .. }
            | Self::PoolReservesComputed { slot, .. }
            | Self::PricesCalculated { slot, .. } => Some(*slot),
            Self::Rollback { .. } => None,
        }
    }
}
