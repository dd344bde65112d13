//! state-transition events
//!
//! emitted in commit order and buffered until the caller drains them with
//! [`crate::Engine::take_events`].

use mimble_mmr::{LeafIndex, Root};
use serde::{Deserialize, Serialize};

use crate::batch::BatchId;
use crate::ledger::AssetId;
use crate::note::Commitment;
use crate::nullifier::Nullifier;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// output appended to the asset's accumulator
    OutputCommitted {
        asset: AssetId,
        commitment: Commitment,
        leaf_index: LeafIndex,
    },
    NullifierSpent {
        asset: AssetId,
        nullifier: Nullifier,
    },
    /// current root advanced
    RootUpdated {
        asset: AssetId,
        root: Root,
    },
    BatchPending {
        id: BatchId,
        asset: AssetId,
        new_root: Root,
    },
    BatchFinalized {
        id: BatchId,
        asset: AssetId,
        root: Root,
    },
    /// pending batch dropped: its prior root was superseded or it expired
    BatchAbandoned {
        id: BatchId,
        asset: AssetId,
    },
}
