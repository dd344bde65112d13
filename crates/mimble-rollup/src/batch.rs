//! optimistic batches
//!
//! a batch whose aggregate proof was accepted but whose root has not yet
//! been adopted. pending batches of one asset form a single chain starting
//! at the current root; finalizing the head moves the current root along it.
//! a finalized batch keeps its header only: nullifiers, outputs and kernels
//! now live in the pool.

use mimble_mmr::Root;
use serde::{Deserialize, Serialize};

use crate::kernel::Kernel;
use crate::ledger::{AccountId, AssetId};
use crate::note::Commitment;
use crate::nullifier::Nullifier;

/// monotonic batch identifier, never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Pending,
    Finalized,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimisticBatch {
    pub id: BatchId,
    pub asset: AssetId,
    pub prior_root: Root,
    pub new_root: Root,
    /// introduced nullifiers, transaction then slot order
    pub nullifiers: Vec<Nullifier>,
    /// commitments to append on finalize, in append order
    pub outputs: Vec<Commitment>,
    /// kept with the pool once the batch is finalized
    pub kernels: Vec<Kernel>,
    /// sum of kernel fees, paid to `relayer` on finalize
    pub fees: u128,
    pub relayer: AccountId,
    /// engine sequence number at submission
    pub submitted_at: u64,
    pub status: BatchStatus,
}

impl OptimisticBatch {
    pub fn is_pending(&self) -> bool {
        self.status == BatchStatus::Pending
    }
}
