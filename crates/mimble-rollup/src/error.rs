//! error types for the rollup engine
//!
//! every variant is a local rejection: the attempted operation left no
//! trace in state. the one exception is [`RollupError::RootMismatch`],
//! which also halts batch acceptance for the asset.

use mimble_mmr::{MmrError, Root};
use thiserror::Error;

use crate::batch::BatchId;
use crate::ledger::{AssetId, LedgerError};
use crate::nullifier::Nullifier;
use crate::verifier::CircuitKind;

#[derive(Debug, Error)]
pub enum RollupError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("proof rejected by {0} verifier")]
    ProofRejected(CircuitKind),

    #[error("stale root: expected {expected}, got {got}")]
    StaleRoot { expected: Root, got: Root },

    #[error("unknown root: {0}")]
    UnknownRoot(Root),

    #[error("nullifier already spent: {0}")]
    DoubleSpend(Nullifier),

    #[error("nullifier appears twice in batch: {0}")]
    DuplicateNullifierInBatch(Nullifier),

    #[error("root mismatch: declared {declared}, computed {computed}")]
    RootMismatch { declared: Root, computed: Root },

    #[error("asset transfer failed: {0}")]
    AssetTransferFailed(#[source] LedgerError),

    #[error("batch not found: {0}")]
    NotFound(BatchId),

    #[error("batch already finalized: {0}")]
    AlreadyFinalized(BatchId),

    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    #[error("insufficient collateral: need {needed}, pool holds {available}")]
    InsufficientCollateral { needed: u128, available: u128 },

    #[error("no verifier registered for {0}")]
    MissingVerifier(CircuitKind),

    #[error("batch acceptance halted for asset {0}")]
    Halted(AssetId),

    #[error("pending batch limit reached: {0}")]
    PendingLimit(usize),

    #[error("deposit deferred: {pending} batches pending for asset {asset}")]
    DepositDeferred { asset: AssetId, pending: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("accumulator error: {0}")]
    Mmr(#[from] MmrError),
}

impl RollupError {
    /// verifier and accumulator disagree about a transition the proof
    /// accepted; not recoverable by resubmitting
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, RollupError::RootMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, RollupError>;
