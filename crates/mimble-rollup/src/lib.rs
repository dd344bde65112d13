//! mimble rollup
//!
//! confidential-transaction rollup engine: deposit a fungible asset into a
//! shielded pool, move it around with mimblewimble-style blinded
//! transactions attested by zk proofs, withdraw back to a public account.
//!
//! # architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │   relayers / depositors / withdrawers                        │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ deposit / withdraw / roll_up
//!                                │ optimistic_roll_up / finalize
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine (single writer, atomic entry points)                 │
//! │  ├─ VerifierSet   one opaque verifier per circuit kind       │
//! │  ├─ RollupState   per-asset pools, spent nullifiers, batches │
//! │  │   └─ Pool      mmr accumulator, root history, collateral  │
//! │  └─ AssetLedger   external token custody (transfer in/out)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! amounts never appear in the accumulator: outputs are opaque commitments,
//! spends are unlinkable nullifiers, and every transition is gated on a
//! proof whose public-input layout lives in [`verifier::layout`].

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod field;
pub mod kernel;
pub mod ledger;
pub mod note;
pub mod nullifier;
pub mod proof;
pub mod shared;
pub mod state;
pub mod transaction;
pub mod verifier;
pub mod wire;

pub use batch::{BatchId, BatchStatus, OptimisticBatch};
pub use config::{DepositPolicy, EngineConfig};
pub use engine::{DepositReceipt, Engine, RollUpReceipt};
pub use error::{Result, RollupError};
pub use event::Event;
pub use field::FieldElement;
pub use kernel::{Kernel, KernelSignature};
pub use ledger::{AccountId, AssetId, AssetLedger, InMemoryLedger, LedgerError};
pub use note::{Commitment, ShieldedOutput};
pub use nullifier::{Nullifier, NullifierSet};
pub use proof::{G1Point, G2Point, Proof};
pub use shared::SharedEngine;
pub use state::{Pool, RollupState};
pub use transaction::{SpendInput, Transaction, TxOutput};
pub use verifier::{CircuitKind, CircuitVerifier, DigestVerifier, RollUpSize, VerifierSet};

pub use mimble_mmr::{LeafIndex, MmrProof, Root};

/// domain separator for nullifier derivation
pub const NULLIFIER_DOMAIN: &[u8] = b"mimble.rollup.nullifier.v1";
/// domain separator for the digest verifier transcript
pub const DIGEST_DOMAIN: &[u8] = b"mimble.rollup.digest-verifier.v1";

/// input slots per transaction
pub const MAX_INPUTS: usize = 2;
/// output slots per transaction
pub const MAX_OUTPUTS: usize = 2;
