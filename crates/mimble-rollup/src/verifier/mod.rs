//! verifier dispatch
//!
//! one opaque verification primitive per circuit kind. every kind has a
//! fixed public-input arity which is checked here, before the primitive is
//! invoked, so layout drift between callers and circuits surfaces as
//! `MalformedInput` rather than a silently rejected proof.
//!
//! verification has no side effects; a [`VerifierSet`] is shared read-only
//! and independent statements may be checked in parallel.

pub mod digest;
pub mod layout;

pub use digest::{digest_proof, DigestVerifier};

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RollupError};
use crate::field::FieldElement;
use crate::proof::Proof;

/// batch sizes with an aggregate circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RollUpSize {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
    ThirtyTwo = 32,
    SixtyFour = 64,
}

impl RollUpSize {
    pub const ALL: [RollUpSize; 7] = [
        RollUpSize::One,
        RollUpSize::Two,
        RollUpSize::Four,
        RollUpSize::Eight,
        RollUpSize::Sixteen,
        RollUpSize::ThirtyTwo,
        RollUpSize::SixtyFour,
    ];

    /// size for a batch of `len` transactions
    pub fn from_len(len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.get() == len)
            .ok_or_else(|| RollupError::MalformedInput(format!("no rollup circuit for {} transactions", len)))
    }

    pub const fn get(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitKind {
    Deposit,
    Withdraw,
    RangeProof,
    MmrInclusion,
    MimblewimbleTx,
    RollUp(RollUpSize),
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 12] = [
        CircuitKind::Deposit,
        CircuitKind::Withdraw,
        CircuitKind::RangeProof,
        CircuitKind::MmrInclusion,
        CircuitKind::MimblewimbleTx,
        CircuitKind::RollUp(RollUpSize::One),
        CircuitKind::RollUp(RollUpSize::Two),
        CircuitKind::RollUp(RollUpSize::Four),
        CircuitKind::RollUp(RollUpSize::Eight),
        CircuitKind::RollUp(RollUpSize::Sixteen),
        CircuitKind::RollUp(RollUpSize::ThirtyTwo),
        CircuitKind::RollUp(RollUpSize::SixtyFour),
    ];

    /// number of public inputs the circuit takes
    pub const fn arity(self) -> usize {
        match self {
            CircuitKind::Deposit => layout::DEPOSIT_ARITY,
            CircuitKind::Withdraw => layout::WITHDRAW_ARITY,
            CircuitKind::RangeProof => layout::RANGE_ARITY,
            CircuitKind::MmrInclusion => layout::INCLUSION_ARITY,
            CircuitKind::MimblewimbleTx => layout::MIMBLEWIMBLE_ARITY,
            CircuitKind::RollUp(size) => layout::roll_up_arity(size),
        }
    }
}

impl std::fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitKind::Deposit => write!(f, "deposit"),
            CircuitKind::Withdraw => write!(f, "withdraw"),
            CircuitKind::RangeProof => write!(f, "range"),
            CircuitKind::MmrInclusion => write!(f, "mmr-inclusion"),
            CircuitKind::MimblewimbleTx => write!(f, "mimblewimble-tx"),
            CircuitKind::RollUp(size) => write!(f, "rollup-{}", size.get()),
        }
    }
}

/// the external verification primitive for one circuit
///
/// returning `false` means the proof is rejected; it is not an error
pub trait CircuitVerifier: Send + Sync {
    fn verify(&self, proof: &Proof, inputs: &[FieldElement]) -> bool;
}

impl<F> CircuitVerifier for F
where
    F: Fn(&Proof, &[FieldElement]) -> bool + Send + Sync,
{
    fn verify(&self, proof: &Proof, inputs: &[FieldElement]) -> bool {
        self(proof, inputs)
    }
}

/// a proof and the public inputs it is checked against
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub kind: CircuitKind,
    pub proof: Proof,
    pub inputs: Vec<FieldElement>,
}

impl Statement {
    pub fn new(kind: CircuitKind, proof: Proof, inputs: Vec<FieldElement>) -> Self {
        Self { kind, proof, inputs }
    }
}

#[derive(Clone, Default)]
pub struct VerifierSet {
    verifiers: HashMap<CircuitKind, Arc<dyn CircuitVerifier>>,
}

impl VerifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// same verifier for every kind
    pub fn with_all(verifier: Arc<dyn CircuitVerifier>) -> Self {
        let mut set = Self::new();
        for kind in CircuitKind::ALL {
            set.verifiers.insert(kind, verifier.clone());
        }
        set
    }

    /// every kind backed by its [`DigestVerifier`]
    pub fn digest() -> Self {
        let mut set = Self::new();
        for kind in CircuitKind::ALL {
            set.verifiers.insert(kind, Arc::new(DigestVerifier::new(kind)));
        }
        set
    }

    /// install (or replace) the verifier for `kind`
    pub fn register(&mut self, kind: CircuitKind, verifier: Arc<dyn CircuitVerifier>) -> &mut Self {
        self.verifiers.insert(kind, verifier);
        self
    }

    pub fn is_registered(&self, kind: CircuitKind) -> bool {
        self.verifiers.contains_key(&kind)
    }

    /// check `proof` against `inputs` under `kind`
    pub fn verify(&self, kind: CircuitKind, proof: &Proof, inputs: &[FieldElement]) -> Result<bool> {
        if inputs.len() != kind.arity() {
            return Err(RollupError::MalformedInput(format!(
                "{} takes {} public inputs, got {}",
                kind,
                kind.arity(),
                inputs.len()
            )));
        }

        let verifier = self
            .verifiers
            .get(&kind)
            .ok_or(RollupError::MissingVerifier(kind))?;

        let valid = verifier.verify(proof, inputs);
        debug!(circuit = %kind, valid, "proof verified");
        Ok(valid)
    }

    /// like [`VerifierSet::verify`], with rejection as an error
    pub fn require(&self, kind: CircuitKind, proof: &Proof, inputs: &[FieldElement]) -> Result<()> {
        if self.verify(kind, proof, inputs)? {
            Ok(())
        } else {
            Err(RollupError::ProofRejected(kind))
        }
    }

    /// check independent statements, reporting the first failure in order
    pub fn verify_all(&self, statements: &[Statement]) -> Result<()> {
        let check = |s: &Statement| self.require(s.kind, &s.proof, &s.inputs);

        #[cfg(feature = "parallel")]
        let results: Vec<Result<()>> = statements.par_iter().map(check).collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<()>> = statements.iter().map(check).collect();

        results.into_iter().collect()
    }
}

impl std::fmt::Debug for VerifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<String> = self.verifiers.keys().map(|k| k.to_string()).collect();
        kinds.sort();
        f.debug_struct("VerifierSet").field("kinds", &kinds).finish()
    }
}
