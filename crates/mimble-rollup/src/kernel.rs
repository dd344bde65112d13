//! transaction kernels
//!
//! the public part of a mimblewimble transaction. the excess commitment and
//! the schnorr signature over it show `sum(inputs) = sum(outputs) + fee*H +
//! excess`; the engine keeps the record and leaves the algebra to the
//! validity proof.

use serde::{Deserialize, Serialize};

use crate::field::FieldElement;
use crate::note::Commitment;

/// aggregated schnorr signature `(R, s)` over the kernel challenge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KernelSignature {
    /// nonce commitment `R`
    pub nonce: Commitment,
    /// response scalar `s`
    pub scalar: FieldElement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Kernel {
    /// public fee, paid to the relayer that lands the batch
    pub fee: u64,
    /// opaque public tag
    pub metadata: FieldElement,
    pub excess: Commitment,
    pub signature: KernelSignature,
}
