//! shielded outputs
//!
//! an output is known to the engine only by its commitment, which hides the
//! value and blinding factor. once appended it is never mutated; spending it
//! publishes a nullifier instead of touching the output.

use mimble_mmr::LeafIndex;
use serde::{Deserialize, Serialize};

use crate::field::{hex32, FieldElement};

/// hiding commitment to (value, blinding)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "hex32")] pub [u8; 32]);

impl Commitment {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_field(&self) -> FieldElement {
        FieldElement(self.0)
    }

    /// the zero word marks an empty output slot on the wire
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// a commitment together with the accumulator slot it landed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldedOutput {
    pub commitment: Commitment,
    pub leaf_index: LeafIndex,
}
