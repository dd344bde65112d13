//! nullifiers for preventing double-spends
//!
//! when an output is spent, its nullifier is published.
//! if the nullifier already exists in the set, the spend is rejected.
//! the set only grows: a nullifier is recorded at most once, ever.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::field::{hex32, FieldElement};
use crate::note::Commitment;
use crate::NULLIFIER_DOMAIN;

/// nullifier - spend tag of a shielded output
///
/// derived from:
/// - the owner's spend secret
/// - the output commitment
///
/// only the owner can compute it, it cannot be linked back to the
/// commitment without the secret, and each output has exactly one
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "hex32")] pub [u8; 32]);

impl Nullifier {
    /// derive the nullifier for an output
    pub fn derive(secret: &[u8; 32], commitment: &Commitment) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(NULLIFIER_DOMAIN);
        hasher.update(secret);
        hasher.update(&commitment.0);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_field(&self) -> FieldElement {
        FieldElement(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nullifier({})", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for Nullifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// nullifier set - tracks spent outputs for the lifetime of the engine
#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    nullifiers: HashSet<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// check if nullifier exists (output already spent)
    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// insert nullifier (mark output as spent)
    /// returns false if already exists (double-spend attempt)
    pub fn insert(&mut self, nullifier: Nullifier) -> bool {
        self.nullifiers.insert(nullifier)
    }

    /// number of spent outputs
    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }
}
