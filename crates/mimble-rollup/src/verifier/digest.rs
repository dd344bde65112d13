//! transcript-binding verifier backend
//!
//! accepts exactly the proof produced by [`digest_proof`] for the same kind
//! and inputs. it binds a proof to its statement and nothing more: there is
//! no witness and no zero knowledge. for tests and devnets where a pairing
//! verifier is not wired in.

use crate::field::FieldElement;
use crate::proof::{G1Point, G2Point, Proof, PROOF_WORDS};
use crate::DIGEST_DOMAIN;

use super::{CircuitKind, CircuitVerifier};

/// deterministic proof for `(kind, inputs)`
pub fn digest_proof(kind: CircuitKind, inputs: &[FieldElement]) -> Proof {
    let tag = kind.to_string();
    let mut w = [FieldElement::ZERO; PROOF_WORDS];
    for (i, word) in w.iter_mut().enumerate() {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DIGEST_DOMAIN);
        hasher.update(tag.as_bytes());
        hasher.update(&[i as u8]);
        hasher.update(&(inputs.len() as u64).to_le_bytes());
        for input in inputs {
            hasher.update(&input.0);
        }
        *word = FieldElement(*hasher.finalize().as_bytes());
    }

    Proof {
        a: G1Point { x: w[0], y: w[1] },
        b: G2Point([[w[2], w[3]], [w[4], w[5]]]),
        c: G1Point { x: w[6], y: w[7] },
    }
}

/// verifier for one circuit kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigestVerifier {
    kind: CircuitKind,
}

impl DigestVerifier {
    pub fn new(kind: CircuitKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> CircuitKind {
        self.kind
    }
}

impl CircuitVerifier for DigestVerifier {
    fn verify(&self, proof: &Proof, inputs: &[FieldElement]) -> bool {
        *proof == digest_proof(self.kind, inputs)
    }
}
