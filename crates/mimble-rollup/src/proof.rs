//! fixed-shape proof triple
//!
//! every circuit proof is `(a, b, c)` with `a, c` in G1 and `b` in G2, eight
//! words flattened as `a.x, a.y, b[0][0], b[0][1], b[1][0], b[1][1], c.x, c.y`.
//! the engine never looks inside; it only checks the shape and hands the
//! triple to a verifier.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};
use crate::field::FieldElement;

/// words in a flattened proof
pub const PROOF_WORDS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct G1Point {
    pub x: FieldElement,
    pub y: FieldElement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct G2Point(pub [[FieldElement; 2]; 2]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Proof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

impl Proof {
    pub const ZERO: Self = Self {
        a: G1Point {
            x: FieldElement::ZERO,
            y: FieldElement::ZERO,
        },
        b: G2Point([[FieldElement::ZERO; 2]; 2]),
        c: G1Point {
            x: FieldElement::ZERO,
            y: FieldElement::ZERO,
        },
    };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// parse a flattened proof, exactly [`PROOF_WORDS`] words
    pub fn from_words(words: &[FieldElement]) -> Result<Self> {
        let w: &[FieldElement; PROOF_WORDS] = words.try_into().map_err(|_| {
            RollupError::MalformedInput(format!(
                "proof must be {} words, got {}",
                PROOF_WORDS,
                words.len()
            ))
        })?;

        Ok(Self {
            a: G1Point { x: w[0], y: w[1] },
            b: G2Point([[w[2], w[3]], [w[4], w[5]]]),
            c: G1Point { x: w[6], y: w[7] },
        })
    }

    pub fn to_words(&self) -> [FieldElement; PROOF_WORDS] {
        let [[b00, b01], [b10, b11]] = self.b.0;
        [self.a.x, self.a.y, b00, b01, b10, b11, self.c.x, self.c.y]
    }
}
