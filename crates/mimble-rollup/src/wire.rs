//! flat word encoding of a transaction
//!
//! the layout relayers submit, one 32-byte word per field:
//!
//! ```text
//!  0        fee
//!  1        metadata
//!  2..12    input 0:  nullifier, position, inclusion proof[8]
//! 12..22    input 1:  nullifier, position, inclusion proof[8]
//! 22..31    output 0: commitment, range proof[8]
//! 31..40    output 1: commitment, range proof[8]
//! 40        kernel excess
//! 41        signature nonce
//! 42        signature scalar
//! 43..51    validity proof[8]
//! ```
//!
//! positions are 1-based. an empty input slot is the fixed placeholder
//! `(nullifier 0, position 1, zero proof)`; an empty output slot is a zero
//! commitment with a zero proof. nothing past this module sees either.

use mimble_mmr::LeafIndex;

use crate::error::{Result, RollupError};
use crate::field::FieldElement;
use crate::kernel::{Kernel, KernelSignature};
use crate::note::Commitment;
use crate::nullifier::Nullifier;
use crate::proof::{Proof, PROOF_WORDS};
use crate::transaction::{SpendInput, Transaction, TxOutput};

/// words per encoded transaction
pub const TX_WORDS: usize = 51;

/// position written for an empty input slot
pub const EMPTY_INPUT_POSITION: u64 = 1;

const INPUT_WORDS: usize = 2 + PROOF_WORDS;
const OUTPUT_WORDS: usize = 1 + PROOF_WORDS;

pub fn encode(tx: &Transaction) -> Vec<FieldElement> {
    let mut words = Vec::with_capacity(TX_WORDS);
    words.push(FieldElement::from_u64(tx.kernel.fee));
    words.push(tx.kernel.metadata);

    for slot in &tx.inputs {
        match slot {
            Some(input) => {
                words.push(input.nullifier.to_field());
                words.push(FieldElement::from_u64(input.leaf_index.position()));
                words.extend(input.inclusion_proof.to_words());
            }
            None => {
                words.push(FieldElement::ZERO);
                words.push(FieldElement::from_u64(EMPTY_INPUT_POSITION));
                words.extend(Proof::ZERO.to_words());
            }
        }
    }

    for slot in &tx.outputs {
        let (commitment, proof) = match slot {
            Some(output) => (output.commitment.to_field(), output.range_proof),
            None => (FieldElement::ZERO, Proof::ZERO),
        };
        words.push(commitment);
        words.extend(proof.to_words());
    }

    words.push(tx.kernel.excess.to_field());
    words.push(tx.kernel.signature.nonce.to_field());
    words.push(tx.kernel.signature.scalar);
    words.extend(tx.validity_proof.to_words());

    words
}

pub fn decode(words: &[FieldElement]) -> Result<Transaction> {
    if words.len() != TX_WORDS {
        return Err(RollupError::MalformedInput(format!(
            "transaction must be {} words, got {}",
            TX_WORDS,
            words.len()
        )));
    }

    let fee = words[0]
        .to_u64()
        .ok_or_else(|| RollupError::MalformedInput("fee exceeds 64 bits".into()))?;

    let mut cursor = 2;
    let mut inputs = [None; 2];
    for slot in inputs.iter_mut() {
        *slot = decode_input(&words[cursor..cursor + INPUT_WORDS])?;
        cursor += INPUT_WORDS;
    }

    let mut outputs = [None; 2];
    for slot in outputs.iter_mut() {
        *slot = decode_output(&words[cursor..cursor + OUTPUT_WORDS])?;
        cursor += OUTPUT_WORDS;
    }

    let kernel = Kernel {
        fee,
        metadata: words[1],
        excess: Commitment(words[cursor].0),
        signature: KernelSignature {
            nonce: Commitment(words[cursor + 1].0),
            scalar: words[cursor + 2],
        },
    };
    cursor += 3;

    Ok(Transaction {
        kernel,
        inputs,
        outputs,
        validity_proof: Proof::from_words(&words[cursor..])?,
    })
}

fn decode_input(words: &[FieldElement]) -> Result<Option<SpendInput>> {
    let nullifier = Nullifier(words[0].0);
    let position = words[1].to_u64();
    let proof = Proof::from_words(&words[2..])?;

    if nullifier.is_zero() {
        // anything but the exact placeholder is a malformed slot
        if position == Some(EMPTY_INPUT_POSITION) && proof.is_zero() {
            return Ok(None);
        }
        return Err(RollupError::MalformedInput(
            "empty input slot does not match placeholder".into(),
        ));
    }

    let leaf_index = position
        .and_then(LeafIndex::from_position)
        .ok_or_else(|| RollupError::MalformedInput("invalid input position".into()))?;

    Ok(Some(SpendInput {
        nullifier,
        leaf_index,
        inclusion_proof: proof,
    }))
}

fn decode_output(words: &[FieldElement]) -> Result<Option<TxOutput>> {
    let commitment = Commitment(words[0].0);
    let range_proof = Proof::from_words(&words[1..])?;

    if commitment.is_zero() {
        if range_proof.is_zero() {
            return Ok(None);
        }
        return Err(RollupError::MalformedInput(
            "range proof for empty output slot".into(),
        ));
    }

    Ok(Some(TxOutput {
        commitment,
        range_proof,
    }))
}
