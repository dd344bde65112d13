//! blinded transactions
//!
//! a transaction spends up to [`MAX_INPUTS`] outputs and creates up to
//! [`MAX_OUTPUTS`]. unused slots are `None`; the numeric "no input"
//! placeholder exists only in [`crate::wire`].

use std::collections::HashSet;

use mimble_mmr::{LeafIndex, MAX_WIDTH};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};
use crate::field::FieldElement;
use crate::kernel::Kernel;
use crate::note::Commitment;
use crate::nullifier::Nullifier;
use crate::proof::Proof;
use crate::{MAX_INPUTS, MAX_OUTPUTS};

/// reference to an output being spent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendInput {
    pub nullifier: Nullifier,
    /// leaf of the spent output; only the inclusion circuit sees it
    pub leaf_index: LeafIndex,
    /// membership of the spent output under the batch prior root
    pub inclusion_proof: Proof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub commitment: Commitment,
    /// hidden value lies in the non-negative range
    pub range_proof: Proof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub kernel: Kernel,
    pub inputs: [Option<SpendInput>; MAX_INPUTS],
    pub outputs: [Option<TxOutput>; MAX_OUTPUTS],
    /// ties the kernel balance to the inputs and outputs
    pub validity_proof: Proof,
}

impl Transaction {
    /// structural checks that need no state
    pub fn check_shape(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(MAX_INPUTS);
        for input in self.spends() {
            if input.nullifier.is_zero() {
                return Err(RollupError::MalformedInput(
                    "input with zero nullifier".into(),
                ));
            }
            if !seen.insert(input.nullifier) {
                return Err(RollupError::DuplicateNullifierInBatch(input.nullifier));
            }
            if !input.leaf_index.is_within(MAX_WIDTH) {
                return Err(RollupError::MalformedInput(format!(
                    "input leaf {} out of range",
                    input.leaf_index
                )));
            }
        }

        if seen.is_empty() {
            return Err(RollupError::MalformedInput(
                "transaction consumes no input".into(),
            ));
        }

        if self.created().any(|o| o.commitment.is_zero()) {
            return Err(RollupError::MalformedInput(
                "output with zero commitment".into(),
            ));
        }

        Ok(())
    }

    /// present inputs in slot order
    pub fn spends(&self) -> impl Iterator<Item = &SpendInput> {
        self.inputs.iter().flatten()
    }

    /// present outputs in slot order
    pub fn created(&self) -> impl Iterator<Item = &TxOutput> {
        self.outputs.iter().flatten()
    }

    /// one word per input slot, zero when empty
    pub fn nullifier_words(&self) -> [FieldElement; MAX_INPUTS] {
        self.inputs
            .map(|slot| slot.map_or(FieldElement::ZERO, |i| i.nullifier.to_field()))
    }

    /// one word per output slot, zero when empty
    pub fn output_words(&self) -> [FieldElement; MAX_OUTPUTS] {
        self.outputs
            .map(|slot| slot.map_or(FieldElement::ZERO, |o| o.commitment.to_field()))
    }
}
