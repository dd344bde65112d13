//! public-input layouts
//!
//! the single place that decides which words a circuit sees and in which
//! order. callers build inputs through these functions only.

use mimble_mmr::{LeafIndex, Root};

use crate::field::FieldElement;
use crate::note::Commitment;
use crate::nullifier::Nullifier;
use crate::transaction::Transaction;
use crate::{MAX_INPUTS, MAX_OUTPUTS};

use super::{CircuitKind, RollUpSize, Statement};

/// `(commitment, value)`
pub const DEPOSIT_ARITY: usize = 2;
/// `(root, nullifier, value)`
pub const WITHDRAW_ARITY: usize = 3;
/// `(commitment)`
pub const RANGE_ARITY: usize = 1;
/// `(root, position, binding)`
pub const INCLUSION_ARITY: usize = 3;
/// `(fee, metadata, nf0, nf1, out0, out1, excess, nonce)`
pub const MIMBLEWIMBLE_ARITY: usize = 2 + MAX_INPUTS + MAX_OUTPUTS + 2;

/// `(prior, new, nullifiers[2n], outputs[2n], fees[n])`
pub const fn roll_up_arity(size: RollUpSize) -> usize {
    2 + (MAX_INPUTS + MAX_OUTPUTS + 1) * size.get()
}

pub fn deposit(commitment: &Commitment, value: u64) -> Vec<FieldElement> {
    vec![commitment.to_field(), FieldElement::from_u64(value)]
}

pub fn withdraw(root: &Root, nullifier: &Nullifier, value: u64) -> Vec<FieldElement> {
    vec![root.into(), nullifier.to_field(), FieldElement::from_u64(value)]
}

pub fn range(commitment: &Commitment) -> Vec<FieldElement> {
    vec![commitment.to_field()]
}

/// `binding` is the leaf commitment for a plain membership check, or the
/// spend tag when a transaction input proves its output is in the range
pub fn inclusion(root: &Root, leaf: LeafIndex, binding: FieldElement) -> Vec<FieldElement> {
    vec![root.into(), FieldElement::from_u64(leaf.position()), binding]
}

pub fn mimblewimble(tx: &Transaction) -> Vec<FieldElement> {
    let mut inputs = Vec::with_capacity(MIMBLEWIMBLE_ARITY);
    inputs.push(FieldElement::from_u64(tx.kernel.fee));
    inputs.push(tx.kernel.metadata);
    inputs.extend(tx.nullifier_words());
    inputs.extend(tx.output_words());
    inputs.push(tx.kernel.excess.to_field());
    inputs.push(tx.kernel.signature.nonce.to_field());
    inputs
}

/// aggregate inputs; slot words are flattened per transaction, empty slots
/// as zero
pub fn roll_up(prior_root: &Root, new_root: &Root, txs: &[Transaction]) -> Vec<FieldElement> {
    let mut inputs: Vec<FieldElement> = Vec::with_capacity(2 + (MAX_INPUTS + MAX_OUTPUTS + 1) * txs.len());
    inputs.push(prior_root.into());
    inputs.push(new_root.into());
    inputs.extend(txs.iter().flat_map(|tx| tx.nullifier_words()));
    inputs.extend(txs.iter().flat_map(|tx| tx.output_words()));
    inputs.extend(txs.iter().map(|tx| FieldElement::from_u64(tx.kernel.fee)));
    inputs
}

/// per-transaction statements checked in strict mode: a range proof per
/// output, an inclusion proof per input against the prior root, and the
/// validity proof
pub fn transaction_statements(prior_root: &Root, tx: &Transaction) -> Vec<Statement> {
    let mut statements = Vec::with_capacity(MAX_INPUTS + MAX_OUTPUTS + 1);
    for output in tx.created() {
        statements.push(Statement::new(
            CircuitKind::RangeProof,
            output.range_proof,
            range(&output.commitment),
        ));
    }
    for input in tx.spends() {
        statements.push(Statement::new(
            CircuitKind::MmrInclusion,
            input.inclusion_proof,
            inclusion(prior_root, input.leaf_index, input.nullifier.to_field()),
        ));
    }
    statements.push(Statement::new(
        CircuitKind::MimblewimbleTx,
        tx.validity_proof,
        mimblewimble(tx),
    ));
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;
    use crate::proof::Proof;
    use crate::transaction::tests::{output, spend};

    fn tx(fee: u64) -> Transaction {
        Transaction {
            kernel: Kernel {
                fee,
                ..Kernel::default()
            },
            inputs: [Some(spend(1, 0)), None],
            outputs: [Some(output(2)), Some(output(3))],
            validity_proof: Proof::ZERO,
        }
    }

    #[test]
    fn test_layouts_match_arity() {
        let t = tx(5);
        let root = Root::empty();
        assert_eq!(deposit(&Commitment([1; 32]), 9).len(), CircuitKind::Deposit.arity());
        assert_eq!(
            withdraw(&root, &Nullifier([1; 32]), 9).len(),
            CircuitKind::Withdraw.arity()
        );
        assert_eq!(range(&Commitment([1; 32])).len(), CircuitKind::RangeProof.arity());
        assert_eq!(
            inclusion(&root, LeafIndex(0), FieldElement::ONE).len(),
            CircuitKind::MmrInclusion.arity()
        );
        assert_eq!(mimblewimble(&t).len(), CircuitKind::MimblewimbleTx.arity());

        for size in RollUpSize::ALL {
            let txs = vec![t.clone(); size.get()];
            assert_eq!(
                roll_up(&root, &root, &txs).len(),
                CircuitKind::RollUp(size).arity()
            );
        }
    }

    #[test]
    fn test_roll_up_order() {
        let prior = Root([1; 32]);
        let new = Root([2; 32]);
        let inputs = roll_up(&prior, &new, &[tx(5), tx(6)]);

        assert_eq!(inputs[0], FieldElement::from(prior));
        assert_eq!(inputs[1], FieldElement::from(new));
        // nullifiers: tx0 slot0, tx0 slot1, tx1 slot0, tx1 slot1
        assert_eq!(inputs[2], Nullifier([1; 32]).to_field());
        assert_eq!(inputs[3], FieldElement::ZERO);
        // outputs follow
        assert_eq!(inputs[6], Commitment([2; 32]).to_field());
        assert_eq!(inputs[7], Commitment([3; 32]).to_field());
        // fees last
        assert_eq!(inputs[10], FieldElement::from_u64(5));
        assert_eq!(inputs[11], FieldElement::from_u64(6));
    }

    #[test]
    fn test_inclusion_uses_position() {
        let inputs = inclusion(&Root::empty(), LeafIndex(0), FieldElement::ONE);
        assert_eq!(inputs[1], FieldElement::from_u64(1));
    }

    #[test]
    fn test_transaction_statements() {
        let statements = transaction_statements(&Root::empty(), &tx(1));
        let kinds: Vec<_> = statements.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CircuitKind::RangeProof,
                CircuitKind::RangeProof,
                CircuitKind::MmrInclusion,
                CircuitKind::MimblewimbleTx,
            ]
        );
    }
}
