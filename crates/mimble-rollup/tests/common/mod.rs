#![allow(dead_code)]

use mimble_rollup::verifier::{digest_proof, layout};
use mimble_rollup::{
    AccountId, AssetId, CircuitKind, Commitment, DepositReceipt, Engine, EngineConfig,
    FieldElement, InMemoryLedger, Kernel, KernelSignature, LeafIndex, Nullifier, Proof, Result,
    Root, RollUpSize, SpendInput, Transaction, TxOutput, VerifierSet,
};

pub const TOKEN: AssetId = AssetId([0x11; 32]);
pub const ALICE: AccountId = AccountId([0xa1; 32]);
pub const BOB: AccountId = AccountId([0xb0; 32]);
pub const RELAYER: AccountId = AccountId([0xee; 32]);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine() -> Engine<InMemoryLedger> {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> Engine<InMemoryLedger> {
    init_tracing();
    let mut ledger = InMemoryLedger::new();
    ledger.mint(&TOKEN, &ALICE, 1_000_000);
    Engine::new(config, VerifierSet::digest(), ledger).unwrap()
}

pub fn commitment(tag: u64) -> Commitment {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"test.commitment");
    hasher.update(&tag.to_le_bytes());
    Commitment(*hasher.finalize().as_bytes())
}

pub fn secret(tag: u64) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"test.secret");
    hasher.update(&tag.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// nullifier of the output made with `commitment(tag)`
pub fn nullifier(tag: u64) -> Nullifier {
    Nullifier::derive(&secret(tag), &commitment(tag))
}

pub fn deposit_proof(c: &Commitment, value: u64) -> Proof {
    digest_proof(CircuitKind::Deposit, &layout::deposit(c, value))
}

pub fn withdraw_proof(root: &Root, nf: &Nullifier, value: u64) -> Proof {
    digest_proof(CircuitKind::Withdraw, &layout::withdraw(root, nf, value))
}

pub fn deposit(engine: &mut Engine<InMemoryLedger>, tag: u64, value: u64) -> Result<DepositReceipt> {
    let c = commitment(tag);
    engine.deposit(&TOKEN, &ALICE, c, value, &deposit_proof(&c, value))
}

pub fn withdraw(engine: &mut Engine<InMemoryLedger>, tag: u64, value: u64, root: Root) -> Result<()> {
    let nf = nullifier(tag);
    engine.withdraw(&TOKEN, &BOB, nf, value, root, &withdraw_proof(&root, &nf, value))
}

/// transaction spending the outputs `inputs` (tag, leaf) and creating
/// `commitment(tag)` for each of `outputs`, with valid per-transaction proofs
pub fn tx(prior_root: &Root, inputs: &[(u64, u64)], outputs: &[u64], fee: u64) -> Transaction {
    let mut t = Transaction {
        kernel: Kernel {
            fee,
            metadata: FieldElement::from_u64(fee),
            excess: commitment(10_000 + fee),
            signature: KernelSignature {
                nonce: commitment(20_000 + fee),
                scalar: FieldElement::ONE,
            },
        },
        inputs: [None, None],
        outputs: [None, None],
        validity_proof: Proof::ZERO,
    };

    for (slot, (tag, leaf)) in t.inputs.iter_mut().zip(inputs) {
        let nf = nullifier(*tag);
        let leaf = LeafIndex(*leaf);
        *slot = Some(SpendInput {
            nullifier: nf,
            leaf_index: leaf,
            inclusion_proof: digest_proof(
                CircuitKind::MmrInclusion,
                &layout::inclusion(prior_root, leaf, nf.to_field()),
            ),
        });
    }

    for (slot, tag) in t.outputs.iter_mut().zip(outputs) {
        let c = commitment(*tag);
        *slot = Some(TxOutput {
            commitment: c,
            range_proof: digest_proof(CircuitKind::RangeProof, &layout::range(&c)),
        });
    }

    t.validity_proof = digest_proof(CircuitKind::MimblewimbleTx, &layout::mimblewimble(&t));
    t
}

fn append_outputs(mut frontier: mimble_mmr::Frontier, txs: &[Transaction]) -> Root {
    for output in txs.iter().flat_map(Transaction::created) {
        frontier.append(&output.commitment.0);
    }
    frontier.root()
}

fn current_frontier(engine: &Engine<InMemoryLedger>) -> mimble_mmr::Frontier {
    engine
        .state()
        .pool(&TOKEN)
        .map(|pool| pool.mmr().frontier())
        .unwrap_or_default()
}

/// root after appending `txs` outputs on the current root
pub fn next_root(engine: &Engine<InMemoryLedger>, txs: &[Transaction]) -> Root {
    append_outputs(current_frontier(engine), txs)
}

/// root after appending `txs` outputs on top of the pending lineage
pub fn lineage_root(engine: &Engine<InMemoryLedger>, txs: &[Transaction]) -> Root {
    let mut frontier = current_frontier(engine);
    for batch in engine.pending_batches(&TOKEN) {
        for c in &batch.outputs {
            frontier.append(&c.0);
        }
    }
    append_outputs(frontier, txs)
}

pub fn aggregate_proof(prior: &Root, new: &Root, txs: &[Transaction]) -> Proof {
    let size = RollUpSize::from_len(txs.len()).unwrap();
    digest_proof(CircuitKind::RollUp(size), &layout::roll_up(prior, new, txs))
}

/// synchronous rollup with a correct root and aggregate proof
pub fn roll_up(engine: &mut Engine<InMemoryLedger>, txs: &[Transaction]) -> Result<Root> {
    let prior = engine.current_root(&TOKEN);
    let new = next_root(engine, txs);
    let proof = aggregate_proof(&prior, &new, txs);
    engine
        .roll_up(&TOKEN, &RELAYER, prior, new, txs, &proof)
        .map(|receipt| receipt.new_root)
}
