//! rejected operations leave no trace

mod common;

use common::*;
use mimble_rollup::{
    AccountId, AssetId, CircuitKind, EngineConfig, InMemoryLedger, Engine, Proof, RollUpSize,
    Root, RollupError,
};

/// observable state of the token pool
#[derive(Debug, PartialEq)]
struct Snapshot {
    root: Root,
    leaves: u64,
    collateral: u128,
    custody: u128,
    relayer: u128,
    sequence: u64,
}

fn snapshot(engine: &Engine<InMemoryLedger>) -> Snapshot {
    Snapshot {
        root: engine.current_root(&TOKEN),
        leaves: engine.leaf_count(&TOKEN),
        collateral: engine.collateral(&TOKEN),
        custody: engine.ledger().custody(&TOKEN),
        relayer: engine.ledger().balance_of(&TOKEN, &RELAYER),
        sequence: engine.state().sequence(),
    }
}

fn funded() -> Engine<InMemoryLedger> {
    let mut engine = engine();
    deposit(&mut engine, 1, 100).unwrap();
    deposit(&mut engine, 2, 100).unwrap();
    engine.take_events();
    engine
}

#[test]
fn test_stale_prior_root_rejects_whole_batch() {
    let mut engine = engine();
    let stale = deposit(&mut engine, 1, 100).unwrap().root;
    deposit(&mut engine, 2, 100).unwrap();
    engine.take_events();
    let before = snapshot(&engine);

    // correct proof for the transition it claims, but from an old root
    let txs = [tx(&stale, &[(1, 0)], &[3], 0), tx(&stale, &[(2, 1)], &[4], 0)];
    let new = Root([5; 32]);
    let proof = aggregate_proof(&stale, &new, &txs);
    let err = engine
        .roll_up(&TOKEN, &RELAYER, stale, new, &txs, &proof)
        .unwrap_err();

    assert!(matches!(err, RollupError::StaleRoot { got, .. } if got == stale));
    assert_eq!(snapshot(&engine), before);
    assert!(!engine.is_spent(&nullifier(1)));
    assert!(!engine.is_spent(&nullifier(2)));
    assert!(engine.take_events().is_empty());
}

#[test]
fn test_rejected_aggregate_proof() {
    let mut engine = funded();
    let before = snapshot(&engine);
    let root = engine.current_root(&TOKEN);

    let txs = [tx(&root, &[(1, 0)], &[3], 0)];
    let new = next_root(&engine, &txs);
    let err = engine
        .roll_up(&TOKEN, &RELAYER, root, new, &txs, &Proof::ZERO)
        .unwrap_err();

    assert!(matches!(
        err,
        RollupError::ProofRejected(CircuitKind::RollUp(RollUpSize::One))
    ));
    assert_eq!(snapshot(&engine), before);
    assert!(!engine.is_spent(&nullifier(1)));
}

#[test]
fn test_duplicate_nullifier_in_batch() {
    let mut engine = funded();
    let before = snapshot(&engine);
    let root = engine.current_root(&TOKEN);

    let txs = [tx(&root, &[(1, 0)], &[3], 0), tx(&root, &[(1, 0)], &[4], 0)];
    assert!(matches!(
        roll_up(&mut engine, &txs),
        Err(RollupError::DuplicateNullifierInBatch(nf)) if nf == nullifier(1)
    ));
    assert_eq!(snapshot(&engine), before);
}

#[test]
fn test_unsupported_batch_size() {
    let mut engine = funded();
    let root = engine.current_root(&TOKEN);
    let txs = vec![
        tx(&root, &[(1, 0)], &[3], 0),
        tx(&root, &[(2, 1)], &[4], 0),
        tx(&root, &[(5, 0)], &[6], 0),
    ];
    let err = engine
        .roll_up(&TOKEN, &RELAYER, root, root, &txs, &Proof::ZERO)
        .unwrap_err();
    assert!(matches!(err, RollupError::MalformedInput(_)));
}

#[test]
fn test_root_mismatch_halts_batches() {
    let mut engine = funded();
    let before = snapshot(&engine);
    let root = engine.current_root(&TOKEN);

    // the proof verifies for the declared root, which is not what the
    // outputs produce
    let txs = [tx(&root, &[(1, 0)], &[3], 0)];
    let wrong = Root([7; 32]);
    let proof = aggregate_proof(&root, &wrong, &txs);
    let err = engine
        .roll_up(&TOKEN, &RELAYER, root, wrong, &txs, &proof)
        .unwrap_err();
    assert!(err.is_integrity_fault());
    assert!(engine.is_halted(&TOKEN));
    assert_eq!(snapshot(&engine), before);

    // batch acceptance stops, deposits and withdrawals keep working
    assert!(matches!(
        roll_up(&mut engine, &txs),
        Err(RollupError::Halted(asset)) if asset == TOKEN
    ));
    deposit(&mut engine, 8, 10).unwrap();

    assert!(engine.resolve_integrity_fault(&TOKEN));
    assert!(!engine.resolve_integrity_fault(&TOKEN));

    let root = engine.current_root(&TOKEN);
    roll_up(&mut engine, &[tx(&root, &[(1, 0)], &[3], 0)]).unwrap();
}

#[test]
fn test_spent_leaf_must_exist_under_prior_root() {
    let mut strict = engine_with(EngineConfig {
        verify_transaction_proofs: true,
        ..EngineConfig::default()
    });
    deposit(&mut strict, 1, 100).unwrap();
    let before = snapshot(&strict);
    let root = strict.current_root(&TOKEN);

    // no accumulator reaches this index
    let txs = [tx(&root, &[(1, u64::MAX)], &[3], 0)];
    assert!(matches!(
        roll_up(&mut strict, &txs),
        Err(RollupError::MalformedInput(_))
    ));

    // one past the current width
    let txs = [tx(&root, &[(1, 1)], &[3], 0)];
    assert!(matches!(
        roll_up(&mut strict, &txs),
        Err(RollupError::MalformedInput(_))
    ));

    assert_eq!(snapshot(&strict), before);
    assert!(!strict.is_spent(&nullifier(1)));
    roll_up(&mut strict, &[tx(&root, &[(1, 0)], &[3], 0)]).unwrap();
}

#[test]
fn test_rejected_batch_opens_no_pool() {
    let mut engine = engine();
    let empty = Root::empty();
    let txs = [tx(&empty, &[(1, 0)], &[2], 0)];
    let proof = aggregate_proof(&empty, &empty, &txs);

    assert!(engine
        .roll_up(&TOKEN, &RELAYER, empty, empty, &txs, &proof)
        .is_err());
    assert!(engine
        .optimistic_roll_up(&TOKEN, &RELAYER, empty, empty, &txs, &proof)
        .is_err());

    assert!(engine.state().pool(&TOKEN).is_none());
    assert_eq!(engine.state().sequence(), 0);
    assert!(engine.take_events().is_empty());
}

#[test]
fn test_fee_beyond_collateral() {
    let mut engine = funded();
    let before = snapshot(&engine);
    let root = engine.current_root(&TOKEN);

    let txs = [tx(&root, &[(1, 0)], &[3], 201)];
    assert!(matches!(
        roll_up(&mut engine, &txs),
        Err(RollupError::InsufficientCollateral { needed: 201, available: 200 })
    ));
    assert_eq!(snapshot(&engine), before);
    assert!(!engine.is_spent(&nullifier(1)));
}

#[test]
fn test_strict_mode_checks_transaction_proofs() {
    let mut strict = engine_with(EngineConfig {
        verify_transaction_proofs: true,
        ..EngineConfig::default()
    });
    let mut relaxed = engine();

    for engine in [&mut strict, &mut relaxed] {
        deposit(engine, 1, 100).unwrap();
    }

    let root = strict.current_root(&TOKEN);
    let mut bad = tx(&root, &[(1, 0)], &[3], 0);
    if let Some(output) = bad.outputs[0].as_mut() {
        output.range_proof = Proof::ZERO;
    }

    let before = snapshot(&strict);
    assert!(matches!(
        roll_up(&mut strict, &[bad.clone()]),
        Err(RollupError::ProofRejected(CircuitKind::RangeProof))
    ));
    assert_eq!(snapshot(&strict), before);

    // the aggregate proof alone is enough when strict mode is off
    roll_up(&mut relaxed, &[bad]).unwrap();

    // a fully valid transaction passes strict mode
    roll_up(&mut strict, &[tx(&root, &[(1, 0)], &[3], 0)]).unwrap();
}

#[test]
fn test_strict_mode_binds_inclusion_to_prior_root() {
    let mut engine = engine_with(EngineConfig {
        verify_transaction_proofs: true,
        ..EngineConfig::default()
    });
    let old = deposit(&mut engine, 1, 100).unwrap().root;
    deposit(&mut engine, 2, 100).unwrap();

    // inclusion proven against an older root than the batch claims
    let root = engine.current_root(&TOKEN);
    let mut t = tx(&root, &[(1, 0)], &[3], 0);
    t.inputs[0] = tx(&old, &[(1, 0)], &[3], 0).inputs[0];
    assert!(matches!(
        roll_up(&mut engine, &[t]),
        Err(RollupError::ProofRejected(CircuitKind::MmrInclusion))
    ));
}

#[test]
fn test_deposit_rejections() {
    let mut engine = engine();

    // bad proof
    let c = commitment(1);
    assert!(matches!(
        engine.deposit(&TOKEN, &ALICE, c, 10, &deposit_proof(&c, 11)),
        Err(RollupError::ProofRejected(CircuitKind::Deposit))
    ));

    // depositor cannot pay
    let broke = AccountId([0x42; 32]);
    assert!(matches!(
        engine.deposit(&TOKEN, &broke, c, 10, &deposit_proof(&c, 10)),
        Err(RollupError::AssetTransferFailed(_))
    ));

    assert_eq!(engine.leaf_count(&TOKEN), 0);
    assert_eq!(engine.collateral(&TOKEN), 0);
    assert_eq!(engine.current_root(&TOKEN), Root::empty());
}

#[test]
fn test_withdraw_rejections() {
    let mut engine = engine_with(EngineConfig {
        root_history_size: 1,
        ..EngineConfig::default()
    });
    let first = deposit(&mut engine, 1, 100).unwrap().root;
    let second = deposit(&mut engine, 2, 100).unwrap().root;
    deposit(&mut engine, 3, 100).unwrap();
    let before = snapshot(&engine);

    // evicted from history
    assert!(matches!(
        withdraw(&mut engine, 1, 10, first),
        Err(RollupError::UnknownRoot(r)) if r == first
    ));

    // more than the pool holds
    assert!(matches!(
        withdraw(&mut engine, 1, 301, second),
        Err(RollupError::InsufficientCollateral { .. })
    ));

    // proof for another value
    let nf = nullifier(1);
    assert!(matches!(
        engine.withdraw(&TOKEN, &BOB, nf, 10, second, &withdraw_proof(&second, &nf, 11)),
        Err(RollupError::ProofRejected(CircuitKind::Withdraw))
    ));

    assert_eq!(snapshot(&engine), before);
    assert!(!engine.is_spent(&nf));

    // retained root still accepted
    withdraw(&mut engine, 1, 100, second).unwrap();
}

#[test]
fn test_unsupported_asset() {
    let mut engine = engine_with(EngineConfig {
        supported_assets: vec![TOKEN],
        ..EngineConfig::default()
    });
    let other = AssetId([0x99; 32]);
    let c = commitment(1);
    assert!(matches!(
        engine.deposit(&other, &ALICE, c, 1, &deposit_proof(&c, 1)),
        Err(RollupError::UnknownAsset(a)) if a == other
    ));
}
