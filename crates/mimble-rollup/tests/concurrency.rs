//! serialized access through the shared handle

mod common;

use std::thread;

use common::*;
use mimble_rollup::{AccountId, Event, RollupError, SharedEngine};

#[test]
fn test_concurrent_withdrawals_spend_once() {
    let mut engine = engine();
    deposit(&mut engine, 1, 100).unwrap();
    let root = engine.current_root(&TOKEN);
    let shared = SharedEngine::new(engine);

    let nf = nullifier(1);
    let proof = withdraw_proof(&root, &nf, 100);

    let handles: Vec<_> = (0..16u8)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                shared.withdraw(&TOKEN, &AccountId([i; 32]), nf, 100, root, &proof)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, RollupError::DoubleSpend(_))));

    assert!(shared.is_spent(&nf));
    assert_eq!(shared.collateral(&TOKEN), 0);
    assert_eq!(shared.read(|e| e.ledger().custody(&TOKEN)), 0);
}

#[test]
fn test_concurrent_deposits_get_distinct_leaves() {
    let shared = SharedEngine::new(engine());

    let handles: Vec<_> = (0..8u64)
        .map(|tag| {
            let shared = shared.clone();
            thread::spawn(move || shared.write(|e| deposit(e, tag, 10)))
        })
        .collect();

    let mut leaves: Vec<u64> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap().output.leaf_index.0)
        .collect();
    leaves.sort_unstable();

    assert_eq!(leaves, (0..8).collect::<Vec<_>>());
    assert_eq!(shared.collateral(&TOKEN), 80);
    assert_eq!(shared.read(|e| e.leaf_count(&TOKEN)), 8);

    let events = shared.take_events();
    let committed = events
        .iter()
        .filter(|e| matches!(e, Event::OutputCommitted { .. }))
        .count();
    assert_eq!(committed, 8);
    assert!(shared.take_events().is_empty());
}
