//! thread-safe engine handle
//!
//! every mutating call holds the write lock for its whole duration, so a
//! nullifier check and the insert that follows it are never separated by
//! another operation. queries take the read lock.

use std::sync::Arc;

use mimble_mmr::Root;
use parking_lot::RwLock;

use crate::batch::BatchId;
use crate::engine::{DepositReceipt, Engine, RollUpReceipt};
use crate::error::Result;
use crate::event::Event;
use crate::ledger::{AccountId, AssetId, AssetLedger};
use crate::note::Commitment;
use crate::nullifier::Nullifier;
use crate::proof::Proof;
use crate::transaction::Transaction;

pub struct SharedEngine<L: AssetLedger> {
    inner: Arc<RwLock<Engine<L>>>,
}

impl<L: AssetLedger> Clone for SharedEngine<L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<L: AssetLedger> SharedEngine<L> {
    pub fn new(engine: Engine<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn deposit(
        &self,
        asset: &AssetId,
        from: &AccountId,
        commitment: Commitment,
        value: u64,
        proof: &Proof,
    ) -> Result<DepositReceipt> {
        self.inner.write().deposit(asset, from, commitment, value, proof)
    }

    pub fn withdraw(
        &self,
        asset: &AssetId,
        to: &AccountId,
        nullifier: Nullifier,
        value: u64,
        root: Root,
        proof: &Proof,
    ) -> Result<()> {
        self.inner.write().withdraw(asset, to, nullifier, value, root, proof)
    }

    pub fn roll_up(
        &self,
        asset: &AssetId,
        relayer: &AccountId,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        aggregate_proof: &Proof,
    ) -> Result<RollUpReceipt> {
        self.inner
            .write()
            .roll_up(asset, relayer, prior_root, new_root, txs, aggregate_proof)
    }

    pub fn optimistic_roll_up(
        &self,
        asset: &AssetId,
        relayer: &AccountId,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        aggregate_proof: &Proof,
    ) -> Result<BatchId> {
        self.inner
            .write()
            .optimistic_roll_up(asset, relayer, prior_root, new_root, txs, aggregate_proof)
    }

    pub fn finalize_roll_up(&self, id: BatchId) -> Result<RollUpReceipt> {
        self.inner.write().finalize_roll_up(id)
    }

    pub fn current_root(&self, asset: &AssetId) -> Root {
        self.inner.read().current_root(asset)
    }

    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.inner.read().is_spent(nullifier)
    }

    pub fn collateral(&self, asset: &AssetId) -> u128 {
        self.inner.read().collateral(asset)
    }

    /// drain events buffered since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.inner.write().take_events()
    }

    /// run `f` with shared access
    pub fn read<R>(&self, f: impl FnOnce(&Engine<L>) -> R) -> R {
        f(&self.inner.read())
    }

    /// run `f` as one atomic operation
    pub fn write<R>(&self, f: impl FnOnce(&mut Engine<L>) -> R) -> R {
        f(&mut self.inner.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ledger::InMemoryLedger;
    use crate::verifier::VerifierSet;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_handle_is_shareable() {
        assert_send_sync::<SharedEngine<InMemoryLedger>>();
    }

    #[test]
    fn test_clones_share_state() {
        let engine = Engine::new(EngineConfig::default(), VerifierSet::digest(), InMemoryLedger::new()).unwrap();
        let a = SharedEngine::new(engine);
        let b = a.clone();

        let asset = AssetId([1; 32]);
        a.write(|e| e.ledger_mut().mint(&asset, &AccountId([2; 32]), 5));
        assert_eq!(b.read(|e| e.ledger().balance_of(&asset, &AccountId([2; 32]))), 5);
    }
}
