//! rollup state
//!
//! everything the engine mutates: one [`Pool`] per asset, the global
//! spent-nullifier set, optimistic batches and the event buffer. only
//! [`crate::Engine`] writes here, after all checks for an operation passed.

use std::collections::{BTreeMap, HashMap, VecDeque};

use mimble_mmr::{LeafIndex, Mmr, Root};

use crate::batch::{BatchId, BatchStatus, OptimisticBatch};
use crate::event::Event;
use crate::kernel::Kernel;
use crate::ledger::AssetId;
use crate::note::{Commitment, ShieldedOutput};
use crate::nullifier::{Nullifier, NullifierSet};

/// bounded record of superseded roots, oldest first
#[derive(Clone, Debug)]
pub struct RootHistory {
    capacity: usize,
    /// (root, accumulator width when it was current)
    entries: VecDeque<(Root, u64)>,
}

impl RootHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, root: Root, width: u64) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((root, width));
    }

    pub fn width_of(&self, root: &Root) -> Option<u64> {
        self.entries
            .iter()
            .rev()
            .find(|(r, _)| r == root)
            .map(|(_, width)| *width)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// custody pool of one asset
#[derive(Clone, Debug)]
pub struct Pool {
    mmr: Mmr,
    root: Root,
    history: RootHistory,
    pub(crate) collateral: u128,
    pub(crate) halted: bool,
    /// pending lineage, oldest first; each batch chains from the previous
    pub(crate) pending: Vec<BatchId>,
    kernels: Vec<Kernel>,
}

impl Pool {
    pub fn new(history_size: usize) -> Self {
        let mmr = Mmr::new();
        Self {
            root: mmr.root(),
            mmr,
            history: RootHistory::new(history_size),
            collateral: 0,
            halted: false,
            pending: Vec::new(),
            kernels: Vec::new(),
        }
    }

    pub fn current_root(&self) -> Root {
        self.root
    }

    pub fn mmr(&self) -> &Mmr {
        &self.mmr
    }

    pub fn width(&self) -> u64 {
        self.mmr.width()
    }

    /// accumulator width under `root`, if it is current or retained
    pub fn width_of(&self, root: &Root) -> Option<u64> {
        if *root == self.root {
            return Some(self.width());
        }
        self.history.width_of(root)
    }

    pub fn is_known_root(&self, root: &Root) -> bool {
        self.width_of(root).is_some()
    }

    pub fn collateral(&self) -> u128 {
        self.collateral
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn pending(&self) -> &[BatchId] {
        &self.pending
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    /// append outputs in order; the superseded root moves to history
    fn append(&mut self, outputs: &[Commitment]) -> Vec<LeafIndex> {
        if outputs.is_empty() {
            return Vec::new();
        }

        self.history.push(self.root, self.width());
        let indices = outputs.iter().map(|c| self.mmr.append(c.0)).collect();
        self.root = self.mmr.root();
        indices
    }
}

/// spends and appends of one accepted operation
pub(crate) struct Commit<'a> {
    pub nullifiers: &'a [Nullifier],
    pub outputs: &'a [Commitment],
    pub kernels: &'a [Kernel],
    pub collateral_in: u128,
    pub collateral_out: u128,
}

#[derive(Debug)]
pub struct RollupState {
    history_size: usize,
    pools: HashMap<AssetId, Pool>,
    spent: NullifierSet,
    batches: BTreeMap<BatchId, OptimisticBatch>,
    next_batch: u64,
    /// successful operations so far
    sequence: u64,
    events: Vec<Event>,
}

impl RollupState {
    pub fn new(history_size: usize) -> Self {
        Self {
            history_size,
            pools: HashMap::new(),
            spent: NullifierSet::new(),
            batches: BTreeMap::new(),
            next_batch: 0,
            sequence: 0,
            events: Vec::new(),
        }
    }

    pub fn pool(&self, asset: &AssetId) -> Option<&Pool> {
        self.pools.get(asset)
    }

    pub(crate) fn pool_mut(&mut self, asset: &AssetId) -> Option<&mut Pool> {
        self.pools.get_mut(asset)
    }

    /// pool for `asset`, created empty on first use
    pub(crate) fn open_pool(&mut self, asset: &AssetId) -> &mut Pool {
        let history_size = self.history_size;
        self.pools
            .entry(*asset)
            .or_insert_with(|| Pool::new(history_size))
    }

    pub fn spent(&self) -> &NullifierSet {
        &self.spent
    }

    pub fn batch(&self, id: BatchId) -> Option<&OptimisticBatch> {
        self.batches.get(&id)
    }

    /// mark `id` finalized, keeping only its header
    pub(crate) fn finalize_batch(&mut self, id: BatchId) {
        if let Some(batch) = self.batches.get_mut(&id) {
            batch.status = BatchStatus::Finalized;
            batch.nullifiers = Vec::new();
            batch.outputs = Vec::new();
            batch.kernels = Vec::new();
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn advance_sequence(&mut self) {
        self.sequence += 1;
    }

    pub(crate) fn next_batch_id(&mut self) -> BatchId {
        let id = BatchId(self.next_batch);
        self.next_batch += 1;
        id
    }

    /// pending batches of `asset` in lineage order
    pub fn pending_batches(&self, asset: &AssetId) -> Vec<&OptimisticBatch> {
        self.pools
            .get(asset)
            .map(|pool| pool.pending.iter().filter_map(|id| self.batches.get(id)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert_batch(&mut self, batch: OptimisticBatch) {
        let (id, asset, new_root) = (batch.id, batch.asset, batch.new_root);
        self.open_pool(&asset).pending.push(id);
        self.batches.insert(id, batch);
        self.events.push(Event::BatchPending { id, asset, new_root });
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// apply an accepted operation to `asset`'s pool and the spent set
    pub(crate) fn commit(&mut self, asset: &AssetId, commit: Commit<'_>) -> Vec<ShieldedOutput> {
        let history_size = self.history_size;
        let pool = self
            .pools
            .entry(*asset)
            .or_insert_with(|| Pool::new(history_size));

        for nullifier in commit.nullifiers {
            self.spent.insert(*nullifier);
            self.events.push(Event::NullifierSpent {
                asset: *asset,
                nullifier: *nullifier,
            });
        }

        let indices = pool.append(commit.outputs);
        let outputs: Vec<ShieldedOutput> = commit
            .outputs
            .iter()
            .zip(indices)
            .map(|(commitment, leaf_index)| ShieldedOutput {
                commitment: *commitment,
                leaf_index,
            })
            .collect();

        for output in &outputs {
            self.events.push(Event::OutputCommitted {
                asset: *asset,
                commitment: output.commitment,
                leaf_index: output.leaf_index,
            });
        }
        if !outputs.is_empty() {
            self.events.push(Event::RootUpdated {
                asset: *asset,
                root: pool.root,
            });
        }

        pool.collateral = pool
            .collateral
            .saturating_add(commit.collateral_in)
            .saturating_sub(commit.collateral_out);
        pool.kernels.extend_from_slice(commit.kernels);

        outputs
    }

    /// drop pending batches of `asset` that no longer chain from the current
    /// root or claim a nullifier spent since submission, with every batch
    /// built on top of them
    pub(crate) fn prune_pending(&mut self, asset: &AssetId) -> Vec<BatchId> {
        let Some(pool) = self.pools.get_mut(asset) else {
            return Vec::new();
        };

        let mut tip = pool.root;
        let mut keep = 0;
        for id in &pool.pending {
            match self.batches.get(id) {
                Some(batch)
                    if batch.prior_root == tip
                        && !batch.nullifiers.iter().any(|n| self.spent.contains(n)) =>
                {
                    tip = batch.new_root;
                    keep += 1;
                }
                _ => break,
            }
        }

        let dropped = pool.pending.split_off(keep);
        self.abandon(asset, &dropped);
        dropped
    }

    /// drop pending batches submitted more than `ttl` operations ago, with
    /// their descendants
    pub(crate) fn expire_pending(&mut self, ttl: u64) -> Vec<(AssetId, BatchId)> {
        let sequence = self.sequence;
        let mut expired = Vec::new();

        let assets: Vec<AssetId> = self.pools.keys().copied().collect();
        for asset in assets {
            let Some(pool) = self.pools.get_mut(&asset) else {
                continue;
            };
            let first = pool.pending.iter().position(|id| {
                self.batches
                    .get(id)
                    .map_or(true, |b| sequence.saturating_sub(b.submitted_at) > ttl)
            });
            if let Some(first) = first {
                let dropped = pool.pending.split_off(first);
                self.abandon(&asset, &dropped);
                expired.extend(dropped.into_iter().map(|id| (asset, id)));
            }
        }

        expired
    }

    fn abandon(&mut self, asset: &AssetId, ids: &[BatchId]) {
        for id in ids {
            self.batches.remove(id);
            self.events.push(Event::BatchAbandoned {
                id: *id,
                asset: *asset,
            });
        }
    }

    /// remove the lineage head after it was finalized
    pub(crate) fn pop_pending_head(&mut self, asset: &AssetId, id: BatchId) {
        if let Some(pool) = self.pools.get_mut(asset) {
            if pool.pending.first() == Some(&id) {
                pool.pending.remove(0);
            }
        }
    }
}
