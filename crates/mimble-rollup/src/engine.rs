//! transition engine
//!
//! the only writer of [`RollupState`]. every entry point runs all checks and
//! computes the resulting root before touching anything; the ledger is
//! called next, and in-memory state is mutated last. a rejected operation
//! leaves no trace.
//!
//! check order for batches: shape, duplicate nullifiers, spent nullifiers,
//! prior root, spent leaves exist under the prior root, aggregate proof,
//! per-transaction proofs (strict mode), resulting root.
//!
//! a deposit moves the current root and so orphans pending optimistic
//! batches of its asset; [`DepositPolicy`] picks whether the deposit or the
//! batches give way.

use std::collections::HashSet;

use mimble_mmr::{Frontier, LeafIndex, MmrProof, Root};
use tracing::{error, info, warn};

use crate::batch::{BatchId, BatchStatus, OptimisticBatch};
use crate::config::{DepositPolicy, EngineConfig};
use crate::error::{Result, RollupError};
use crate::event::Event;
use crate::kernel::Kernel;
use crate::ledger::{AccountId, AssetId, AssetLedger};
use crate::note::{Commitment, ShieldedOutput};
use crate::nullifier::Nullifier;
use crate::proof::Proof;
use crate::state::{Commit, Pool, RollupState};
use crate::transaction::Transaction;
use crate::verifier::{layout, CircuitKind, RollUpSize, Statement, VerifierSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub output: ShieldedOutput,
    /// current root after the append
    pub root: Root,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollUpReceipt {
    /// appended outputs in append order
    pub outputs: Vec<ShieldedOutput>,
    pub new_root: Root,
    /// paid to the relayer
    pub fees_paid: u128,
}

/// where a batch attaches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attach {
    /// directly on the current root
    Current,
    /// on the tip of the pending lineage
    Lineage,
}

/// a batch that passed every check, nothing applied yet
struct PreparedBatch {
    nullifiers: Vec<Nullifier>,
    outputs: Vec<Commitment>,
    kernels: Vec<Kernel>,
    fees: u128,
}

pub struct Engine<L: AssetLedger> {
    config: EngineConfig,
    verifiers: VerifierSet,
    ledger: L,
    state: RollupState,
}

impl<L: AssetLedger> Engine<L> {
    pub fn new(config: EngineConfig, verifiers: VerifierSet, ledger: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: RollupState::new(config.root_history_size),
            config,
            verifiers,
            ledger,
        })
    }

    /// shield `value` of `asset` from `from` as a new output
    pub fn deposit(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        commitment: Commitment,
        value: u64,
        proof: &Proof,
    ) -> Result<DepositReceipt> {
        let result = self.try_deposit(asset, from, commitment, value, proof);
        self.settle("deposit", Some(*asset), result)
    }

    /// unshield `value` of `asset` to `to`, spending `nullifier`
    pub fn withdraw(
        &mut self,
        asset: &AssetId,
        to: &AccountId,
        nullifier: Nullifier,
        value: u64,
        root: Root,
        proof: &Proof,
    ) -> Result<()> {
        let result = self.try_withdraw(asset, to, nullifier, value, root, proof);
        self.settle("withdraw", Some(*asset), result)
    }

    /// synchronous rollup of `txs.len()` transactions, a supported batch size
    pub fn roll_up(
        &mut self,
        asset: &AssetId,
        relayer: &AccountId,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        aggregate_proof: &Proof,
    ) -> Result<RollUpReceipt> {
        let result = self.try_roll_up(asset, relayer, prior_root, new_root, txs, aggregate_proof);
        self.settle("roll_up", Some(*asset), result)
    }

    /// verify a batch now, adopt its root at [`Engine::finalize_roll_up`]
    pub fn optimistic_roll_up(
        &mut self,
        asset: &AssetId,
        relayer: &AccountId,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        aggregate_proof: &Proof,
    ) -> Result<BatchId> {
        let result =
            self.try_optimistic_roll_up(asset, relayer, prior_root, new_root, txs, aggregate_proof);
        self.settle("optimistic_roll_up", Some(*asset), result)
    }

    pub fn finalize_roll_up(&mut self, id: BatchId) -> Result<RollUpReceipt> {
        let asset = self.state.batch(id).map(|b| b.asset);
        let result = self.try_finalize(id);
        self.settle("finalize_roll_up", asset, result)
    }

    /// lift the halt set by an integrity fault; returns whether the pool
    /// was halted
    pub fn resolve_integrity_fault(&mut self, asset: &AssetId) -> bool {
        match self.state.pool_mut(asset) {
            Some(pool) if pool.halted => {
                pool.halted = false;
                info!(asset = %asset, "integrity fault resolved, batch acceptance resumed");
                true
            }
            _ => false,
        }
    }

    /// check a membership proof for `commitment` at `leaf` under `root`
    ///
    /// false if the root is not current or retained, or the leaf did not
    /// exist yet under it
    pub fn verify_inclusion(
        &self,
        asset: &AssetId,
        root: &Root,
        leaf: LeafIndex,
        commitment: &Commitment,
        proof: &Proof,
    ) -> Result<bool> {
        let width = match self.state.pool(asset).and_then(|pool| pool.width_of(root)) {
            Some(width) => width,
            None => return Ok(false),
        };
        if leaf.0 >= width {
            return Ok(false);
        }

        self.verifiers.verify(
            CircuitKind::MmrInclusion,
            proof,
            &layout::inclusion(root, leaf, commitment.to_field()),
        )
    }

    /// accumulator path for `leaf` against a current or retained root
    pub fn inclusion_proof(&self, asset: &AssetId, leaf: LeafIndex, root: &Root) -> Result<MmrProof> {
        let pool = self
            .state
            .pool(asset)
            .ok_or(RollupError::UnknownRoot(*root))?;
        let width = pool.width_of(root).ok_or(RollupError::UnknownRoot(*root))?;
        Ok(pool.mmr().prove_at(leaf, width)?)
    }

    pub fn current_root(&self, asset: &AssetId) -> Root {
        self.state
            .pool(asset)
            .map(Pool::current_root)
            .unwrap_or_else(Root::empty)
    }

    pub fn is_known_root(&self, asset: &AssetId, root: &Root) -> bool {
        match self.state.pool(asset) {
            Some(pool) => pool.is_known_root(root),
            None => *root == Root::empty(),
        }
    }

    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.state.spent().contains(nullifier)
    }

    pub fn collateral(&self, asset: &AssetId) -> u128 {
        self.state.pool(asset).map_or(0, Pool::collateral)
    }

    pub fn leaf_count(&self, asset: &AssetId) -> u64 {
        self.state.pool(asset).map_or(0, Pool::width)
    }

    pub fn is_halted(&self, asset: &AssetId) -> bool {
        self.state.pool(asset).is_some_and(Pool::is_halted)
    }

    /// accepted kernels of `asset`, in acceptance order
    pub fn kernels(&self, asset: &AssetId) -> &[Kernel] {
        self.state.pool(asset).map(Pool::kernels).unwrap_or_default()
    }

    /// pending or finalized batch; finalized ones keep their header only
    pub fn batch(&self, id: BatchId) -> Option<&OptimisticBatch> {
        self.state.batch(id)
    }

    pub fn pending_batches(&self, asset: &AssetId) -> Vec<&OptimisticBatch> {
        self.state.pending_batches(asset)
    }

    /// drain buffered events
    pub fn take_events(&mut self) -> Vec<Event> {
        self.state.take_events()
    }

    pub fn state(&self) -> &RollupState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn verifiers(&self) -> &VerifierSet {
        &self.verifiers
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    fn try_deposit(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        commitment: Commitment,
        value: u64,
        proof: &Proof,
    ) -> Result<DepositReceipt> {
        self.check_asset(asset)?;
        if commitment.is_zero() {
            return Err(RollupError::MalformedInput("zero output commitment".into()));
        }
        if self.config.deposit_policy == DepositPolicy::Defer {
            let pending = self.state.pool(asset).map_or(0, |pool| pool.pending().len());
            if pending > 0 {
                return Err(RollupError::DepositDeferred {
                    asset: *asset,
                    pending,
                });
            }
        }

        self.verifiers
            .require(CircuitKind::Deposit, proof, &layout::deposit(&commitment, value))?;

        self.ledger
            .transfer_in(asset, from, u128::from(value))
            .map_err(RollupError::AssetTransferFailed)?;

        let outputs = self.state.commit(
            asset,
            Commit {
                nullifiers: &[],
                outputs: &[commitment],
                kernels: &[],
                collateral_in: u128::from(value),
                collateral_out: 0,
            },
        );
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| RollupError::MalformedInput("deposit produced no output".into()))?;
        let root = self.current_root(asset);

        info!(asset = %asset, leaf = %output.leaf_index, value, root = %root, "deposit committed");
        self.prune_pending(asset);

        Ok(DepositReceipt { output, root })
    }

    fn try_withdraw(
        &mut self,
        asset: &AssetId,
        to: &AccountId,
        nullifier: Nullifier,
        value: u64,
        root: Root,
        proof: &Proof,
    ) -> Result<()> {
        self.check_asset(asset)?;
        if nullifier.is_zero() {
            return Err(RollupError::MalformedInput("zero nullifier".into()));
        }
        if self.is_spent(&nullifier) {
            return Err(RollupError::DoubleSpend(nullifier));
        }

        let pool = self
            .state
            .pool(asset)
            .filter(|pool| pool.is_known_root(&root))
            .ok_or(RollupError::UnknownRoot(root))?;

        self.verifiers
            .require(CircuitKind::Withdraw, proof, &layout::withdraw(&root, &nullifier, value))?;

        let amount = u128::from(value);
        if pool.collateral() < amount {
            return Err(RollupError::InsufficientCollateral {
                needed: amount,
                available: pool.collateral(),
            });
        }

        self.ledger
            .transfer_out(asset, to, amount)
            .map_err(RollupError::AssetTransferFailed)?;

        self.state.commit(
            asset,
            Commit {
                nullifiers: &[nullifier],
                outputs: &[],
                kernels: &[],
                collateral_in: 0,
                collateral_out: amount,
            },
        );

        info!(asset = %asset, nullifier = %nullifier, value, "withdraw committed");
        self.prune_pending(asset);

        Ok(())
    }

    fn try_roll_up(
        &mut self,
        asset: &AssetId,
        relayer: &AccountId,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        proof: &Proof,
    ) -> Result<RollUpReceipt> {
        self.check_batch_asset(asset)?;
        let batch = self.prepare_batch(asset, Attach::Current, prior_root, new_root, txs, proof)?;
        let receipt = self.apply_batch(asset, relayer, batch)?;

        info!(
            asset = %asset,
            txs = txs.len(),
            outputs = receipt.outputs.len(),
            fees = receipt.fees_paid,
            root = %receipt.new_root,
            "rollup committed"
        );
        self.prune_pending(asset);

        Ok(receipt)
    }

    fn try_optimistic_roll_up(
        &mut self,
        asset: &AssetId,
        relayer: &AccountId,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        proof: &Proof,
    ) -> Result<BatchId> {
        self.check_batch_asset(asset)?;

        let outstanding = self.state.pool(asset).map_or(0, |pool| pool.pending().len());
        if outstanding >= self.config.max_pending_batches {
            return Err(RollupError::PendingLimit(self.config.max_pending_batches));
        }

        let batch = self.prepare_batch(asset, Attach::Lineage, prior_root, new_root, txs, proof)?;

        let id = self.state.next_batch_id();
        self.state.insert_batch(OptimisticBatch {
            id,
            asset: *asset,
            prior_root,
            new_root,
            nullifiers: batch.nullifiers,
            outputs: batch.outputs,
            kernels: batch.kernels,
            fees: batch.fees,
            relayer: *relayer,
            submitted_at: self.state.sequence(),
            status: BatchStatus::Pending,
        });

        info!(asset = %asset, batch = %id, txs = txs.len(), new_root = %new_root, "optimistic batch pending");
        Ok(id)
    }

    fn try_finalize(&mut self, id: BatchId) -> Result<RollUpReceipt> {
        let batch = self.state.batch(id).ok_or(RollupError::NotFound(id))?;
        if batch.status == BatchStatus::Finalized {
            return Err(RollupError::AlreadyFinalized(id));
        }

        let asset = batch.asset;
        let relayer = batch.relayer;
        let new_root = batch.new_root;
        let pool = self.state.pool(&asset).ok_or(RollupError::NotFound(id))?;
        if pool.is_halted() {
            return Err(RollupError::Halted(asset));
        }

        // only the lineage head attaches to the current root
        if batch.prior_root != pool.current_root() {
            return Err(RollupError::StaleRoot {
                expected: pool.current_root(),
                got: batch.prior_root,
            });
        }
        if let Some(nullifier) = batch.nullifiers.iter().find(|n| self.is_spent(n)) {
            return Err(RollupError::DoubleSpend(*nullifier));
        }

        let mut frontier = pool.mmr().frontier();
        let computed = append_all(&mut frontier, &batch.outputs);
        if computed != new_root {
            return Err(RollupError::RootMismatch {
                declared: new_root,
                computed,
            });
        }

        let prepared = PreparedBatch {
            nullifiers: batch.nullifiers.clone(),
            outputs: batch.outputs.clone(),
            kernels: batch.kernels.clone(),
            fees: batch.fees,
        };
        let receipt = self.apply_batch(&asset, &relayer, prepared)?;

        self.state.pop_pending_head(&asset, id);
        self.state.finalize_batch(id);
        self.state.push_event(Event::BatchFinalized {
            id,
            asset,
            root: receipt.new_root,
        });

        info!(asset = %asset, batch = %id, root = %receipt.new_root, fees = receipt.fees_paid, "optimistic batch finalized");
        self.prune_pending(&asset);

        Ok(receipt)
    }

    /// every check of a batch, against the current root or the lineage tip
    fn prepare_batch(
        &self,
        asset: &AssetId,
        attach: Attach,
        prior_root: Root,
        new_root: Root,
        txs: &[Transaction],
        proof: &Proof,
    ) -> Result<PreparedBatch> {
        let size = RollUpSize::from_len(txs.len())?;
        for tx in txs {
            tx.check_shape()?;
        }

        let mut nullifiers = Vec::with_capacity(txs.len() * crate::MAX_INPUTS);
        let mut seen = HashSet::with_capacity(nullifiers.capacity());
        for input in txs.iter().flat_map(Transaction::spends) {
            if !seen.insert(input.nullifier) {
                return Err(RollupError::DuplicateNullifierInBatch(input.nullifier));
            }
            nullifiers.push(input.nullifier);
        }

        // an asset nobody deposited into yet has an empty pool
        let (mut frontier, mut tip) = self
            .state
            .pool(asset)
            .map_or_else(|| (Frontier::new(), Root::empty()), |pool| {
                (pool.mmr().frontier(), pool.current_root())
            });
        let mut claimed = HashSet::new();
        if attach == Attach::Lineage {
            for batch in self.state.pending_batches(asset) {
                append_all(&mut frontier, &batch.outputs);
                claimed.extend(batch.nullifiers.iter().copied());
                tip = batch.new_root;
            }
        }

        if let Some(nullifier) = nullifiers
            .iter()
            .find(|n| self.is_spent(n) || claimed.contains(*n))
        {
            return Err(RollupError::DoubleSpend(*nullifier));
        }

        if prior_root != tip {
            return Err(RollupError::StaleRoot {
                expected: tip,
                got: prior_root,
            });
        }

        let width = frontier.width();
        if let Some(input) = txs
            .iter()
            .flat_map(Transaction::spends)
            .find(|input| !input.leaf_index.is_within(width))
        {
            return Err(RollupError::MalformedInput(format!(
                "input leaf {} beyond prior root width {}",
                input.leaf_index, width
            )));
        }

        self.verifiers.require(
            CircuitKind::RollUp(size),
            proof,
            &layout::roll_up(&prior_root, &new_root, txs),
        )?;

        if self.config.verify_transaction_proofs {
            let statements: Vec<Statement> = txs
                .iter()
                .flat_map(|tx| layout::transaction_statements(&prior_root, tx))
                .collect();
            self.verifiers.verify_all(&statements)?;
        }

        let outputs: Vec<Commitment> = txs
            .iter()
            .flat_map(Transaction::created)
            .map(|output| output.commitment)
            .collect();
        let computed = append_all(&mut frontier, &outputs);
        if computed != new_root {
            return Err(RollupError::RootMismatch {
                declared: new_root,
                computed,
            });
        }

        Ok(PreparedBatch {
            nullifiers,
            outputs,
            kernels: txs.iter().map(|tx| tx.kernel).collect(),
            fees: txs.iter().map(|tx| u128::from(tx.kernel.fee)).sum(),
        })
    }

    /// pay the relayer, then spend and append
    fn apply_batch(
        &mut self,
        asset: &AssetId,
        relayer: &AccountId,
        batch: PreparedBatch,
    ) -> Result<RollUpReceipt> {
        let available = self.collateral(asset);
        if available < batch.fees {
            return Err(RollupError::InsufficientCollateral {
                needed: batch.fees,
                available,
            });
        }

        if batch.fees > 0 {
            self.ledger
                .transfer_out(asset, relayer, batch.fees)
                .map_err(RollupError::AssetTransferFailed)?;
        }

        let outputs = self.state.commit(
            asset,
            Commit {
                nullifiers: &batch.nullifiers,
                outputs: &batch.outputs,
                kernels: &batch.kernels,
                collateral_in: 0,
                collateral_out: batch.fees,
            },
        );

        Ok(RollUpReceipt {
            outputs,
            new_root: self.current_root(asset),
            fees_paid: batch.fees,
        })
    }

    fn check_asset(&self, asset: &AssetId) -> Result<()> {
        if self.config.supports(asset) {
            Ok(())
        } else {
            Err(RollupError::UnknownAsset(*asset))
        }
    }

    /// asset accepted and its pool not halted
    fn check_batch_asset(&self, asset: &AssetId) -> Result<()> {
        self.check_asset(asset)?;
        if self.state.pool(asset).is_some_and(Pool::is_halted) {
            return Err(RollupError::Halted(*asset));
        }
        Ok(())
    }

    fn prune_pending(&mut self, asset: &AssetId) {
        for id in self.state.prune_pending(asset) {
            warn!(asset = %asset, batch = %id, "pending batch orphaned, abandoned");
        }
    }

    /// bookkeeping after an operation: sequence and expiry on success,
    /// logging and halting on failure
    fn settle<T>(&mut self, op: &'static str, asset: Option<AssetId>, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.state.advance_sequence();
                if let Some(ttl) = self.config.pending_batch_ttl {
                    for (asset, id) in self.state.expire_pending(ttl) {
                        warn!(asset = %asset, batch = %id, ttl, "pending batch expired, abandoned");
                    }
                }
            }
            Err(e) if e.is_integrity_fault() => {
                if let Some(asset) = asset.as_ref() {
                    self.state.open_pool(asset).halted = true;
                }
                error!(op, asset = ?asset, error = %e, "integrity fault, batch acceptance halted");
            }
            Err(e) => {
                warn!(op, error = %e, "operation rejected");
            }
        }
        result
    }
}

/// append commitments to a frontier, returning the resulting root
fn append_all(frontier: &mut Frontier, outputs: &[Commitment]) -> Root {
    for commitment in outputs {
        frontier.append(&commitment.0);
    }
    frontier.root()
}

macro_rules! roll_up_sizes {
    ($($name:ident => $n:literal),* $(,)?) => {
        impl<L: AssetLedger> Engine<L> {
            $(
                #[doc = concat!("[`Engine::roll_up`] over exactly ", stringify!($n), " transactions")]
                pub fn $name(
                    &mut self,
                    asset: &AssetId,
                    relayer: &AccountId,
                    prior_root: Root,
                    new_root: Root,
                    txs: &[Transaction; $n],
                    aggregate_proof: &Proof,
                ) -> Result<RollUpReceipt> {
                    self.roll_up(asset, relayer, prior_root, new_root, txs, aggregate_proof)
                }
            )*
        }
    };
}

roll_up_sizes! {
    roll_up_1 => 1,
    roll_up_2 => 2,
    roll_up_4 => 4,
    roll_up_8 => 8,
    roll_up_16 => 16,
    roll_up_32 => 32,
    roll_up_64 => 64,
}

impl<L: AssetLedger + std::fmt::Debug> std::fmt::Debug for Engine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("verifiers", &self.verifiers)
            .field("ledger", &self.ledger)
            .field("sequence", &self.state.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::verifier::digest_proof;

    const TOKEN: AssetId = AssetId([1; 32]);
    const ALICE: AccountId = AccountId([2; 32]);

    fn engine() -> Engine<InMemoryLedger> {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&TOKEN, &ALICE, 1_000);
        Engine::new(EngineConfig::default(), VerifierSet::digest(), ledger).unwrap()
    }

    fn deposit(engine: &mut Engine<InMemoryLedger>, tag: u8, value: u64) -> Result<DepositReceipt> {
        let c = Commitment([tag; 32]);
        let proof = digest_proof(CircuitKind::Deposit, &layout::deposit(&c, value));
        engine.deposit(&TOKEN, &ALICE, c, value, &proof)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            root_history_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(config, VerifierSet::digest(), InMemoryLedger::new()),
            Err(RollupError::Config(_))
        ));
    }

    #[test]
    fn test_sequence_counts_successes_only() {
        let mut engine = engine();
        deposit(&mut engine, 1, 10).unwrap();
        assert!(deposit(&mut engine, 0, 10).is_err()); // zero commitment
        assert!(deposit(&mut engine, 2, 10_000).is_err()); // ledger refuses
        assert_eq!(engine.state().sequence(), 1);
        assert_eq!(engine.leaf_count(&TOKEN), 1);
    }

    #[test]
    fn test_empty_pool_queries() {
        let engine = engine();
        assert_eq!(engine.current_root(&TOKEN), Root::empty());
        assert!(engine.is_known_root(&TOKEN, &Root::empty()));
        assert_eq!(engine.collateral(&TOKEN), 0);
        assert!(engine.kernels(&TOKEN).is_empty());
        assert!(!engine.is_halted(&TOKEN));
    }

    #[test]
    fn test_missing_verifier_rejects_deposit() {
        let mut engine = Engine::new(EngineConfig::default(), VerifierSet::new(), InMemoryLedger::new()).unwrap();
        let c = Commitment([1; 32]);
        assert!(matches!(
            engine.deposit(&TOKEN, &ALICE, c, 1, &Proof::ZERO),
            Err(RollupError::MissingVerifier(CircuitKind::Deposit))
        ));
    }

    #[test]
    fn test_append_all_matches_accumulator() {
        let mut mmr = mimble_mmr::Mmr::new();
        let outputs: Vec<Commitment> = (1..=5u8).map(|i| Commitment([i; 32])).collect();
        let mut frontier = mmr.frontier();
        let root = append_all(&mut frontier, &outputs);
        for c in &outputs {
            mmr.append(c.0);
        }
        assert_eq!(root, mmr.root());
    }
}
