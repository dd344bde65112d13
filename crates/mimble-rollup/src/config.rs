//! engine configuration
//!
//! ```toml
//! root_history_size = 100
//! verify_transaction_proofs = false
//! max_pending_batches = 64
//! pending_batch_ttl = 500
//! deposit_policy = "abandon"
//! supported_assets = ["0101...01"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};
use crate::ledger::AssetId;

/// what a deposit does to optimistic batches of its asset
///
/// a deposit moves the current root, so pending batches proven against the
/// old root can never finalize afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositPolicy {
    /// the deposit lands and orphaned pending batches are abandoned.
    /// steady deposit traffic can keep optimistic batches from finalizing
    #[default]
    Abandon,
    /// deposits are rejected while any batch of the asset is pending.
    /// depositors wait for finalization or expiry
    Defer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// superseded roots retained per asset for withdraw and inclusion
    pub root_history_size: usize,
    /// also verify each transaction's range, inclusion and validity proofs
    /// behind the aggregate proof
    pub verify_transaction_proofs: bool,
    /// outstanding pending batches allowed per asset
    pub max_pending_batches: usize,
    /// abandon a pending batch this many successful operations after
    /// submission; `None` keeps it until it is finalized or orphaned
    pub pending_batch_ttl: Option<u64>,
    pub deposit_policy: DepositPolicy,
    /// assets the engine accepts; empty means any
    pub supported_assets: Vec<AssetId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_history_size: 100,
            verify_transaction_proofs: false,
            max_pending_batches: 64,
            pending_batch_ttl: None,
            deposit_policy: DepositPolicy::Abandon,
            supported_assets: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| RollupError::Config(format!("parse: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RollupError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_history_size == 0 {
            return Err(RollupError::Config("root_history_size must be at least 1".into()));
        }
        if self.max_pending_batches == 0 {
            return Err(RollupError::Config("max_pending_batches must be at least 1".into()));
        }
        if self.pending_batch_ttl == Some(0) {
            return Err(RollupError::Config("pending_batch_ttl must be at least 1".into()));
        }
        Ok(())
    }

    pub fn supports(&self, asset: &AssetId) -> bool {
        self.supported_assets.is_empty() || self.supported_assets.contains(asset)
    }
}
