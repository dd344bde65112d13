//! external asset ledger
//!
//! the engine never holds tokens itself. custody movements go through an
//! [`AssetLedger`]; a failed transfer aborts the operation before any
//! rollup state is touched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::hex32;

/// fungible asset (token contract) identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(#[serde(with = "hex32")] pub [u8; 32]);

/// public account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(#[serde(with = "hex32")] pub [u8; 32]);

macro_rules! hex_id {
    ($ty:ident) => {
        impl $ty {
            pub fn to_bytes(&self) -> [u8; 32] {
                self.0
            }

            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($ty), "({})"), hex::encode(&self.0[..8]))
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

hex_id!(AssetId);
hex_id!(AccountId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: {account} holds {available}, needs {needed}")]
    InsufficientBalance {
        account: AccountId,
        available: u128,
        needed: u128,
    },

    #[error("custody holds {available} of {asset}, needs {needed}")]
    InsufficientCustody {
        asset: AssetId,
        available: u128,
        needed: u128,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// custody capability for the pool
pub trait AssetLedger {
    /// move `amount` of `asset` from `from` into custody
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), LedgerError>;

    /// move `amount` of `asset` out of custody to `to`
    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), LedgerError>;
}

/// in-process ledger for tests and devnets
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(AssetId, AccountId), u128>,
    custody: HashMap<AssetId, u128>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// credit `account` out of thin air
    pub fn mint(&mut self, asset: &AssetId, account: &AccountId, amount: u128) {
        let balance = self.balances.entry((*asset, *account)).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, asset: &AssetId, account: &AccountId) -> u128 {
        self.balances.get(&(*asset, *account)).copied().unwrap_or(0)
    }

    /// tokens held on behalf of the pool
    pub fn custody(&self, asset: &AssetId) -> u128 {
        self.custody.get(asset).copied().unwrap_or(0)
    }
}

impl AssetLedger for InMemoryLedger {
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *from,
                available,
                needed: amount,
            });
        }

        self.balances.insert((*asset, *from), available - amount);
        *self.custody.entry(*asset).or_default() += amount;
        Ok(())
    }

    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), LedgerError> {
        let available = self.custody(asset);
        if available < amount {
            return Err(LedgerError::InsufficientCustody {
                asset: *asset,
                available,
                needed: amount,
            });
        }

        self.custody.insert(*asset, available - amount);
        self.mint(asset, to, amount);
        Ok(())
    }
}
