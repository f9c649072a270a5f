//! Accounts and ledger snapshots.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Identifier of a ledger account (the account owner's username).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Build an identifier, rejecting the empty string.
    pub fn new(username: impl Into<String>) -> DomainResult<Self> {
        let username = username.into();
        if username.is_empty() {
            return Err(DomainError::invalid_id("AccountId: empty username"));
        }
        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Balance of one account at the time it was read.
///
/// Balances are signed: the insecure strategy can drive an account below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: AccountId,
    pub balance: i64,
}

/// Every account of the ledger, ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSnapshot(Vec<AccountBalance>);

impl BalanceSnapshot {
    /// Build a snapshot; entries are sorted by account identifier.
    pub fn new(mut balances: Vec<AccountBalance>) -> Self {
        balances.sort_by(|a, b| a.account.cmp(&b.account));
        Self(balances)
    }

    pub fn balances(&self) -> &[AccountBalance] {
        &self.0
    }

    pub fn balance_of(&self, account: &AccountId) -> Option<i64> {
        self.0
            .iter()
            .find(|b| &b.account == account)
            .map(|b| b.balance)
    }

    /// Sum of all balances (the quantity transfers must conserve).
    pub fn total(&self) -> i128 {
        self.0.iter().map(|b| i128::from(b.balance)).sum()
    }

    pub fn has_negative(&self) -> bool {
        self.0.iter().any(|b| b.balance < 0)
    }
}

/// Renders as `alice=70, bob=130`.
impl core::fmt::Display for BalanceSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (idx, b) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", b.account, b.balance)?;
        }
        Ok(())
    }
}
