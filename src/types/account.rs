//! Account-related types for balance-guard
//!
//! This module defines the stored balance row and its identifiers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Account identifier
pub type AccountId = u64;

/// Optimistic-concurrency token carried by every balance row
pub type Version = i64;

/// Stored state of one account's balance
///
/// The `version` field is the compare-and-swap token: every successful write
/// bumps it by exactly one, and a write carrying any other expected version is
/// rejected by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    /// The account this row belongs to
    pub account_id: AccountId,

    /// Current balance
    ///
    /// Accounts are never overdraft-eligible, so this never drops below zero
    /// through the mutator.
    pub balance: Decimal,

    /// Number of successful writes applied to this row
    pub version: Version,

    /// When the row was last written
    pub update_time: DateTime<Utc>,

    /// Operator that performed the last write
    pub update_user: String,
}

impl AccountBalance {
    /// Create a fresh row at version zero
    ///
    /// # Arguments
    ///
    /// * `account_id` - The account identifier
    /// * `balance` - Opening balance
    /// * `operator` - Who opened the account
    pub fn new(account_id: AccountId, balance: Decimal, operator: &str) -> Self {
        AccountBalance {
            account_id,
            balance,
            version: 0,
            update_time: Utc::now(),
            update_user: operator.to_string(),
        }
    }
}

/// Balance and version as observed by a single read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub balance: Decimal,
    pub version: Version,
}

impl From<&AccountBalance> for BalanceSnapshot {
    fn from(row: &AccountBalance) -> Self {
        BalanceSnapshot {
            balance: row.balance,
            version: row.version,
        }
    }
}
