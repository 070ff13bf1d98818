//! Ledger entry types
//!
//! The ledger is an append-only log of balance movements written by the
//! consumption, recharge and refund flows. Summing the signed entries of an
//! account gives the balance it is expected to hold.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of balance movement recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Funds added to the account
    Recharge,

    /// Funds spent from the account
    Consume,

    /// Funds returned to the account after a consumption was reversed
    Refund,
}

impl EntryKind {
    /// Sign applied to the entry amount when summing the ledger
    pub fn sign(self) -> Decimal {
        match self {
            EntryKind::Recharge | EntryKind::Refund => Decimal::ONE,
            EntryKind::Consume => Decimal::NEGATIVE_ONE,
        }
    }
}

/// One immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub account_id: AccountId,
    pub kind: EntryKind,
    /// Unsigned amount; the sign comes from `kind`
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(account_id: AccountId, kind: EntryKind, amount: Decimal) -> Self {
        LedgerEntry {
            account_id,
            kind,
            amount,
            recorded_at: Utc::now(),
        }
    }

    /// Contribution of this entry to the expected balance
    pub fn signed_amount(&self) -> Decimal {
        self.amount * self.kind.sign()
    }
}
