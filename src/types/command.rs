//! Balance command types for the replay CLI
//!
//! A command is one line of the input CSV: an operation against a single
//! account, with an amount for the operations that move money.

use super::account::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Operations accepted by the replay CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Create an account; a positive opening amount is recorded as a recharge
    Open,

    /// Create an account carrying a legacy balance with no ledger history
    Import,

    /// Add funds (recharge)
    Credit,

    /// Return funds after a reversed consumption
    Refund,

    /// Spend funds (consume); rejected when the balance is insufficient
    Deduct,

    /// Compare the stored balance against the ledger
    Validate,

    /// Overwrite a drifted balance with the ledger-derived value
    Repair,
}

impl CommandKind {
    /// Whether the command must carry an amount
    pub fn requires_amount(self) -> bool {
        matches!(
            self,
            CommandKind::Import | CommandKind::Credit | CommandKind::Refund | CommandKind::Deduct
        )
    }
}

/// One parsed input command
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceCommand {
    pub kind: CommandKind,
    pub account: AccountId,
    pub amount: Option<Decimal>,
    /// Operator on whose behalf the command runs
    pub initiator: Option<String>,
}
