//! Consistency report and repair audit types
//!
//! A `ConsistencyReport` is produced per validation run and never persisted.
//! Only applied repairs leave a trace, as a `RepairEvent` handed to the audit
//! sink.

use super::account::{AccountId, Version};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Severity of the difference between stored and ledger-derived balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Drift within the rounding tolerance
    Ok,

    /// Drift above tolerance but within the soft bound
    Warning,

    /// Drift beyond the soft bound, or the row itself is unusable
    Critical,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Ok => "OK",
            Classification::Warning => "WARNING",
            Classification::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Result of comparing one account against its ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub account_id: AccountId,
    pub stored_balance: Decimal,
    pub expected_balance: Decimal,
    /// `stored_balance - expected_balance`
    pub drift: Decimal,
    /// Version of the stored row, `None` when the account does not exist
    pub version: Option<Version>,
    pub classification: Classification,
    pub message: String,
}

impl ConsistencyReport {
    /// Report for an account with no balance row
    pub fn account_missing(account_id: AccountId) -> Self {
        ConsistencyReport {
            account_id,
            stored_balance: Decimal::ZERO,
            expected_balance: Decimal::ZERO,
            drift: Decimal::ZERO,
            version: None,
            classification: Classification::Critical,
            message: "account not found".to_string(),
        }
    }

    pub fn is_account_missing(&self) -> bool {
        self.version.is_none()
    }

    /// Whether the repairer has anything to do for this report
    pub fn needs_repair(&self) -> bool {
        self.classification != Classification::Ok
    }
}

/// Audit record for an applied repair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairEvent {
    pub account_id: AccountId,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
    /// Signed correction applied: `new_balance - old_balance`
    pub drift: Decimal,
    /// Version of the row after the repair write
    pub version: Version,
    pub classification: Classification,
    pub timestamp: DateTime<Utc>,
    pub initiator: String,
}

/// Outcome of a repair request
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// The stored balance was overwritten and the event audited
    Repaired(RepairEvent),

    /// The account was already within tolerance
    NoopNotNeeded(ConsistencyReport),
}

impl RepairOutcome {
    pub fn is_repaired(&self) -> bool {
        matches!(self, RepairOutcome::Repaired(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_account_report_is_critical() {
        let report = ConsistencyReport::account_missing(4);

        assert!(report.is_account_missing());
        assert!(report.needs_repair());
        assert_eq!(report.classification, Classification::Critical);
        assert_eq!(report.message, "account not found");
    }

    #[test]
    fn test_classification_ordering_and_display() {
        assert!(Classification::Ok < Classification::Warning);
        assert!(Classification::Warning < Classification::Critical);
        assert_eq!(Classification::Critical.to_string(), "CRITICAL");
    }
}
