//! Ledger consistency validation
//!
//! Compares the stored balance of an account with the balance derived from
//! its ledger entries and classifies the difference. Validation is read-only.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use super::traits::{BalanceStore, LedgerReader};
use crate::types::{AccountId, BalanceError, Classification, ConsistencyReport};

/// Default rounding tolerance: one cent
pub const DEFAULT_EPSILON: Decimal = dec!(0.01);

/// Default boundary between WARNING and CRITICAL drift
pub const DEFAULT_WARNING_THRESHOLD: Decimal = dec!(10.00);

/// Tolerances used to classify drift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    /// Largest absolute drift treated as rounding noise
    pub epsilon: Decimal,
    /// Largest absolute drift still classified as a warning
    pub warning_threshold: Decimal,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl ConsistencyPolicy {
    pub fn new(epsilon: Decimal, warning_threshold: Decimal) -> Self {
        let epsilon = epsilon.abs();
        Self {
            epsilon,
            warning_threshold: warning_threshold.abs().max(epsilon),
        }
    }

    /// Classify a drift; only its magnitude matters
    pub fn classify(&self, drift: Decimal) -> Classification {
        let magnitude = drift.abs();
        if magnitude <= self.epsilon {
            Classification::Ok
        } else if magnitude <= self.warning_threshold {
            Classification::Warning
        } else {
            Classification::Critical
        }
    }

    /// An unrepresentable difference is never within tolerance
    pub fn within_tolerance(&self, stored: Decimal, expected: Decimal) -> bool {
        stored
            .checked_sub(expected)
            .is_some_and(|drift| drift.abs() <= self.epsilon)
    }
}

pub struct ConsistencyValidator {
    store: Arc<dyn BalanceStore>,
    ledger: Arc<dyn LedgerReader>,
    policy: ConsistencyPolicy,
}

impl ConsistencyValidator {
    pub fn new(
        store: Arc<dyn BalanceStore>,
        ledger: Arc<dyn LedgerReader>,
        policy: ConsistencyPolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            policy,
        }
    }

    pub fn policy(&self) -> &ConsistencyPolicy {
        &self.policy
    }

    /// Balance the account should hold according to its ledger
    pub async fn expected_balance(&self, account_id: AccountId) -> Result<Decimal, BalanceError> {
        self.ledger.sum_signed_entries(account_id).await
    }

    /// Compare one account against its ledger
    ///
    /// A missing account or a negative version is reported as `CRITICAL`
    /// rather than returned as an error. Backend failures and a drift too large
    /// to represent are `Err`.
    pub async fn validate(&self, account_id: AccountId) -> Result<ConsistencyReport, BalanceError> {
        let Some(stored) = self.store.read(account_id).await? else {
            warn!(account_id, "consistency check on missing account");
            return Ok(ConsistencyReport::account_missing(account_id));
        };

        let expected = self.expected_balance(account_id).await?;
        let drift = stored
            .balance
            .checked_sub(expected)
            .ok_or_else(|| BalanceError::arithmetic_overflow("validate", account_id))?;

        let (classification, message) = if stored.version < 0 {
            (
                Classification::Critical,
                format!("invalid version {}", stored.version),
            )
        } else {
            match self.policy.classify(drift) {
                Classification::Ok => (Classification::Ok, "balance consistent with ledger".to_string()),
                other => (other, "stored balance differs from ledger".to_string()),
            }
        };

        if classification == Classification::Ok {
            debug!(account_id, drift = %drift, "balance consistent with ledger");
        } else {
            warn!(
                account_id,
                stored_balance = %stored.balance,
                expected_balance = %expected,
                drift = %drift,
                classification = %classification,
                "{}",
                message
            );
        }

        Ok(ConsistencyReport {
            account_id,
            stored_balance: stored.balance,
            expected_balance: expected,
            drift,
            version: Some(stored.version),
            classification,
            message,
        })
    }
}
