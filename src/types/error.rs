//! Error types for balance-guard
//!
//! This module defines all error types that can occur while mutating or
//! repairing balances.
//!
//! # Error Categories
//!
//! - **Transient**: lock unavailable, retry budget exhausted. Nothing was
//!   written; the caller may retry the whole operation later.
//! - **Terminal domain errors**: insufficient funds, unknown account, invalid
//!   amount, arithmetic overflow. Never retried internally.
//! - **Infrastructure**: backend failures, file I/O, CSV parsing, configuration.

use crate::types::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for balance operations
///
/// Each variant carries the context a caller needs to present an accurate
/// message without re-reading any state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BalanceError {
    /// Amount was zero or negative
    ///
    /// Rejected before any lock is taken.
    #[error("Invalid amount {amount} for {operation} on account {account}: amount must be positive")]
    InvalidAmount {
        /// Account the operation targeted
        account: AccountId,
        /// The rejected amount
        amount: Decimal,
        /// Operation that was attempted
        operation: String,
    },

    /// Deduction larger than the current balance
    ///
    /// Terminal: the balance and version are left untouched.
    #[error("Insufficient funds on account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Account ID
        account: AccountId,
        /// Balance observed at the time of the failure
        balance: Decimal,
        /// Amount the caller tried to deduct
        requested: Decimal,
    },

    /// No balance row exists for the account
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Account ID
        account: AccountId,
    },

    /// Attempt to open an account that already has a balance row
    #[error("Account {account} already exists")]
    AccountExists {
        /// Account ID
        account: AccountId,
    },

    /// A balance or ledger computation would overflow
    ///
    /// Terminal: the operation is rejected before anything is written.
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account ID
        account: AccountId,
    },

    /// The per-account lock could not be acquired
    ///
    /// Either the wait timed out or the lock provider was unreachable.
    /// The balance store was not touched.
    #[error("Account lock '{key}' temporarily unavailable ({reason}), retry later")]
    LockUnavailable {
        /// Lock key that was requested
        key: String,
        /// Why the acquisition failed
        reason: String,
    },

    /// Every optimistic write attempt lost its race
    #[error("Concurrent modification on account {account}: gave up after {attempts} attempts, retry later")]
    ConcurrentModificationExceeded {
        /// Account ID
        account: AccountId,
        /// Number of attempts made
        attempts: u32,
    },

    /// A collaborator (store, ledger, lock provider, audit sink) failed
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the failure
        message: String,
    },

    /// I/O error while reading or writing files
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Configuration could not be used
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

/// Errors surfaced by the consistency repairer
pub type RepairError = BalanceError;

impl From<std::io::Error> for BalanceError {
    fn from(error: std::io::Error) -> Self {
        BalanceError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for BalanceError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        BalanceError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl BalanceError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(account: AccountId, amount: Decimal, operation: &str) -> Self {
        BalanceError::InvalidAmount {
            account,
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, balance: Decimal, requested: Decimal) -> Self {
        BalanceError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        BalanceError::AccountNotFound { account }
    }

    /// Create an AccountExists error
    pub fn account_exists(account: AccountId) -> Self {
        BalanceError::AccountExists { account }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        BalanceError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a LockUnavailable error
    pub fn lock_unavailable(key: &str, reason: &str) -> Self {
        BalanceError::LockUnavailable {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a ConcurrentModificationExceeded error
    pub fn concurrent_modification_exceeded(account: AccountId, attempts: u32) -> Self {
        BalanceError::ConcurrentModificationExceeded { account, attempts }
    }

    /// Create a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        BalanceError::Backend {
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        BalanceError::Config {
            message: message.into(),
        }
    }

    /// Whether retrying the whole operation later may succeed
    ///
    /// Only lock contention and an exhausted version-retry budget qualify;
    /// both guarantee that nothing was written.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BalanceError::LockUnavailable { .. }
                | BalanceError::ConcurrentModificationExceeded { .. }
        )
    }
}
