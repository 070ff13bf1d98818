//! Collaborator traits for lock, balance, ledger and audit backends
//!
//! The core never talks to Redis, a database or a log file directly. Each
//! collaborator sits behind one of these traits and is injected as an
//! `Arc<dyn Trait>` when the mutator, validator and repairer are built.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::time::Instant;
use uuid::Uuid;

use crate::types::{
    AccountId, BalanceError, BalanceSnapshot, LedgerEntry, RepairEvent, Version,
};

/// Process-local view of an externally held lock
///
/// The handle is not `Clone`: exactly one owner may release it. The token
/// identifies this particular acquisition so that releasing a stale handle
/// never frees a lock that has since been taken over by someone else.
#[derive(Debug)]
pub struct LockHandle {
    key: String,
    token: String,
    acquired_at: Instant,
    lease_expiry: Instant,
}

impl LockHandle {
    /// Create a handle for a lock just acquired on `key` for `lease`
    pub fn new(key: impl Into<String>, lease: Duration) -> Self {
        let acquired_at = Instant::now();
        LockHandle {
            key: key.into(),
            token: Uuid::new_v4().to_string(),
            acquired_at,
            lease_expiry: acquired_at + lease,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Instant after which the provider may treat the lock as abandoned
    pub fn lease_expiry(&self) -> Instant {
        self.lease_expiry
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.lease_expiry
    }
}

/// Distributed mutual-exclusion provider
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Try to acquire `key`, waiting at most `wait` for a current holder
    ///
    /// Returns `Ok(None)` when the wait timed out and `Err` when the provider
    /// itself could not be reached.
    async fn try_acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockHandle>, BalanceError>;

    /// Release a lock. Releasing the same handle twice is a no-op.
    async fn release(&self, handle: &LockHandle) -> Result<(), BalanceError>;

    /// Diagnostic only; never used for correctness decisions
    async fn is_locked(&self, key: &str) -> bool;
}

/// Versioned balance rows
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Read the current balance and version, `None` if the account is absent
    async fn read(&self, account_id: AccountId) -> Result<Option<BalanceSnapshot>, BalanceError>;

    /// Write `new_balance` only if the stored version equals `expected_version`
    ///
    /// Returns the number of rows affected: 1 when applied (the version is
    /// bumped by one), 0 when another writer got there first.
    async fn conditional_write(
        &self,
        account_id: AccountId,
        new_balance: Decimal,
        expected_version: Version,
        operator: &str,
    ) -> Result<u64, BalanceError>;

    /// Create a balance row at version zero
    async fn create(
        &self,
        account_id: AccountId,
        opening_balance: Decimal,
        operator: &str,
    ) -> Result<(), BalanceError>;
}

/// Read side of the append-only ledger
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Sum of all signed entries for the account
    async fn sum_signed_entries(&self, account_id: AccountId) -> Result<Decimal, BalanceError>;
}

/// Write side of the append-only ledger
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn append(&self, entry: LedgerEntry) -> Result<(), BalanceError>;
}

/// Destination for repair audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &RepairEvent) -> Result<(), BalanceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lock_handle_lease_expiry() {
        let handle = LockHandle::new("account_balance_lock:1", Duration::from_secs(5));

        assert_eq!(handle.key(), "account_balance_lock:1");
        assert_eq!(
            handle.lease_expiry() - handle.acquired_at(),
            Duration::from_secs(5)
        );
        assert!(!handle.is_expired());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(handle.is_expired());
    }

    #[test]
    fn test_lock_handles_have_distinct_tokens() {
        let first = LockHandle::new("k", Duration::from_secs(1));
        let second = LockHandle::new("k", Duration::from_secs(1));

        assert_ne!(first.token(), second.token());
    }
}
