//! Atomic per-account deduct and credit
//!
//! Composes a [`LockProvider`] with the [`OptimisticUpdater`]:
//!
//! 1. reject non-positive amounts before touching anything
//! 2. acquire the account lock (bounded wait, leased)
//! 3. run the optimistic update inside the lock
//! 4. release the lock on every exit path
//!
//! The lock serialises writers across processes. The version check catches
//! whatever slips past it: a lease that expired mid-write, or a writer that
//! never took the lock.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::lock_guard::LockGuard;
use super::stats::LockStatistics;
use super::traits::LockProvider;
use super::updater::{OptimisticUpdater, UpdateDecision, UpdateOutcome};
use crate::types::{AccountId, BalanceError};

/// Default time a caller waits for a contended lock
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default lease on an acquired lock
pub const DEFAULT_LEASE_TIME: Duration = Duration::from_secs(30);

/// Default namespace for account lock keys
pub const DEFAULT_KEY_PREFIX: &str = "account_balance_lock:";

/// Default operator recorded on writes that carry no initiator
pub const DEFAULT_OPERATOR: &str = "system";

/// How account locks are named and held
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    pub wait_timeout: Duration,
    /// Must exceed the worst-case duration of the critical section
    pub lease_time: Duration,
    pub key_prefix: String,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            lease_time: DEFAULT_LEASE_TIME,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Deduct,
    Credit,
}

impl Direction {
    fn name(self) -> &'static str {
        match self {
            Direction::Deduct => "deduct",
            Direction::Credit => "credit",
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub struct AtomicBalanceMutator {
    locks: Arc<dyn LockProvider>,
    updater: OptimisticUpdater,
    settings: LockSettings,
    operator: String,
    stats: Arc<LockStatistics>,
}

impl AtomicBalanceMutator {
    pub fn new(
        locks: Arc<dyn LockProvider>,
        updater: OptimisticUpdater,
        settings: LockSettings,
        operator: impl Into<String>,
        stats: Arc<LockStatistics>,
    ) -> Self {
        Self {
            locks,
            updater,
            settings,
            operator: operator.into(),
            stats,
        }
    }

    pub fn updater(&self) -> &OptimisticUpdater {
        &self.updater
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<LockStatistics> {
        &self.stats
    }

    /// Operator recorded when the caller names none
    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn lock_key(&self, account_id: AccountId) -> String {
        format!("{}{}", self.settings.key_prefix, account_id)
    }

    /// Enter the critical section for one account
    ///
    /// # Errors
    ///
    /// `LockUnavailable` when the wait timed out or the provider failed.
    pub async fn lock_account(&self, account_id: AccountId) -> Result<LockGuard, BalanceError> {
        let key = self.lock_key(account_id);
        let started = Instant::now();

        match self
            .locks
            .try_acquire(&key, self.settings.wait_timeout, self.settings.lease_time)
            .await
        {
            Ok(Some(handle)) => {
                let waited = started.elapsed();
                self.stats.record_acquired(waited);
                debug!(key = %key, waited_ms = millis(waited), "account lock acquired");
                Ok(LockGuard::new(
                    Arc::clone(&self.locks),
                    Arc::clone(&self.stats),
                    handle,
                ))
            }
            Ok(None) => {
                self.stats.record_timeout();
                warn!(
                    key = %key,
                    wait_ms = millis(self.settings.wait_timeout),
                    "timed out waiting for account lock"
                );
                Err(BalanceError::lock_unavailable(&key, "wait timed out"))
            }
            Err(e) => {
                self.stats.record_timeout();
                warn!(key = %key, error = %e, "lock provider unavailable");
                Err(BalanceError::lock_unavailable(&key, &e.to_string()))
            }
        }
    }

    /// Deduct `amount` from the account, returning the new balance
    pub async fn deduct(&self, account_id: AccountId, amount: Decimal) -> Result<Decimal, BalanceError> {
        self.deduct_as(account_id, amount, &self.operator).await
    }

    /// Credit `amount` to the account, returning the new balance
    pub async fn credit(&self, account_id: AccountId, amount: Decimal) -> Result<Decimal, BalanceError> {
        self.credit_as(account_id, amount, &self.operator).await
    }

    /// [`deduct`](Self::deduct) on behalf of a named operator
    pub async fn deduct_as(
        &self,
        account_id: AccountId,
        amount: Decimal,
        operator: &str,
    ) -> Result<Decimal, BalanceError> {
        self.mutate(account_id, amount, operator, Direction::Deduct).await
    }

    /// [`credit`](Self::credit) on behalf of a named operator
    pub async fn credit_as(
        &self,
        account_id: AccountId,
        amount: Decimal,
        operator: &str,
    ) -> Result<Decimal, BalanceError> {
        self.mutate(account_id, amount, operator, Direction::Credit).await
    }

    async fn mutate(
        &self,
        account_id: AccountId,
        amount: Decimal,
        operator: &str,
        direction: Direction,
    ) -> Result<Decimal, BalanceError> {
        if amount <= Decimal::ZERO {
            return Err(BalanceError::invalid_amount(account_id, amount, direction.name()));
        }

        self.stats.record_operation();
        let guard = self.lock_account(account_id).await?;

        let outcome = self
            .updater
            .update(account_id, operator, |balance| {
                let (new_balance, delta) = match direction {
                    Direction::Deduct if balance < amount => return Ok(UpdateDecision::Skip),
                    Direction::Deduct => (balance.checked_sub(amount), -amount),
                    Direction::Credit => (balance.checked_add(amount), amount),
                };
                let new_balance = new_balance.ok_or_else(|| {
                    BalanceError::arithmetic_overflow(direction.name(), account_id)
                })?;
                Ok(UpdateDecision::Apply { new_balance, delta })
            })
            .await;

        if guard.is_expired() {
            warn!(
                account_id,
                operation = direction.name(),
                "account lock lease expired inside critical section"
            );
        }
        guard.release().await;

        match outcome? {
            UpdateOutcome::Applied { new_balance, .. } => Ok(new_balance),
            UpdateOutcome::Skipped { balance, .. } => {
                Err(BalanceError::insufficient_funds(account_id, balance, amount))
            }
        }
    }
}
