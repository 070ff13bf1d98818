//! Optimistic-concurrency balance updater
//!
//! Runs a read / decide / conditional-write cycle against a [`BalanceStore`],
//! retrying with exponential backoff when the version check loses a race.
//!
//! ```text
//! read (balance, version) ──► decide(balance) ──► skip ──► Skipped
//!          ▲                        │
//!          │                        ▼
//!       backoff ◄── 0 rows ── conditional_write(version) ── 1 row ──► Applied
//! ```
//!
//! The updater knows nothing about locks; the mutator and the repairer call
//! it from inside a held lock, where conflicts should only come from writers
//! that bypassed the lock or from an expired lease.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::backoff::BackoffPolicy;
use super::stats::LockStatistics;
use super::traits::BalanceStore;
use crate::types::{AccountId, BalanceError, Version};

/// Default number of read/write attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What the caller wants done with the balance it was shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Leave the row untouched and report success
    Skip,

    /// Write `new_balance`; `delta` is the change relative to the read balance
    Apply { new_balance: Decimal, delta: Decimal },
}

/// Result of a successful update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied {
        previous_balance: Decimal,
        new_balance: Decimal,
        delta: Decimal,
        /// Version of the row after the write
        version: Version,
    },

    /// The decision function chose not to write
    Skipped { balance: Decimal, version: Version },
}

#[derive(Clone)]
pub struct OptimisticUpdater {
    store: Arc<dyn BalanceStore>,
    backoff: BackoffPolicy,
    max_attempts: u32,
    stats: Arc<LockStatistics>,
}

impl OptimisticUpdater {
    /// Create an updater
    ///
    /// A `max_attempts` of zero is treated as one.
    pub fn new(
        store: Arc<dyn BalanceStore>,
        backoff: BackoffPolicy,
        max_attempts: u32,
        stats: Arc<LockStatistics>,
    ) -> Self {
        Self {
            store,
            backoff,
            max_attempts: max_attempts.max(1),
            stats,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Apply `decide` to the current balance until the write sticks
    ///
    /// `decide` is invoked once per attempt with the freshly read balance, so
    /// it must be a pure function of that balance. An `Err` from `decide` is
    /// terminal and nothing is written.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - no row for the account; not retried
    /// * any error returned by `decide`, e.g. `ArithmeticOverflow`
    /// * `ConcurrentModificationExceeded` - every attempt lost its race
    /// * `Backend` - the store failed; not retried
    pub async fn update<F>(
        &self,
        account_id: AccountId,
        operator: &str,
        mut decide: F,
    ) -> Result<UpdateOutcome, BalanceError>
    where
        F: FnMut(Decimal) -> Result<UpdateDecision, BalanceError> + Send,
    {
        for attempt in 0..self.max_attempts {
            let current = self
                .store
                .read(account_id)
                .await?
                .ok_or_else(|| BalanceError::account_not_found(account_id))?;

            let (new_balance, delta) = match decide(current.balance)? {
                UpdateDecision::Skip => {
                    return Ok(UpdateOutcome::Skipped {
                        balance: current.balance,
                        version: current.version,
                    })
                }
                UpdateDecision::Apply { new_balance, delta } => (new_balance, delta),
            };

            let rows = self
                .store
                .conditional_write(account_id, new_balance, current.version, operator)
                .await?;

            if rows > 0 {
                let version = current.version + 1;
                info!(
                    account_id,
                    old_balance = %current.balance,
                    new_balance = %new_balance,
                    version,
                    "balance updated"
                );
                return Ok(UpdateOutcome::Applied {
                    previous_balance: current.balance,
                    new_balance,
                    delta,
                    version,
                });
            }

            warn!(
                account_id,
                attempt = attempt + 1,
                expected_version = current.version,
                "version conflict on balance write"
            );

            if attempt + 1 < self.max_attempts {
                self.stats.record_retry();
                tokio::time::sleep(self.backoff.delay(attempt)).await;
            }
        }

        Err(BalanceError::concurrent_modification_exceeded(
            account_id,
            self.max_attempts,
        ))
    }
}
