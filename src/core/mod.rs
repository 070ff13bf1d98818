//! Core balance protection logic
//!
//! This module contains the concurrency-control and consistency components:
//! - `traits` - Collaborator interfaces (lock provider, balance store, ledger, audit sink)
//! - `backoff` - Exponential retry delays
//! - `stats` - Lock and retry counters
//! - `lock_guard` - Scoped ownership of an acquired account lock
//! - `updater` - Optimistic read / conditional-write retry loop
//! - `mutator` - Lock-protected deduct and credit
//! - `validator` - Stored balance vs. ledger comparison
//! - `repairer` - Drift repair with audit

pub mod backoff;
pub mod lock_guard;
pub mod mutator;
pub mod repairer;
pub mod stats;
pub mod traits;
pub mod updater;
pub mod validator;

pub use backoff::BackoffPolicy;
pub use lock_guard::LockGuard;
pub use mutator::{AtomicBalanceMutator, LockSettings};
pub use repairer::ConsistencyRepairer;
pub use stats::{LockStatistics, LockStatisticsSnapshot};
pub use traits::{AuditSink, BalanceStore, LedgerReader, LedgerWriter, LockHandle, LockProvider};
pub use updater::{OptimisticUpdater, UpdateDecision, UpdateOutcome};
pub use validator::{ConsistencyPolicy, ConsistencyValidator};
