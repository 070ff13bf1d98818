//! balance-guard
//!
//! # Overview
//!
//! Concurrency-safe account balance mutation plus a consistency validator and
//! repairer that reconcile stored balances against an append-only ledger.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (balance rows, ledger entries, reports, errors)
//! - [`core`] - Concurrency control and consistency logic:
//!   - [`core::updater`] - Optimistic read / conditional write with bounded retries
//!   - [`core::mutator`] - Deduct and credit under a per-account distributed lock
//!   - [`core::validator`] - Drift classification against the ledger
//!   - [`core::repairer`] - Locked, audited repair of drifted balances
//! - [`memory`] - In-process lock provider, balance store, ledger and audit sinks
//! - [`io`] - CSV command reading, balance output and the audit log
//! - [`engine`] - Command replay with per-account partitioning
//! - [`config`] / [`logging`] / [`cli`] - Runtime configuration, tracing and arguments
//!
//! # Write discipline
//!
//! Every balance write goes through the same path:
//!
//! 1. Acquire `"{prefix}{accountId}"` with a bounded wait and a lease
//! 2. Read `(balance, version)`
//! 3. Write the new balance only if the version is unchanged, bumping it by one
//! 4. On a lost race, back off `min(base * 2^n, max)` and retry, up to the attempt cap
//! 5. Release the lock on every exit path
//!
//! # Drift classification
//!
//! - **OK**: `|stored - ledger| <= epsilon`
//! - **WARNING**: above epsilon, up to the warning threshold
//! - **CRITICAL**: beyond the threshold, a missing account, or a negative version

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod io;
pub mod logging;
pub mod memory;
pub mod types;

pub use core::{
    AtomicBalanceMutator, AuditSink, BalanceStore, ConsistencyRepairer, ConsistencyValidator,
    LedgerReader, LedgerWriter, LockProvider, OptimisticUpdater,
};
pub use io::write_balances_csv;
pub use types::{
    AccountBalance, AccountId, BalanceError, Classification, ConsistencyReport, RepairError,
    RepairEvent, RepairOutcome, Version,
};
