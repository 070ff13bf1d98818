//! In-process implementations of the collaborator traits
//!
//! Backed by `DashMap` for fine-grained per-key locking, so operations on
//! different accounts never contend on a global lock.
//!
//! - `InMemoryLockProvider`: lease-based mutual exclusion with token-checked release
//! - `InMemoryBalanceStore`: versioned rows with compare-and-swap writes
//! - `InMemoryLedger`: append-only recharge/consume/refund entries
//! - `MemoryAuditSink` / `TracingAuditSink`: repair audit destinations

pub mod audit;
pub mod balance_store;
pub mod ledger;
pub mod lock_provider;

pub use audit::{MemoryAuditSink, TracingAuditSink};
pub use balance_store::InMemoryBalanceStore;
pub use ledger::InMemoryLedger;
pub use lock_provider::InMemoryLockProvider;
