//! Consistency repair
//!
//! Overwrites a drifted stored balance with the ledger-derived value, under
//! the same lock-plus-version discipline as ordinary mutations, and records
//! every applied repair with the audit sink.
//!
//! Repair is idempotent: an account within tolerance is never written, so
//! calling `repair` twice with no ledger activity in between writes at most
//! once.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use super::mutator::AtomicBalanceMutator;
use super::traits::AuditSink;
use super::updater::{UpdateDecision, UpdateOutcome};
use super::validator::ConsistencyValidator;
use crate::types::{AccountId, RepairError, RepairEvent, RepairOutcome};

pub struct ConsistencyRepairer {
    validator: Arc<ConsistencyValidator>,
    mutator: Arc<AtomicBalanceMutator>,
    audit: Arc<dyn AuditSink>,
}

impl ConsistencyRepairer {
    pub fn new(
        validator: Arc<ConsistencyValidator>,
        mutator: Arc<AtomicBalanceMutator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            validator,
            mutator,
            audit,
        }
    }

    /// Bring the stored balance back in line with the ledger
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account to repair
    /// * `initiator` - Operator recorded on the write and in the audit event
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - nothing to repair against
    /// * `LockUnavailable` / `ConcurrentModificationExceeded` - nothing written
    ///
    /// A failing audit sink is logged but never undoes an applied repair.
    /// `NoopNotNeeded` always carries a report taken after the decision, so
    /// a balance that settled while the lock was contended reports `OK`.
    pub async fn repair(
        &self,
        account_id: AccountId,
        initiator: &str,
    ) -> Result<RepairOutcome, RepairError> {
        let report = self.validator.validate(account_id).await?;
        if report.is_account_missing() {
            return Err(RepairError::account_not_found(account_id));
        }
        if !report.needs_repair() {
            return Ok(RepairOutcome::NoopNotNeeded(report));
        }

        self.mutator.stats().record_operation();
        let guard = self.mutator.lock_account(account_id).await?;

        // The ledger may have moved since the unlocked validation
        let outcome = match self.validator.expected_balance(account_id).await {
            Ok(expected) => {
                let policy = *self.validator.policy();
                self.mutator
                    .updater()
                    .update(account_id, initiator, |stored| {
                        if policy.within_tolerance(stored, expected) {
                            return Ok(UpdateDecision::Skip);
                        }
                        let delta = expected
                            .checked_sub(stored)
                            .ok_or_else(|| RepairError::arithmetic_overflow("repair", account_id))?;
                        Ok(UpdateDecision::Apply {
                            new_balance: expected,
                            delta,
                        })
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        guard.release().await;

        match outcome? {
            // Settled while we waited for the lock; report the current state
            UpdateOutcome::Skipped { .. } => {
                let current = self.validator.validate(account_id).await?;
                Ok(RepairOutcome::NoopNotNeeded(current))
            }
            UpdateOutcome::Applied {
                previous_balance,
                new_balance,
                delta,
                version,
            } => {
                let event = RepairEvent {
                    account_id,
                    old_balance: previous_balance,
                    new_balance,
                    drift: delta,
                    version,
                    classification: report.classification,
                    timestamp: Utc::now(),
                    initiator: initiator.to_string(),
                };

                info!(
                    account_id,
                    old_balance = %event.old_balance,
                    new_balance = %event.new_balance,
                    drift = %event.drift,
                    version,
                    initiator,
                    "balance repaired from ledger"
                );

                if let Err(e) = self.audit.record(&event).await {
                    error!(
                        account_id,
                        old_balance = %event.old_balance,
                        new_balance = %event.new_balance,
                        drift = %event.drift,
                        version,
                        initiator,
                        timestamp = %event.timestamp,
                        error = %e,
                        "failed to record repair audit event"
                    );
                }

                Ok(RepairOutcome::Repaired(event))
            }
        }
    }
}
