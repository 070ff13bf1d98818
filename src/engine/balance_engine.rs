//! Command dispatch for the replay pipeline
//!
//! `BalanceEngine` turns one [`BalanceCommand`] into calls on the mutator,
//! validator and repairer, and keeps the ledger in step with every balance
//! movement it applies.
//!
//! # Architecture
//!
//! ```text
//! BalanceEngine
//!     ├── Arc<dyn BalanceStore>          (account creation)
//!     ├── Arc<dyn LedgerWriter>          (recharge / consume / refund entries)
//!     ├── Arc<AtomicBalanceMutator>      (locked deduct / credit)
//!     ├── Arc<ConsistencyValidator>      (validate)
//!     └── Arc<ConsistencyRepairer>       (repair)
//! ```
//!
//! The balance write and the ledger append are two separate steps. If the
//! append fails after the write, the account drifts by that amount until a
//! repair is run; the failure is logged at error level.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info};

use crate::core::{
    AtomicBalanceMutator, BalanceStore, ConsistencyRepairer, ConsistencyValidator, LedgerWriter,
};
use crate::types::{
    AccountId, BalanceCommand, BalanceError, CommandKind, ConsistencyReport, EntryKind,
    LedgerEntry, RepairOutcome,
};

/// What a successfully executed command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Account created with the given opening balance
    Opened { balance: Decimal },

    /// Balance moved; carries the balance after the write
    Applied { balance: Decimal },

    /// Result of a consistency check
    Validated(ConsistencyReport),

    /// Result of a repair attempt
    Repair(RepairOutcome),
}

#[derive(Clone)]
pub struct BalanceEngine {
    store: Arc<dyn BalanceStore>,
    ledger: Arc<dyn LedgerWriter>,
    mutator: Arc<AtomicBalanceMutator>,
    validator: Arc<ConsistencyValidator>,
    repairer: Arc<ConsistencyRepairer>,
}

impl BalanceEngine {
    pub fn new(
        store: Arc<dyn BalanceStore>,
        ledger: Arc<dyn LedgerWriter>,
        mutator: Arc<AtomicBalanceMutator>,
        validator: Arc<ConsistencyValidator>,
        repairer: Arc<ConsistencyRepairer>,
    ) -> Self {
        Self {
            store,
            ledger,
            mutator,
            validator,
            repairer,
        }
    }

    pub fn mutator(&self) -> &Arc<AtomicBalanceMutator> {
        &self.mutator
    }

    /// Execute one command
    ///
    /// # Arguments
    ///
    /// * `command` - The parsed command; its initiator falls back to the
    ///   mutator's default operator
    ///
    /// # Returns
    ///
    /// * `Ok(CommandOutcome)` - what the command did
    /// * `Err(BalanceError)` - the command was rejected; for balance
    ///   movements nothing was written
    pub async fn execute(&self, command: &BalanceCommand) -> Result<CommandOutcome, BalanceError> {
        let operator = command
            .initiator
            .as_deref()
            .unwrap_or_else(|| self.mutator.operator());
        let account = command.account;

        match command.kind {
            CommandKind::Open => {
                let opening = command.amount.unwrap_or(Decimal::ZERO);
                self.open(account, opening, operator, true).await
            }
            CommandKind::Import => {
                let balance = required_amount(command)?;
                self.open(account, balance, operator, false).await
            }
            CommandKind::Credit => {
                let amount = required_amount(command)?;
                let balance = self.mutator.credit_as(account, amount, operator).await?;
                self.record(LedgerEntry::new(account, EntryKind::Recharge, amount)).await;
                Ok(CommandOutcome::Applied { balance })
            }
            CommandKind::Refund => {
                let amount = required_amount(command)?;
                let balance = self.mutator.credit_as(account, amount, operator).await?;
                self.record(LedgerEntry::new(account, EntryKind::Refund, amount)).await;
                Ok(CommandOutcome::Applied { balance })
            }
            CommandKind::Deduct => {
                let amount = required_amount(command)?;
                let balance = self.mutator.deduct_as(account, amount, operator).await?;
                self.record(LedgerEntry::new(account, EntryKind::Consume, amount)).await;
                Ok(CommandOutcome::Applied { balance })
            }
            CommandKind::Validate => {
                let report = self.validator.validate(account).await?;
                info!(
                    account_id = account,
                    classification = %report.classification,
                    drift = %report.drift,
                    "{}",
                    report.message
                );
                Ok(CommandOutcome::Validated(report))
            }
            CommandKind::Repair => {
                let outcome = self.repairer.repair(account, operator).await?;
                Ok(CommandOutcome::Repair(outcome))
            }
        }
    }

    /// Create the row, then record a positive opening amount as a recharge
    async fn open(
        &self,
        account: AccountId,
        balance: Decimal,
        operator: &str,
        with_ledger: bool,
    ) -> Result<CommandOutcome, BalanceError> {
        if balance < Decimal::ZERO {
            return Err(BalanceError::invalid_amount(account, balance, "open"));
        }

        self.store.create(account, balance, operator).await?;
        if with_ledger && balance > Decimal::ZERO {
            self.record(LedgerEntry::new(account, EntryKind::Recharge, balance)).await;
        }

        info!(account_id = account, balance = %balance, operator, "account opened");
        Ok(CommandOutcome::Opened { balance })
    }

    async fn record(&self, entry: LedgerEntry) {
        let account_id = entry.account_id;
        let kind = entry.kind;
        let amount = entry.amount;

        if let Err(e) = self.ledger.append(entry).await {
            error!(
                account_id,
                kind = ?kind,
                amount = %amount,
                error = %e,
                "ledger append failed after balance write; account will drift until repaired"
            );
        }
    }
}

fn required_amount(command: &BalanceCommand) -> Result<Decimal, BalanceError> {
    command.amount.ok_or_else(|| {
        BalanceError::invalid_amount(command.account, Decimal::ZERO, &format!("{:?}", command.kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        BackoffPolicy, ConsistencyPolicy, LockSettings, LockStatistics, OptimisticUpdater,
    };
    use crate::memory::{InMemoryBalanceStore, InMemoryLedger, InMemoryLockProvider, MemoryAuditSink};
    use crate::types::Classification;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    struct Harness {
        engine: BalanceEngine,
        store: Arc<InMemoryBalanceStore>,
        ledger: Arc<InMemoryLedger>,
        audit: Arc<MemoryAuditSink>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryBalanceStore::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let stats = Arc::new(LockStatistics::new());

        let updater = OptimisticUpdater::new(store.clone(), BackoffPolicy::default(), 3, stats.clone());
        let mutator = Arc::new(AtomicBalanceMutator::new(
            Arc::new(InMemoryLockProvider::new()),
            updater,
            LockSettings::default(),
            "system",
            stats,
        ));
        let validator = Arc::new(ConsistencyValidator::new(
            store.clone(),
            ledger.clone(),
            ConsistencyPolicy::default(),
        ));
        let repairer = Arc::new(ConsistencyRepairer::new(
            validator.clone(),
            mutator.clone(),
            audit.clone(),
        ));
        let engine = BalanceEngine::new(store.clone(), ledger.clone(), mutator, validator, repairer);

        Harness {
            engine,
            store,
            ledger,
            audit,
        }
    }

    fn command(kind: CommandKind, account: AccountId, amount: Option<Decimal>) -> BalanceCommand {
        BalanceCommand {
            kind,
            account,
            amount,
            initiator: None,
        }
    }

    #[tokio::test]
    async fn test_open_records_recharge() {
        let h = harness();

        let outcome = h.engine.execute(&command(CommandKind::Open, 1, Some(dec!(100)))).await;

        assert_eq!(outcome, Ok(CommandOutcome::Opened { balance: dec!(100) }));
        assert_eq!(h.store.get(1).unwrap().version, 0);
        assert_eq!(h.ledger.entries(1).len(), 1);
        assert_eq!(h.ledger.entries(1)[0].kind, EntryKind::Recharge);
    }

    #[tokio::test]
    async fn test_open_without_amount_has_no_ledger_entry() {
        let h = harness();

        h.engine.execute(&command(CommandKind::Open, 1, None)).await.unwrap();

        assert_eq!(h.store.get(1).unwrap().balance, Decimal::ZERO);
        assert!(h.ledger.entries(1).is_empty());
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let h = harness();
        h.engine.execute(&command(CommandKind::Open, 1, Some(dec!(5)))).await.unwrap();

        let result = h.engine.execute(&command(CommandKind::Open, 1, Some(dec!(5)))).await;

        assert_eq!(result, Err(BalanceError::account_exists(1)));
        assert_eq!(h.ledger.entries(1).len(), 1);
    }

    #[rstest]
    #[case::credit(CommandKind::Credit, EntryKind::Recharge, dec!(60))]
    #[case::refund(CommandKind::Refund, EntryKind::Refund, dec!(60))]
    #[case::deduct(CommandKind::Deduct, EntryKind::Consume, dec!(40))]
    #[tokio::test]
    async fn test_movements_keep_ledger_in_step(
        #[case] kind: CommandKind,
        #[case] entry: EntryKind,
        #[case] expected_balance: Decimal,
    ) {
        let h = harness();
        h.engine.execute(&command(CommandKind::Open, 1, Some(dec!(50)))).await.unwrap();

        let outcome = h.engine.execute(&command(kind, 1, Some(dec!(10)))).await;

        assert_eq!(outcome, Ok(CommandOutcome::Applied { balance: expected_balance }));
        assert_eq!(h.ledger.entries(1)[1].kind, entry);

        let report = h.engine.execute(&command(CommandKind::Validate, 1, None)).await.unwrap();
        match report {
            CommandOutcome::Validated(report) => {
                assert_eq!(report.classification, Classification::Ok)
            }
            other => panic!("expected a report, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_deduct_writes_no_ledger_entry() {
        let h = harness();
        h.engine.execute(&command(CommandKind::Open, 1, Some(dec!(50)))).await.unwrap();

        let result = h.engine.execute(&command(CommandKind::Deduct, 1, Some(dec!(80)))).await;

        assert_eq!(result, Err(BalanceError::insufficient_funds(1, dec!(50), dec!(80))));
        assert_eq!(h.ledger.entries(1).len(), 1);
    }

    #[tokio::test]
    async fn test_import_then_repair() {
        let h = harness();
        h.engine.execute(&command(CommandKind::Import, 1, Some(dec!(12)))).await.unwrap();
        assert!(h.ledger.entries(1).is_empty());

        let repair = BalanceCommand {
            initiator: Some("auditor".to_string()),
            ..command(CommandKind::Repair, 1, None)
        };
        let outcome = h.engine.execute(&repair).await.unwrap();

        match outcome {
            CommandOutcome::Repair(RepairOutcome::Repaired(event)) => {
                assert_eq!(event.old_balance, dec!(12));
                assert_eq!(event.new_balance, Decimal::ZERO);
                assert_eq!(event.drift, dec!(-12));
                assert_eq!(event.classification, Classification::Critical);
                assert_eq!(event.initiator, "auditor");
            }
            other => panic!("expected a repair, got {:?}", other),
        }
        assert_eq!(h.store.get(1).unwrap().update_user, "auditor");
        assert_eq!(h.audit.events().len(), 1);
    }

    #[tokio::test]
    async fn test_movement_on_missing_account() {
        let h = harness();

        let result = h.engine.execute(&command(CommandKind::Credit, 9, Some(dec!(1)))).await;

        assert_eq!(result, Err(BalanceError::account_not_found(9)));
        assert!(h.ledger.entries(9).is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_credit_is_rejected() {
        let h = harness();
        h.engine.execute(&command(CommandKind::Import, 1, Some(Decimal::MAX))).await.unwrap();

        let result = h.engine.execute(&command(CommandKind::Credit, 1, Some(dec!(1)))).await;

        assert_eq!(result, Err(BalanceError::arithmetic_overflow("credit", 1)));
        assert_eq!(h.store.get(1).unwrap().balance, Decimal::MAX);
        assert!(h.ledger.entries(1).is_empty());
    }
}
