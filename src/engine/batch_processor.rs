//! Batch processing with account-based partitioning
//!
//! The `BatchProcessor` partitions a batch of commands by account, runs each
//! account's commands sequentially on its own tokio task, and runs different
//! accounts concurrently.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── BalanceEngine  (shared command executor)
//! ```
//!
//! Per-account ordering within a batch comes from the partitioning; ordering
//! across batches comes from the caller awaiting each batch before reading the
//! next. The account lock still guards every write, so correctness does not
//! depend on the partitioning.

use std::collections::HashMap;

use tracing::{error, warn};

use super::balance_engine::{BalanceEngine, CommandOutcome};
use crate::types::{AccountId, BalanceCommand, BalanceError};

/// Result of processing a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub command: BalanceCommand,
    pub result: Result<CommandOutcome, BalanceError>,
}

#[derive(Clone)]
pub struct BatchProcessor {
    engine: BalanceEngine,
}

impl BatchProcessor {
    pub fn new(engine: BalanceEngine) -> Self {
        Self { engine }
    }

    /// Partition a batch of commands by account ID
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one sub-batch
    /// - Commands for each account keep their original order
    pub fn partition_by_account(
        &self,
        batch: Vec<BalanceCommand>,
    ) -> HashMap<AccountId, Vec<BalanceCommand>> {
        let mut account_batches: HashMap<AccountId, Vec<BalanceCommand>> = HashMap::new();

        for command in batch {
            account_batches
                .entry(command.account)
                .or_default()
                .push(command);
        }

        account_batches
    }

    /// Process all commands for a single account in order
    ///
    /// Rejected commands are logged and do not stop the remaining ones.
    pub async fn process_account_commands(
        &self,
        commands: Vec<BalanceCommand>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(commands.len());

        for command in commands {
            let result = self.engine.execute(&command).await;
            if let Err(e) = &result {
                warn!(
                    account_id = command.account,
                    command = ?command.kind,
                    retryable = e.is_retryable(),
                    "command rejected: {}",
                    e
                );
            }
            results.push(ProcessingResult { command, result });
        }

        results
    }

    /// Process a batch with account-based partitioning
    ///
    /// 1. Partition the batch by account ID
    /// 2. Spawn a tokio task per account
    /// 3. Wait for all tasks and collect their results
    ///
    /// Results are grouped per account; the order between accounts is not
    /// specified.
    pub async fn process_batch(&self, batch: Vec<BalanceCommand>) -> Vec<ProcessingResult> {
        let account_batches = self.partition_by_account(batch);

        let mut tasks = Vec::with_capacity(account_batches.len());
        for (_account, commands) in account_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_account_commands(commands).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(account_results) => results.extend(account_results),
                Err(e) => error!("account task panicked: {:?}", e),
            }
        }

        results
    }
}
