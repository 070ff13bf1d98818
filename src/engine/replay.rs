//! Replay of a balance command file against in-memory backends
//!
//! # Architecture
//!
//! ```text
//! ReplayRunner
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── BalanceConfig (retry, lock, consistency)
//!     ├── CommandReader (batch CSV reading)
//!     ├── BatchProcessor (account partitioning + tokio tasks)
//!     └── BalanceEngine
//!         ├── InMemoryBalanceStore / InMemoryLedger / InMemoryLockProvider
//!         └── AuditSink (CSV audit log or tracing)
//! ```
//!
//! Batches run one after another so an account's commands keep file order
//! even when they span batches. Within a batch, accounts run in parallel on
//! a multi-threaded runtime.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::balance_engine::BalanceEngine;
use super::batch_processor::BatchProcessor;
use crate::config::BalanceConfig;
use crate::core::{
    AtomicBalanceMutator, AuditSink, ConsistencyRepairer, ConsistencyValidator, LockStatistics,
    OptimisticUpdater,
};
use crate::io::{write_balances_csv, CommandReader, CsvAuditSink};
use crate::memory::{InMemoryBalanceStore, InMemoryLedger, InMemoryLockProvider, TracingAuditSink};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Worker threads for the runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Shared in-memory state behind one replay
#[derive(Clone, Default)]
pub struct InMemoryBackends {
    pub store: Arc<InMemoryBalanceStore>,
    pub ledger: Arc<InMemoryLedger>,
    pub locks: Arc<InMemoryLockProvider>,
}

impl InMemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire an engine over these backends
    ///
    /// Mutator, updater and repairer share one statistics instance, reachable
    /// through `engine.mutator().stats()`.
    pub fn engine(&self, config: &BalanceConfig, audit: Arc<dyn AuditSink>) -> BalanceEngine {
        let stats = Arc::new(LockStatistics::new());

        let updater = OptimisticUpdater::new(
            self.store.clone(),
            config.backoff(),
            config.retry.max_attempts,
            stats.clone(),
        );
        let mutator = Arc::new(AtomicBalanceMutator::new(
            self.locks.clone(),
            updater,
            config.lock_settings(),
            config.lock.operator.clone(),
            stats,
        ));
        let validator = Arc::new(ConsistencyValidator::new(
            self.store.clone(),
            self.ledger.clone(),
            config.consistency_policy(),
        ));
        let repairer = Arc::new(ConsistencyRepairer::new(
            validator.clone(),
            mutator.clone(),
            audit,
        ));

        BalanceEngine::new(
            self.store.clone(),
            self.ledger.clone(),
            mutator,
            validator,
            repairer,
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReplayRunner {
    config: BalanceConfig,
    batch: BatchConfig,
    audit_log: Option<PathBuf>,
}

impl ReplayRunner {
    pub fn new(config: BalanceConfig, batch: BatchConfig, audit_log: Option<PathBuf>) -> Self {
        Self {
            config,
            batch,
            audit_log,
        }
    }

    /// Replay `input_path` and write final balances to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the file was replayed; rejected commands are logged
    ///   and skipped
    /// * `Err(String)` on a fatal error (unreadable input, unwritable audit
    ///   log or output, runtime failure)
    pub fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.batch.max_concurrent_batches)
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let audit: Arc<dyn AuditSink> = match &self.audit_log {
                Some(path) => Arc::new(CsvAuditSink::open(path).map_err(|e| {
                    format!("Failed to open audit log '{}': {}", path.display(), e)
                })?),
                None => Arc::new(TracingAuditSink),
            };

            let backends = InMemoryBackends::new();
            let engine = backends.engine(&self.config, audit);
            let stats = engine.mutator().stats().clone();
            let processor = BatchProcessor::new(engine);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = CommandReader::new(compat_file);

            let mut executed = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.batch.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for result in processor.process_batch(batch).await {
                    if result.result.is_ok() {
                        executed += 1;
                    } else {
                        rejected += 1;
                    }
                }
            }

            write_balances_csv(&backends.store.all(), output)?;

            let snapshot = stats.snapshot();
            info!(
                executed,
                rejected,
                accounts = backends.store.len(),
                active_locks = snapshot.active_locks,
                total_operations = snapshot.total_operations,
                average_wait_us = snapshot.average_wait_time.as_micros() as u64,
                lock_timeouts = snapshot.lock_timeout_count,
                optimistic_retries = snapshot.optimistic_retries,
                "replay finished"
            );

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn runner(batch: BatchConfig, audit_log: Option<PathBuf>) -> ReplayRunner {
        ReplayRunner::new(BalanceConfig::default(), batch, audit_log)
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        let config = BatchConfig::new(0, 0);
        assert_eq!(config, BatchConfig::default());
    }

    #[test]
    fn test_replay_writes_sorted_balances() {
        let file = create_temp_csv(
            "type,account,amount,initiator\n\
             open,2,50,\n\
             open,1,100,\n\
             deduct,1,30,\n\
             credit,2,5,\n",
        );
        let mut output = Vec::new();

        runner(BatchConfig::default(), None)
            .process(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance,version\n1,70.0000,1\n2,55.0000,1\n"
        );
    }

    #[test]
    fn test_replay_keeps_order_across_batches() {
        let file = create_temp_csv(
            "type,account,amount,initiator\n\
             open,1,100,\n\
             open,2,50,\n\
             deduct,1,30,\n\
             credit,2,25,\n\
             deduct,1,20,\n\
             deduct,1,60,\n",
        );
        let mut output = Vec::new();

        runner(BatchConfig::new(2, 2), None)
            .process(file.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("1,50.0000,2\n"), "got: {}", output);
        assert!(output.contains("2,75.0000,1\n"), "got: {}", output);
    }

    #[test]
    fn test_replay_writes_audit_log() {
        let file = create_temp_csv(
            "type,account,amount,initiator\nimport,1,20,\nrepair,1,,auditor\n",
        );
        let dir = tempdir().unwrap();
        let audit_path = dir.path().join("audit.csv");
        let mut output = Vec::new();

        runner(BatchConfig::default(), Some(audit_path.clone()))
            .process(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance,version\n1,0.0000,1\n"
        );
        let audit = std::fs::read_to_string(audit_path).unwrap();
        assert_eq!(audit.lines().count(), 2);
        assert!(audit.contains(",-20,"));
        assert!(audit.contains("CRITICAL"));
    }

    #[test]
    fn test_replay_missing_file() {
        let mut output = Vec::new();

        let result = runner(BatchConfig::default(), None)
            .process(Path::new("nonexistent.csv"), &mut output);

        assert!(result.unwrap_err().contains("Failed to open file"));
    }
}
