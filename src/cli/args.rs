use crate::config::BalanceConfig;
use crate::engine::BatchConfig;
use clap::Parser;
use std::path::PathBuf;

/// Replay balance commands under per-account locking and version checks
#[derive(Parser, Debug)]
#[command(name = "balance-guard")]
#[command(
    about = "Replay balance commands with locked, version-checked writes and ledger reconciliation",
    long_about = None
)]
pub struct CliArgs {
    /// Input CSV file path containing balance commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append repair audit events to this CSV file instead of the log
    #[arg(long = "audit-log", value_name = "FILE")]
    pub audit_log: Option<PathBuf>,

    /// Number of commands per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for concurrent account processing
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for concurrent account processing (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Log level filter, overrides the config file
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Apply CLI overrides on top of a loaded config
    pub fn apply_overrides(&self, mut config: BalanceConfig) -> BalanceConfig {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        config
    }
}
