//! balance-guard CLI
//!
//! Replays a CSV file of balance commands through the locked, version-checked
//! mutator and the consistency repairer, then prints the final balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > balances.csv
//! cargo run -- --config guard.toml --audit-log repairs.csv commands.csv > balances.csv
//! cargo run -- --batch-size 2000 --max-concurrent 8 --log-level debug commands.csv
//! ```
//!
//! Input columns are `type,account,amount,initiator`; output columns are
//! `account,balance,version`. Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, unwritable audit log, etc.)

use balance_guard::cli;
use balance_guard::config::BalanceConfig;
use balance_guard::engine::ReplayRunner;
use balance_guard::logging::init_tracing;
use std::process;

fn main() {
    let args = cli::parse_args();

    let config = args.apply_overrides(BalanceConfig::load(args.config.as_deref()));
    init_tracing(&config.logging);
    let config = config.validated();

    let runner = ReplayRunner::new(config, args.to_batch_config(), args.audit_log.clone());

    let mut output = std::io::stdout();
    if let Err(e) = runner.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
