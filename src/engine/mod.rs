//! Command replay pipeline
//!
//! - `balance_engine` - Executes one command against the core components
//! - `batch_processor` - Per-account partitioning and concurrent execution
//! - `replay` - File-to-stdout runner and in-memory wiring

pub mod balance_engine;
pub mod batch_processor;
pub mod replay;

pub use balance_engine::{BalanceEngine, CommandOutcome};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use replay::{BatchConfig, InMemoryBackends, ReplayRunner};
