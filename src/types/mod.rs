//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Stored balance rows and identifiers
//! - `ledger`: Append-only ledger entries
//! - `report`: Consistency reports and repair audit events
//! - `command`: Replay CLI commands
//! - `error`: Error types

pub mod account;
pub mod command;
pub mod error;
pub mod ledger;
pub mod report;

pub use account::{AccountBalance, AccountId, BalanceSnapshot, Version};
pub use command::{BalanceCommand, CommandKind};
pub use error::{BalanceError, RepairError};
pub use ledger::{EntryKind, LedgerEntry};
pub use report::{Classification, ConsistencyReport, RepairEvent, RepairOutcome};
