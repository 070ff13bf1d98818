//! I/O module
//!
//! Handles CSV parsing, balance output and the repair audit log.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (command conversion, balance serialization)
//! - `async_reader` - Asynchronous command reader with batch reading interface
//! - `audit_log` - CSV-backed repair audit sink

pub mod async_reader;
pub mod audit_log;
pub mod csv_format;

pub use async_reader::CommandReader;
pub use audit_log::CsvAuditSink;
pub use csv_format::{convert_csv_record, write_balances_csv, CsvCommand};
