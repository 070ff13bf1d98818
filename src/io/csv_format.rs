//! CSV format handling for balance commands and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvCommand structure for deserialization
//! - Conversion from CSV records to domain commands
//! - Balance output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{AccountBalance, AccountId, BalanceCommand, CommandKind};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, account, amount, initiator.
/// `amount` is optional because validate/repair/open carry none, and
/// `initiator` defaults to the configured operator when empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvCommand {
    #[serde(rename = "type")]
    pub command_type: String,
    pub account: AccountId,
    pub amount: Option<String>,
    #[serde(default)]
    pub initiator: Option<String>,
}

/// Convert a CsvCommand to a BalanceCommand
///
/// This function:
/// - Parses the command type string (case insensitive)
/// - Parses the amount string into a Decimal (if present)
/// - Validates that amounts are present for import/credit/refund/deduct
///
/// Sign checks are left to the mutator, which rejects non-positive amounts
/// before touching the lock.
///
/// # Arguments
///
/// * `record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(BalanceCommand) - Successfully converted command
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(record: CsvCommand) -> Result<BalanceCommand, String> {
    let kind = match record.command_type.to_lowercase().as_str() {
        "open" => CommandKind::Open,
        "import" => CommandKind::Import,
        "credit" => CommandKind::Credit,
        "refund" => CommandKind::Refund,
        "deduct" => CommandKind::Deduct,
        "validate" => CommandKind::Validate,
        "repair" => CommandKind::Repair,
        _ => {
            return Err(format!(
                "Invalid command type: '{}' for account {}",
                record.command_type, record.account
            ))
        }
    };

    let amount = match record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => {
            match Decimal::from_str(amount_str.trim()) {
                Ok(decimal) => Some(decimal),
                Err(_) => {
                    return Err(format!(
                        "Invalid amount '{}' for account {}",
                        amount_str, record.account
                    ))
                }
            }
        }
        _ => None,
    };

    if kind.requires_amount() && amount.is_none() {
        return Err(format!(
            "{:?} command for account {} requires an amount",
            kind, record.account
        ));
    }

    let initiator = record
        .initiator
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(BalanceCommand {
        kind,
        account: record.account,
        amount,
        initiator,
    })
}

/// Write stored balances to CSV format
///
/// Writes rows with columns: account, balance, version.
/// Rows are sorted by account ID for deterministic output.
///
/// # Arguments
///
/// * `balances` - Slice of stored balance rows
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(balances: &[AccountBalance], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "balance", "version"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&AccountBalance> = balances.iter().collect();
    sorted.sort_by_key(|row| row.account_id);

    for row in sorted {
        writer
            .write_record(&[
                row.account_id.to_string(),
                format!("{:.4}", row.balance),
                row.version.to_string(),
            ])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn record(command_type: &str, amount: Option<&str>, initiator: Option<&str>) -> CsvCommand {
        CsvCommand {
            command_type: command_type.to_string(),
            account: 7,
            amount: amount.map(|s| s.to_string()),
            initiator: initiator.map(|s| s.to_string()),
        }
    }

    #[rstest]
    #[case("credit", CommandKind::Credit, Some("100.0"))]
    #[case("deduct", CommandKind::Deduct, Some("50.0"))]
    #[case("refund", CommandKind::Refund, Some("5"))]
    #[case("import", CommandKind::Import, Some("0"))]
    #[case("open", CommandKind::Open, Some("10"))]
    #[case("open", CommandKind::Open, None)]
    #[case("validate", CommandKind::Validate, None)]
    #[case("repair", CommandKind::Repair, None)]
    #[case("DEDUCT", CommandKind::Deduct, Some("1"))] // case insensitive
    fn test_convert_valid_commands(
        #[case] command_type: &str,
        #[case] expected: CommandKind,
        #[case] amount: Option<&str>,
    ) {
        let command = convert_csv_record(record(command_type, amount, None)).unwrap();

        assert_eq!(command.kind, expected);
        assert_eq!(command.account, 7);
        assert_eq!(command.amount.is_some(), amount.is_some());
        assert_eq!(command.initiator, None);
    }

    #[rstest]
    #[case::invalid_type("withdraw", Some("100.0"), "Invalid command type")]
    #[case::credit_missing_amount("credit", None, "requires an amount")]
    #[case::deduct_missing_amount("deduct", None, "requires an amount")]
    #[case::import_missing_amount("import", Some("  "), "requires an amount")]
    #[case::invalid_amount("credit", Some("ten"), "Invalid amount")]
    fn test_convert_errors(
        #[case] command_type: &str,
        #[case] amount: Option<&str>,
        #[case] expected_error: &str,
    ) {
        let result = convert_csv_record(record(command_type, amount, None));
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[rstest]
    #[case(Some("  auditor  "), Some("auditor"))]
    #[case(Some(""), None)]
    #[case(None, None)]
    fn test_convert_initiator(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let command = convert_csv_record(record("repair", None, raw)).unwrap();
        assert_eq!(command.initiator.as_deref(), expected);
    }

    #[test]
    fn test_negative_amount_is_parsed() {
        let command = convert_csv_record(record("deduct", Some("-5"), None)).unwrap();
        assert_eq!(command.amount, Some(dec!(-5)));
    }

    #[rstest]
    #[case::empty(vec![], "account,balance,version\n")]
    #[case::sorted_by_account(
        vec![
            AccountBalance { version: 2, ..AccountBalance::new(3, dec!(1.5), "t") },
            AccountBalance::new(1, dec!(100), "t"),
        ],
        "account,balance,version\n1,100.0000,0\n3,1.5000,2\n"
    )]
    #[case::four_decimal_precision(
        vec![AccountBalance::new(1, dec!(100.1234), "t")],
        "account,balance,version\n1,100.1234,0\n"
    )]
    fn test_write_balances_csv(#[case] balances: Vec<AccountBalance>, #[case] expected: &str) {
        let mut output = Vec::new();
        write_balances_csv(&balances, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }
}
