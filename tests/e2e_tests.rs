//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays all commands through the engine
//! 3. Compares the balance CSV with expected.csv
//!
//! Fixtures live in tests/fixtures/ and cover:
//! - Happy path movements across several accounts
//! - Insufficient funds and invalid amounts
//! - Commands against missing accounts
//! - Import of legacy balances followed by validation and repair
//! - Malformed rows
//!
//! Each fixture runs with several batch sizes, so an account's commands are
//! split across batches in some runs.

#[cfg(test)]
mod tests {
    use balance_guard::config::BalanceConfig;
    use balance_guard::engine::{BatchConfig, ReplayRunner};
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::{tempdir, NamedTempFile};

    /// Replay tests/fixtures/{fixture_name}/input.csv and compare with expected.csv
    fn run_test_fixture(fixture_name: &str, batch_size: usize) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let runner = ReplayRunner::new(
            BalanceConfig::default(),
            BatchConfig::new(batch_size, 4),
            None,
        );

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");
        runner
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay commands: {}", e));
        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (batch size: {})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, batch_size, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("invalid_amounts")]
    #[case("missing_accounts")]
    #[case("legacy_import_repair")]
    #[case("multiple_accounts")]
    #[case("malformed_data")]
    fn test_fixtures(#[case] fixture: &str, #[values(1, 3, 1000)] batch_size: usize) {
        run_test_fixture(fixture, batch_size);
    }

    #[test]
    fn test_legacy_import_repair_audit_log() {
        let dir = tempdir().unwrap();
        let audit_path = dir.path().join("repairs.csv");
        let runner = ReplayRunner::new(
            BalanceConfig::default(),
            BatchConfig::default(),
            Some(audit_path.clone()),
        );

        let mut output = Vec::new();
        runner
            .process(
                Path::new("tests/fixtures/legacy_import_repair/input.csv"),
                &mut output,
            )
            .unwrap();

        let audit = fs::read_to_string(&audit_path).unwrap();
        let rows: Vec<Vec<&str>> = audit.lines().skip(1).map(|l| l.split(',').collect()).collect();
        assert_eq!(rows.len(), 2, "audit log:\n{}", audit);

        let account_1 = rows.iter().find(|r| r[0] == "1").unwrap();
        assert_eq!(&account_1[1..6], &["175.00", "80.00", "-95.00", "2", "CRITICAL"]);
        assert_eq!(account_1[7], "auditor");

        let account_3 = rows.iter().find(|r| r[0] == "3").unwrap();
        assert_eq!(&account_3[1..6], &["7", "2", "-5", "2", "WARNING"]);
        assert_eq!(account_3[7], "system");
    }
}
