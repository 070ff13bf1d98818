//! Append-only CSV audit log for repair events
//!
//! One row per applied repair, with columns:
//! `account,old_balance,new_balance,drift,version,classification,timestamp,initiator`.
//! Each row is flushed before `record` returns.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use csv::{Writer, WriterBuilder};

use crate::core::traits::AuditSink;
use crate::types::{BalanceError, RepairEvent};

const HEADER: [&str; 8] = [
    "account",
    "old_balance",
    "new_balance",
    "drift",
    "version",
    "classification",
    "timestamp",
    "initiator",
];

#[derive(Debug)]
pub struct CsvAuditSink {
    writer: Mutex<Writer<File>>,
}

impl CsvAuditSink {
    /// Open `path` for appending, writing the header if the file is new or empty
    pub fn open(path: &Path) -> Result<Self, BalanceError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

#[async_trait]
impl AuditSink for CsvAuditSink {
    async fn record(&self, event: &RepairEvent) -> Result<(), BalanceError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| BalanceError::backend("audit log writer poisoned"))?;

        writer.write_record(&[
            event.account_id.to_string(),
            event.old_balance.to_string(),
            event.new_balance.to_string(),
            event.drift.to_string(),
            event.version.to_string(),
            event.classification.to_string(),
            event.timestamp.to_rfc3339(),
            event.initiator.clone(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn event(account_id: u64) -> RepairEvent {
        RepairEvent {
            account_id,
            old_balance: dec!(100.00),
            new_balance: dec!(85.00),
            drift: dec!(-15.00),
            version: 4,
            classification: Classification::Critical,
            timestamp: Utc::now(),
            initiator: "auditor".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_rows_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.csv");

        let sink = CsvAuditSink::open(&path).unwrap();
        sink.record(&event(1)).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].starts_with("1,100.00,85.00,-15.00,4,CRITICAL,"));
        assert!(lines[1].ends_with(",auditor"));
    }

    #[tokio::test]
    async fn test_reopen_appends_without_second_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.csv");

        CsvAuditSink::open(&path).unwrap().record(&event(1)).await.unwrap();
        CsvAuditSink::open(&path).unwrap().record(&event(2)).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(contents.matches("account,old_balance").count(), 1);
    }
}
