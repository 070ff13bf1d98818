//! Audit sinks that keep repair events in process

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::core::traits::AuditSink;
use crate::types::{BalanceError, RepairEvent};

/// Collects events in memory; used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<RepairEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RepairEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: &RepairEvent) -> Result<(), BalanceError> {
        self.events
            .lock()
            .map_err(|_| BalanceError::backend("audit buffer poisoned"))?
            .push(event.clone());
        Ok(())
    }
}

/// Emits each event as a structured log line on the `audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &RepairEvent) -> Result<(), BalanceError> {
        info!(
            target: "audit",
            account_id = event.account_id,
            old_balance = %event.old_balance,
            new_balance = %event.new_balance,
            drift = %event.drift,
            version = event.version,
            classification = %event.classification,
            timestamp = %event.timestamp,
            initiator = %event.initiator,
            "balance repair"
        );
        Ok(())
    }
}
