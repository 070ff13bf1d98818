//! Lock and retry counters
//!
//! Shared by the mutator, updater and repairer. All counters are relaxed
//! atomics; a snapshot is a best-effort view, not a consistent cut.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default)]
pub struct LockStatistics {
    active_locks: AtomicU64,
    total_operations: AtomicU64,
    total_wait_micros: AtomicU64,
    acquisitions: AtomicU64,
    lock_timeout_count: AtomicU64,
    optimistic_retries: AtomicU64,
}

/// Point-in-time copy of [`LockStatistics`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LockStatisticsSnapshot {
    pub active_locks: u64,
    pub total_operations: u64,
    /// Mean time spent waiting for successful acquisitions
    pub average_wait_time: Duration,
    pub lock_timeout_count: u64,
    pub optimistic_retries: u64,
}

impl LockStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one locked operation (deduct, credit or repair) being attempted
    pub fn record_operation(&self) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_acquired(&self, waited: Duration) {
        let micros = u64::try_from(waited.as_micros()).unwrap_or(u64::MAX);
        self.total_wait_micros.fetch_add(micros, Ordering::Relaxed);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        self.active_locks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_released(&self) {
        // Saturate rather than wrap if a release is ever double counted
        let _ = self
            .active_locks
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn record_timeout(&self) {
        self.lock_timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.optimistic_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LockStatisticsSnapshot {
        let acquisitions = self.acquisitions.load(Ordering::Relaxed);
        let total_wait = self.total_wait_micros.load(Ordering::Relaxed);
        let average_wait_time = if acquisitions == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(total_wait / acquisitions)
        };

        LockStatisticsSnapshot {
            active_locks: self.active_locks.load(Ordering::Relaxed),
            total_operations: self.total_operations.load(Ordering::Relaxed),
            average_wait_time,
            lock_timeout_count: self.lock_timeout_count.load(Ordering::Relaxed),
            optimistic_retries: self.optimistic_retries.load(Ordering::Relaxed),
        }
    }
}
