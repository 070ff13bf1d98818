//! Runtime configuration
//!
//! Loaded from an optional TOML file; CLI flags override file values, and
//! anything missing falls back to the defaults below.
//!
//! ```toml
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 10
//! max_delay_ms = 1000
//!
//! [lock]
//! wait_timeout_ms = 2000
//! lease_time_ms = 30000
//! key_prefix = "account_balance_lock:"
//! operator = "system"
//!
//! [consistency]
//! epsilon = "0.01"
//! warning_threshold = "10.00"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::core::backoff::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};
use crate::core::mutator::{
    LockSettings, DEFAULT_KEY_PREFIX, DEFAULT_LEASE_TIME, DEFAULT_OPERATOR, DEFAULT_WAIT_TIMEOUT,
};
use crate::core::updater::DEFAULT_MAX_ATTEMPTS;
use crate::core::validator::{ConsistencyPolicy, DEFAULT_EPSILON, DEFAULT_WARNING_THRESHOLD};
use crate::types::BalanceError;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct BalanceConfig {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub consistency: ConsistencyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LockConfig {
    pub wait_timeout_ms: u64,
    pub lease_time_ms: u64,
    pub key_prefix: String,
    /// Operator recorded on writes that carry no initiator
    pub operator: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub epsilon: Decimal,
    pub warning_threshold: Decimal,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
            lease_time_ms: DEFAULT_LEASE_TIME.as_millis() as u64,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            operator: DEFAULT_OPERATOR.to_string(),
        }
    }
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        ConsistencyConfig {
            epsilon: DEFAULT_EPSILON,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl BalanceConfig {
    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, BalanceError> {
        toml::from_str(contents).map_err(|e| BalanceError::config(e.to_string()))
    }

    /// Load a config file, falling back to defaults if it is missing or invalid
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return BalanceConfig::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                eprintln!(
                    "Warning: failed to parse config file '{}': {}, using defaults",
                    path.display(),
                    e
                );
                BalanceConfig::default()
            }),
            Err(e) => {
                eprintln!(
                    "Warning: cannot read config file '{}': {}, using defaults",
                    path.display(),
                    e
                );
                BalanceConfig::default()
            }
        }
    }

    /// Replace unusable values with defaults
    ///
    /// Zero attempts, zero delays and a zero wait are reset to their
    /// defaults. The lease must outlast the worst-case time spent in the
    /// critical section (all retry sleeps); a shorter lease is stretched.
    pub fn validated(mut self) -> Self {
        let defaults = BalanceConfig::default();

        if self.retry.max_attempts == 0 {
            warn!(
                "invalid retry.max_attempts (0), using default ({})",
                defaults.retry.max_attempts
            );
            self.retry.max_attempts = defaults.retry.max_attempts;
        }
        if self.retry.base_delay_ms == 0 {
            warn!(
                "invalid retry.base_delay_ms (0), using default ({})",
                defaults.retry.base_delay_ms
            );
            self.retry.base_delay_ms = defaults.retry.base_delay_ms;
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            warn!(
                max_delay_ms = self.retry.max_delay_ms,
                base_delay_ms = self.retry.base_delay_ms,
                "retry.max_delay_ms below base delay, raising it to the base delay"
            );
            self.retry.max_delay_ms = self.retry.base_delay_ms;
        }
        if self.lock.wait_timeout_ms == 0 {
            warn!(
                "invalid lock.wait_timeout_ms (0), using default ({})",
                defaults.lock.wait_timeout_ms
            );
            self.lock.wait_timeout_ms = defaults.lock.wait_timeout_ms;
        }

        let worst_case = self.backoff().worst_case_total(self.retry.max_attempts);
        let worst_case_ms = worst_case.as_millis() as u64;
        if self.lock.lease_time_ms <= worst_case_ms {
            let stretched = worst_case_ms
                .saturating_mul(2)
                .max(defaults.lock.lease_time_ms);
            warn!(
                lease_time_ms = self.lock.lease_time_ms,
                worst_case_ms,
                stretched,
                "lock lease shorter than worst-case critical section, stretching it"
            );
            self.lock.lease_time_ms = stretched;
        }

        self
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            wait_timeout: Duration::from_millis(self.lock.wait_timeout_ms),
            lease_time: Duration::from_millis(self.lock.lease_time_ms),
            key_prefix: self.lock.key_prefix.clone(),
        }
    }

    pub fn consistency_policy(&self) -> ConsistencyPolicy {
        ConsistencyPolicy::new(self.consistency.epsilon, self.consistency.warning_threshold)
    }
}
