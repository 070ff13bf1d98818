//! Scoped ownership of an acquired account lock
//!
//! A `LockGuard` is the explicit critical section: the balance may only be
//! written while one is alive. Call [`LockGuard::release`] on the normal
//! path. If the guard is dropped instead (early return, panic, or the
//! enclosing future being cancelled), `Drop` hands the release to the
//! runtime so the lock is still freed before its lease runs out.

use std::sync::Arc;

use tracing::{debug, warn};

use super::stats::LockStatistics;
use super::traits::{LockHandle, LockProvider};

pub struct LockGuard {
    provider: Arc<dyn LockProvider>,
    stats: Arc<LockStatistics>,
    handle: Option<LockHandle>,
}

impl LockGuard {
    pub(crate) fn new(
        provider: Arc<dyn LockProvider>,
        stats: Arc<LockStatistics>,
        handle: LockHandle,
    ) -> Self {
        Self {
            provider,
            stats,
            handle: Some(handle),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.handle.as_ref().map(LockHandle::key)
    }

    /// Whether the lease ran out while the guard was held
    pub fn is_expired(&self) -> bool {
        self.handle.as_ref().is_some_and(LockHandle::is_expired)
    }

    /// Release the lock now
    ///
    /// Provider errors are logged and swallowed: the lease bounds how long
    /// an unreleased lock can linger, and the caller's outcome is already
    /// decided by the time the lock is released.
    pub async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            self.stats.record_released();
            match self.provider.release(&handle).await {
                Ok(()) => debug!(key = handle.key(), "account lock released"),
                Err(e) => warn!(key = handle.key(), error = %e, "failed to release account lock"),
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stats.record_released();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let provider = Arc::clone(&self.provider);
                runtime.spawn(async move {
                    match provider.release(&handle).await {
                        Ok(()) => debug!(key = handle.key(), "account lock released on drop"),
                        Err(e) => {
                            warn!(key = handle.key(), error = %e, "failed to release dropped account lock")
                        }
                    }
                });
            }
            Err(_) => warn!(
                key = handle.key(),
                "no runtime available to release dropped lock, waiting for lease expiry"
            ),
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("handle", &self.handle)
            .finish()
    }
}
