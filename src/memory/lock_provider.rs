//! Lease-based lock provider for a single process
//!
//! Each key maps to the token and expiry of its current holder. A key is free
//! when it has no entry or when the holder's lease has run out; an expired
//! lease is taken over by the next acquirer. Waiters park on a `Notify` and
//! wake on any release, or when the current lease would expire, or when their
//! own wait deadline passes, whichever comes first.
//!
//! Release is token-checked, so a holder whose lease was taken over cannot
//! free the new holder's lock, and a second release of the same handle finds
//! nothing to remove.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::core::traits::{LockHandle, LockProvider};
use crate::types::BalanceError;

#[derive(Debug)]
struct Lease {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct InMemoryLockProvider {
    leases: DashMap<String, Lease>,
    released: Notify,
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently has an unexpired holder
    pub fn is_held(&self, key: &str) -> bool {
        self.leases
            .get(key)
            .map(|lease| lease.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Claim `key` if free, otherwise report when the current lease expires
    fn try_claim(&self, key: &str, lease: Duration) -> Result<LockHandle, Instant> {
        match self.leases.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                let handle = LockHandle::new(key, lease);
                vacant.insert(Lease {
                    token: handle.token().to_string(),
                    expires_at: handle.lease_expiry(),
                });
                Ok(handle)
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at > Instant::now() {
                    return Err(occupied.get().expires_at);
                }
                debug!(key, "taking over expired lease");
                let handle = LockHandle::new(key, lease);
                occupied.insert(Lease {
                    token: handle.token().to_string(),
                    expires_at: handle.lease_expiry(),
                });
                Ok(handle)
            }
        }
    }
}

#[async_trait]
impl LockProvider for InMemoryLockProvider {
    async fn try_acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockHandle>, BalanceError> {
        let deadline = Instant::now() + wait;

        loop {
            // Register for wake-ups before checking, so a release between the
            // check and the wait is not missed
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let holder_expiry = match self.try_claim(key, lease) {
                Ok(handle) => return Ok(Some(handle)),
                Err(expiry) => expiry,
            };

            if Instant::now() >= deadline {
                return Ok(None);
            }

            let wake_at = holder_expiry.min(deadline);
            let _ = tokio::time::timeout_at(wake_at, notified).await;
        }
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), BalanceError> {
        let removed = self
            .leases
            .remove_if(handle.key(), |_, lease| lease.token == handle.token());

        if removed.is_some() {
            self.released.notify_waiters();
        }
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> bool {
        self.is_held(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const KEY: &str = "account_balance_lock:1";

    #[tokio::test(start_paused = true)]
    async fn test_acquire_free_key() {
        let provider = InMemoryLockProvider::new();

        let handle = provider
            .try_acquire(KEY, Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap();

        assert!(handle.is_some());
        assert!(provider.is_locked(KEY).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contended_key_times_out() {
        let provider = InMemoryLockProvider::new();
        let _held = provider
            .try_acquire(KEY, Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        let started = Instant::now();
        let second = provider
            .try_acquire(KEY, Duration::from_secs(2), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(second.is_none());
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_wakes_on_release() {
        let provider = Arc::new(InMemoryLockProvider::new());
        let held = provider
            .try_acquire(KEY, Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        let waiter = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move {
                provider
                    .try_acquire(KEY, Duration::from_secs(5), Duration::from_secs(10))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        provider.release(&held).await.unwrap();

        let acquired = waiter.await.unwrap().unwrap();
        assert!(acquired.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_is_taken_over() {
        let provider = InMemoryLockProvider::new();
        let stale = provider
            .try_acquire(KEY, Duration::ZERO, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        let fresh = provider
            .try_acquire(KEY, Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        assert_ne!(stale.token(), fresh.token());

        // The stale holder must not free the new holder's lock
        provider.release(&stale).await.unwrap();
        assert!(provider.is_held(KEY));

        provider.release(&fresh).await.unwrap();
        assert!(!provider.is_held(KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_release_is_noop() {
        let provider = InMemoryLockProvider::new();
        let first = provider
            .try_acquire(KEY, Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        provider.release(&first).await.unwrap();
        let second = provider
            .try_acquire(KEY, Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(provider.release(&first).await, Ok(()));
        assert!(provider.is_held(KEY));

        provider.release(&second).await.unwrap();
        assert!(!provider.is_held(KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let provider = InMemoryLockProvider::new();
        let _one = provider
            .try_acquire("account_balance_lock:1", Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        let two = provider
            .try_acquire("account_balance_lock:2", Duration::ZERO, Duration::from_secs(10))
            .await
            .unwrap();

        assert!(two.is_some());
    }
}
