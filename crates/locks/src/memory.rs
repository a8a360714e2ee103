// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 CreditCore Contributors
//
// This file is part of CreditCore.
//
// CreditCore is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// CreditCore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with CreditCore. If not, see <https://www.gnu.org/licenses/>.

//! In-memory lock manager (single process, for tests).

use crate::manager::{AcquireOptions, Lease, LockManager};
use crate::{LockError, LockResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use ulid::Ulid;

struct Entry {
    holder_id: String,
    token: String,
    expires_at: Instant,
}

/// HashMap-backed lock manager with the same semantics as the Redis backend.
#[derive(Clone, Default)]
pub struct MemoryLockManager {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryLockManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    async fn try_acquire(&self, options: &AcquireOptions) -> Option<Lease> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(&options.lock_key) {
            Some(entry) if entry.expires_at > now => None,
            _ => {
                let token = Ulid::new().to_string();
                entries.insert(
                    options.lock_key.clone(),
                    Entry {
                        holder_id: options.holder_id.clone(),
                        token: token.clone(),
                        expires_at: now + options.ttl,
                    },
                );
                Some(Lease {
                    lock_key: options.lock_key.clone(),
                    holder_id: options.holder_id.clone(),
                    token,
                    expires_at: Utc::now()
                        + chrono::Duration::from_std(options.ttl)
                            .unwrap_or_else(|_| chrono::Duration::seconds(300)),
                })
            }
        }
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn acquire(&self, options: AcquireOptions) -> LockResult<Lease> {
        let deadline = Instant::now() + options.wait_budget;
        loop {
            if let Some(lease) = self.try_acquire(&options).await {
                return Ok(lease);
            }
            if Instant::now() >= deadline {
                return Err(LockError::AlreadyHeld(options.lock_key));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn renew(&self, lease: &Lease, ttl: Duration) -> LockResult<Lease> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&lease.lock_key) {
            None => Err(LockError::NotFound(lease.lock_key.clone())),
            Some(entry) if entry.token != lease.token => {
                Err(LockError::TokenMismatch(lease.lock_key.clone()))
            }
            Some(entry) => {
                entry.expires_at = Instant::now() + ttl;
                Ok(Lease {
                    expires_at: Utc::now()
                        + chrono::Duration::from_std(ttl)
                            .unwrap_or_else(|_| chrono::Duration::seconds(300)),
                    ..lease.clone()
                })
            }
        }
    }

    async fn release(&self, lease: &Lease) -> LockResult<()> {
        let mut entries = self.entries.lock().await;
        match entries.get(&lease.lock_key) {
            None => Ok(()),
            Some(entry) if entry.token != lease.token => {
                Err(LockError::TokenMismatch(lease.lock_key.clone()))
            }
            Some(_) => {
                entries.remove(&lease.lock_key);
                Ok(())
            }
        }
    }

    async fn holder(&self, lock_key: &str) -> LockResult<Option<String>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(lock_key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.holder_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(key: &str, holder: &str, wait: Duration) -> AcquireOptions {
        AcquireOptions {
            lock_key: key.to_string(),
            holder_id: holder.to_string(),
            ttl: Duration::from_secs(300),
            wait_budget: wait,
        }
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let manager = MemoryLockManager::new();
        let lease = manager
            .acquire(options("process:app-1", "worker-1", Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(
            manager.holder("process:app-1").await.unwrap(),
            Some("worker-1".to_string())
        );
        manager.release(&lease).await.unwrap();
        assert_eq!(manager.holder("process:app-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_holder_rejected_within_budget() {
        let manager = MemoryLockManager::new();
        let _lease = manager
            .acquire(options("process:app-1", "worker-1", Duration::ZERO))
            .await
            .unwrap();

        let err = manager
            .acquire(options("process:app-1", "worker-2", Duration::from_millis(120)))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::AlreadyHeld(_)));
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let manager = MemoryLockManager::new();
        let lease = manager
            .acquire(options("process:app-1", "worker-1", Duration::ZERO))
            .await
            .unwrap();

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .acquire(options("process:app-1", "worker-2", Duration::from_secs(2)))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.release(&lease).await.unwrap();

        let lease2 = waiter.await.unwrap().unwrap();
        assert_eq!(lease2.holder_id, "worker-2");
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let manager = MemoryLockManager::new();
        let lease = manager
            .acquire(options("process:app-1", "worker-1", Duration::ZERO))
            .await
            .unwrap();
        manager.release(&lease).await.unwrap();
        // Second release of the same lease: key is gone, still Ok.
        manager.release(&lease).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_token_cannot_release_new_lease() {
        let manager = MemoryLockManager::new();
        let old = manager
            .acquire(options("process:app-1", "worker-1", Duration::ZERO))
            .await
            .unwrap();
        manager.release(&old).await.unwrap();

        let new = manager
            .acquire(options("process:app-1", "worker-2", Duration::ZERO))
            .await
            .unwrap();

        let err = manager.release(&old).await.unwrap_err();
        assert!(matches!(err, LockError::TokenMismatch(_)));
        assert_eq!(
            manager.holder("process:app-1").await.unwrap(),
            Some("worker-2".to_string())
        );

        manager.release(&new).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_reacquired() {
        let manager = MemoryLockManager::new();
        let mut opts = options("process:app-1", "worker-1", Duration::ZERO);
        opts.ttl = Duration::from_millis(30);
        let _old = manager.acquire(opts).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let lease = manager
            .acquire(options("process:app-1", "worker-2", Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(lease.holder_id, "worker-2");
    }

    #[tokio::test]
    async fn test_renew_extends_expiry() {
        let manager = MemoryLockManager::new();
        let mut opts = options("process:app-1", "worker-1", Duration::ZERO);
        opts.ttl = Duration::from_millis(80);
        let lease = manager.acquire(opts).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        manager
            .renew(&lease, Duration::from_secs(300))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Without the renewal the lease would have expired by now.
        assert_eq!(
            manager.holder("process:app-1").await.unwrap(),
            Some("worker-1".to_string())
        );
    }
}
