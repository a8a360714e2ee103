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

//! Redis-based lock manager.
//!
//! Acquisition is a single `SET key token NX PX ttl`; renew and release are
//! Lua compare-and-set scripts on the fencing token, so they are atomic with
//! respect to concurrent acquirers. Redis owns expiry (`PX`), which is what
//! makes the lease safe against holder death.

use crate::manager::{AcquireOptions, Lease, LockManager};
use crate::{LockError, LockResult};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::{Duration, Instant};
use ulid::Ulid;

const RELEASE_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return -1
end";

const RENEW_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
else
    return -1
end";

/// Cluster-wide lock manager backed by Redis.
#[derive(Clone)]
pub struct RedisLockManager {
    conn: ConnectionManager,
    release_script: Script,
    renew_script: Script,
}

impl RedisLockManager {
    /// Connect to Redis at the given URL.
    ///
    /// Example URLs: `redis://127.0.0.1/`, `redis+tls://host:6379/`.
    pub async fn new(redis_url: &str) -> LockResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| LockError::Backend(format!("failed to create redis client: {e}")))?;
        let conn = client
            .get_tokio_connection_manager()
            .await
            .map_err(|e| LockError::Backend(format!("failed to connect redis: {e}")))?;
        Ok(Self {
            conn,
            release_script: Script::new(RELEASE_SCRIPT),
            renew_script: Script::new(RENEW_SCRIPT),
        })
    }

    async fn try_acquire(&self, options: &AcquireOptions, token: &str) -> LockResult<bool> {
        let mut conn = self.conn.clone();
        let ttl_ms = options.ttl.as_millis() as u64;
        let reply: Option<String> = redis::cmd("SET")
            .arg(&options.lock_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn acquire(&self, options: AcquireOptions) -> LockResult<Lease> {
        // The stored value doubles as the fencing token; the holder prefix
        // makes `holder()` answerable without a second key.
        let token = format!("{}:{}", options.holder_id, Ulid::new());
        let deadline = Instant::now() + options.wait_budget;
        loop {
            if self.try_acquire(&options, &token).await? {
                return Ok(Lease {
                    lock_key: options.lock_key,
                    holder_id: options.holder_id,
                    token,
                    expires_at: Utc::now()
                        + chrono::Duration::from_std(options.ttl)
                            .unwrap_or_else(|_| chrono::Duration::seconds(300)),
                });
            }
            if Instant::now() >= deadline {
                return Err(LockError::AlreadyHeld(options.lock_key));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn renew(&self, lease: &Lease, ttl: Duration) -> LockResult<Lease> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl.as_millis() as u64;
        let result: i64 = self
            .renew_script
            .key(&lease.lock_key)
            .arg(&lease.token)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;
        match result {
            -1 => Err(LockError::TokenMismatch(lease.lock_key.clone())),
            0 => Err(LockError::NotFound(lease.lock_key.clone())),
            _ => Ok(Lease {
                expires_at: Utc::now()
                    + chrono::Duration::from_std(ttl)
                        .unwrap_or_else(|_| chrono::Duration::seconds(300)),
                ..lease.clone()
            }),
        }
    }

    async fn release(&self, lease: &Lease) -> LockResult<()> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .release_script
            .key(&lease.lock_key)
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await?;
        match result {
            // Key absent: already released or expired. Idempotent success.
            -1 => {
                let holder: Option<String> = redis::cmd("GET")
                    .arg(&lease.lock_key)
                    .query_async(&mut conn)
                    .await?;
                if holder.is_none() {
                    Ok(())
                } else {
                    Err(LockError::TokenMismatch(lease.lock_key.clone()))
                }
            }
            _ => Ok(()),
        }
    }

    async fn holder(&self, lock_key: &str) -> LockResult<Option<String>> {
        let mut conn = self.conn.clone();
        let token: Option<String> = redis::cmd("GET")
            .arg(lock_key)
            .query_async(&mut conn)
            .await?;
        Ok(token.map(|value| {
            value
                .split_once(':')
                .map(|(holder, _)| holder.to_string())
                .unwrap_or(value)
        }))
    }
}
