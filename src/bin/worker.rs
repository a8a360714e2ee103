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

//! Worker process: queue bridge, worker pool, scheduled maintenance.
//! Horizontal scale is additional processes of this binary.

use anyhow::Context;
use creditcore::{tracing_setup, Config};
use creditcore_circuit_breaker::{BreakerConfig, CircuitBreakerRegistry};
use creditcore_locks::redis_backend::RedisLockManager;
use creditcore_persistence::{
    ApplicationRepository, FailedJobStore, PartitionMaintenance, PendingJobStore, PiiCipher,
    WebhookEventStore,
};
use creditcore_queue::{QueueBridge, QueueBridgeConfig, RedisTaskQueue};
use creditcore_realtime::RedisUpdatePublisher;
use creditcore_strategies::StrategyRegistry;
use creditcore_worker::{
    MaintenanceConfig, MaintenanceRunner, WorkerConfig, WorkerContext, WorkerPool,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;
use ulid::Ulid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_setup::init_tracing();
    let config = Config::from_env().context("loading configuration")?;

    let pool = creditcore_persistence::connect(&config.database_url, config.db_pool_size)
        .await
        .context("connecting to postgres")?;

    let cipher = PiiCipher::new(config.encryption_key.expose_secret().as_bytes())
        .context("building pii cipher")?;
    let locks = Arc::new(
        RedisLockManager::new(&config.redis_url)
            .await
            .context("connecting lock manager")?,
    );
    let queue = Arc::new(
        RedisTaskQueue::new(&config.redis_url)
            .await
            .context("connecting work queue")?,
    );
    let publisher = Arc::new(
        RedisUpdatePublisher::new(&config.redis_url)
            .await
            .context("connecting update publisher")?,
    );

    let worker_id = format!("worker-{}", Ulid::new());
    let ctx = Arc::new(WorkerContext {
        repository: ApplicationRepository::new(pool.clone()),
        pending_jobs: PendingJobStore::new(pool.clone()),
        failed_jobs: FailedJobStore::new(pool.clone()),
        locks,
        queue: queue.clone(),
        breakers: CircuitBreakerRegistry::new(BreakerConfig::default()),
        strategies: Arc::new(StrategyRegistry::with_mock_providers()),
        publisher,
        cipher,
        worker_id: worker_id.clone(),
    });

    let shutdown = Arc::new(Notify::new());

    let bridge = Arc::new(QueueBridge::new(
        PendingJobStore::new(pool.clone()),
        queue,
        QueueBridgeConfig {
            interval: config.bridge_interval,
            batch_size: config.bridge_batch_size,
        },
    ));
    let bridge_handle = tokio::spawn(bridge.run(Arc::clone(&shutdown)));

    let maintenance = MaintenanceRunner::new(
        Arc::clone(&ctx),
        PartitionMaintenance::new(pool.clone()),
        WebhookEventStore::new(pool.clone()),
        MaintenanceConfig {
            stale_pending_after: config.stale_pending_after(),
            ..Default::default()
        },
    );
    let maintenance_shutdown = Arc::clone(&shutdown);
    let maintenance_handle =
        tokio::spawn(async move { maintenance.run(maintenance_shutdown).await });

    let worker_pool = WorkerPool::new(
        Arc::clone(&ctx),
        WorkerConfig {
            concurrency: config.worker_concurrency,
            ..Default::default()
        },
    );

    info!(worker_id = %worker_id, "worker process started");

    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("termination signal received, draining");
        signal_shutdown.notify_waiters();
    });

    worker_pool.run(Arc::clone(&shutdown)).await;

    let _ = bridge_handle.await;
    let _ = maintenance_handle.await;
    info!("worker process stopped");
    Ok(())
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("installing SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
