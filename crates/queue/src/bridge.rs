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

//! Queue bridge: pending_jobs -> work queue.
//!
//! Each tick opens one transaction, claims up to `batch_size` pending rows
//! with `FOR UPDATE SKIP LOCKED` (bridge replicas parallelize instead of
//! serializing), pushes each task, records the queue handle, and commits.
//! Any push failure aborts the tick: the rollback returns every claimed row
//! to `pending`, and the next tick retries. Duplicate pushes are possible by
//! design; the worker deduplicates.

use crate::envelope::{TaskEnvelope, PROCESS_CREDIT_APPLICATION};
use crate::{QueueError, QueueResult, TaskQueue};
use creditcore_persistence::{PendingJobRecord, PendingJobStore};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Bridge tuning.
#[derive(Clone, Copy, Debug)]
pub struct QueueBridgeConfig {
    /// Poll cadence.
    pub interval: Duration,
    /// Maximum rows moved per tick.
    pub batch_size: i64,
}

impl Default for QueueBridgeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

/// Outcome of one bridge tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Rows claimed from `pending_jobs`.
    pub claimed: usize,
    /// Rows pushed and marked enqueued.
    pub enqueued: usize,
}

/// Moves trigger-created pending jobs onto the work queue.
pub struct QueueBridge {
    store: PendingJobStore,
    queue: Arc<dyn TaskQueue>,
    config: QueueBridgeConfig,
}

impl QueueBridge {
    /// Create a bridge.
    pub fn new(store: PendingJobStore, queue: Arc<dyn TaskQueue>, config: QueueBridgeConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Run one claim-push-commit cycle.
    pub async fn tick(&self) -> QueueResult<BridgeStats> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        let jobs = self
            .store
            .claim_pending(&mut tx, self.config.batch_size)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        if jobs.is_empty() {
            debug!("no pending jobs to enqueue");
            return Ok(BridgeStats::default());
        }

        let mut stats = BridgeStats {
            claimed: jobs.len(),
            enqueued: 0,
        };

        for job in &jobs {
            let envelope = Self::envelope_for(job);
            let message_id = self.queue.push(&envelope).await?;
            self.store
                .mark_enqueued(&mut tx, job.id, &message_id)
                .await
                .map_err(|e| QueueError::Backend(e.to_string()))?;
            stats.enqueued += 1;
            debug!(
                pending_job_id = %job.id,
                application_id = %job.application_id,
                queue_message_id = %message_id,
                "pending job enqueued"
            );
        }

        tx.commit()
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        info!(
            claimed = stats.claimed,
            enqueued = stats.enqueued,
            "queue bridge tick completed"
        );
        Ok(stats)
    }

    /// Poll on the configured cadence until shutdown.
    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        // Rows stay pending; the next tick retries.
                        error!(error = %err, "queue bridge tick failed");
                    }
                }
                _ = shutdown.notified() => {
                    info!("queue bridge stopping");
                    return;
                }
            }
        }
    }

    fn envelope_for(job: &PendingJobRecord) -> TaskEnvelope {
        let kwargs = job
            .job_kwargs
            .as_object()
            .cloned()
            .unwrap_or_default();
        let application_id = job
            .job_args
            .get("application_id")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| job.application_id.to_string());
        TaskEnvelope {
            task_name: if job.task_name.is_empty() {
                PROCESS_CREDIT_APPLICATION.to_string()
            } else {
                job.task_name.clone()
            },
            args: vec![Value::String(application_id)],
            kwargs,
            trace_context: None,
        }
    }
}
