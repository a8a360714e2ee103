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

//! Scheduled maintenance.
//!
//! - Orphan sweep (5 min): `processing` rows stuck past twice the task
//!   timeout return to `pending`.
//! - DLQ auto-retry (hourly): retryable dead letters re-enqueue.
//! - Webhook TTL (daily): events older than 30 days are deleted.
//! - Partition assurance (daily): monthly partitions three months ahead.
//! - Stale-PENDING cancellation (daily, optional): disabled unless
//!   configured.

use crate::context::WorkerContext;
use creditcore_domain::ApplicationStatus;
use creditcore_persistence::{ChangeAttribution, PartitionMaintenance};
use creditcore_queue::TaskEnvelope;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Maintenance cadences and knobs.
#[derive(Clone, Copy, Debug)]
pub struct MaintenanceConfig {
    /// Orphan-sweep cadence.
    pub orphan_sweep_interval: Duration,
    /// Age at which a `processing` row counts as orphaned.
    pub orphan_age: Duration,
    /// DLQ auto-retry cadence.
    pub dlq_retry_interval: Duration,
    /// Dead letters re-enqueued per pass.
    pub dlq_retry_batch: i64,
    /// Webhook TTL / partition / stale-PENDING cadence.
    pub daily_interval: Duration,
    /// Webhook event retention.
    pub webhook_ttl_days: i64,
    /// Cancel PENDING applications older than this; `None` disables.
    pub stale_pending_after: Option<Duration>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            orphan_sweep_interval: Duration::from_secs(300),
            // Twice the 5-minute task timeout.
            orphan_age: Duration::from_secs(600),
            dlq_retry_interval: Duration::from_secs(3600),
            dlq_retry_batch: 100,
            daily_interval: Duration::from_secs(86_400),
            webhook_ttl_days: 30,
            stale_pending_after: None,
        }
    }
}

/// Runs the periodic maintenance jobs.
pub struct MaintenanceRunner {
    ctx: Arc<WorkerContext>,
    partitions: PartitionMaintenance,
    webhook_events: creditcore_persistence::WebhookEventStore,
    config: MaintenanceConfig,
}

impl MaintenanceRunner {
    /// Create a runner.
    pub fn new(
        ctx: Arc<WorkerContext>,
        partitions: PartitionMaintenance,
        webhook_events: creditcore_persistence::WebhookEventStore,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            ctx,
            partitions,
            webhook_events,
            config,
        }
    }

    /// Tick the three schedules until shutdown.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let mut orphan_tick = tokio::time::interval(self.config.orphan_sweep_interval);
        let mut dlq_tick = tokio::time::interval(self.config.dlq_retry_interval);
        let mut daily_tick = tokio::time::interval(self.config.daily_interval);
        // Skip the immediate first firing of each interval.
        orphan_tick.tick().await;
        dlq_tick.tick().await;
        daily_tick.tick().await;

        info!("maintenance runner started");
        loop {
            tokio::select! {
                _ = orphan_tick.tick() => self.sweep_orphans().await,
                _ = dlq_tick.tick() => self.retry_dead_letters().await,
                _ = daily_tick.tick() => self.daily_pass().await,
                _ = shutdown.notified() => {
                    info!("maintenance runner stopping");
                    return;
                }
            }
        }
    }

    /// Reset processing rows abandoned by dead workers.
    pub async fn sweep_orphans(&self) {
        match self
            .ctx
            .pending_jobs
            .reclaim_orphans(self.config.orphan_age)
            .await
        {
            Ok(0) => {}
            Ok(reclaimed) => info!(reclaimed, "orphaned pending jobs reset to pending"),
            Err(err) => error!(error = %err, "orphan sweep failed"),
        }
    }

    /// Re-enqueue retryable dead letters.
    pub async fn retry_dead_letters(&self) {
        let jobs = match self
            .ctx
            .failed_jobs
            .list_retryable(self.config.dlq_retry_batch)
            .await
        {
            Ok(jobs) => jobs,
            Err(err) => {
                error!(error = %err, "failed to list retryable dead letters");
                return;
            }
        };
        if jobs.is_empty() {
            return;
        }
        info!(count = jobs.len(), "retrying dead-lettered jobs");

        for job in jobs {
            let args = job
                .job_args
                .as_array()
                .cloned()
                .unwrap_or_default();
            let kwargs = job
                .job_kwargs
                .as_object()
                .cloned()
                .unwrap_or_default();
            let Some(application_id) = args
                .first()
                .and_then(Value::as_str)
                .and_then(|raw| Uuid::parse_str(raw).ok())
            else {
                warn!(job_id = %job.job_id, "dead letter has no application id, skipping");
                continue;
            };

            let envelope = TaskEnvelope {
                task_name: job.task_name.clone(),
                args,
                kwargs,
                trace_context: None,
            };
            match self.ctx.queue.push(&envelope).await {
                Ok(message_id) => {
                    if let Err(err) = self
                        .ctx
                        .pending_jobs
                        .insert_enqueued(
                            application_id,
                            &job.task_name,
                            &job.job_args,
                            &job.job_kwargs,
                            &message_id,
                        )
                        .await
                    {
                        warn!(job_id = %job.job_id, error = %err, "failed to record retry job");
                    }
                    if let Err(err) = self.ctx.failed_jobs.mark_retried(job.id, &message_id).await {
                        warn!(job_id = %job.job_id, error = %err, "failed to mark dead letter retried");
                    }
                    info!(
                        job_id = %job.job_id,
                        new_job_id = %message_id,
                        "dead letter re-enqueued"
                    );
                }
                Err(err) => {
                    // Leave the row pending; the next pass retries.
                    warn!(job_id = %job.job_id, error = %err, "failed to re-enqueue dead letter");
                }
            }
        }
    }

    /// Daily housekeeping: webhook TTL, partitions, stale PENDING.
    pub async fn daily_pass(&self) {
        match self
            .webhook_events
            .delete_older_than_days(self.config.webhook_ttl_days)
            .await
        {
            Ok(deleted) => info!(
                deleted,
                ttl_days = self.config.webhook_ttl_days,
                "webhook events cleanup completed"
            ),
            Err(err) => error!(error = %err, "webhook events cleanup failed"),
        }

        if let Err(err) = self.partitions.run().await {
            error!(error = %err, "partition assurance failed");
        }

        if let Some(threshold) = self.config.stale_pending_after {
            self.cancel_stale_pending(threshold).await;
        }
    }

    /// Cancel PENDING applications older than the configured threshold,
    /// through the state machine so the audit trail records it.
    async fn cancel_stale_pending(&self, threshold: Duration) {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(threshold).unwrap_or_else(|_| chrono::Duration::hours(24));
        let ids = match self.ctx.repository.stale_pending_ids(cutoff, 100).await {
            Ok(ids) => ids,
            Err(err) => {
                error!(error = %err, "failed to list stale pending applications");
                return;
            }
        };
        for id in ids {
            match self
                .ctx
                .repository
                .transition_status(
                    id,
                    ApplicationStatus::Cancelled,
                    Some(ChangeAttribution {
                        changed_by: "system",
                        change_reason: "stale pending auto-cancellation",
                    }),
                )
                .await
            {
                Ok(record) => {
                    info!(application_id = %id, "stale pending application cancelled");
                    self.ctx.broadcast(&record).await;
                }
                Err(err) => {
                    // Raced with a worker picking it up; that is fine.
                    warn!(application_id = %id, error = %err, "stale cancel skipped");
                }
            }
        }
    }
}
