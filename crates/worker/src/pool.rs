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

//! Worker pool: concurrency-capped task consumption with retries, a task
//! deadline, dead-letter routing, and shutdown draining.

use crate::context::WorkerContext;
use crate::task::{process_credit_application, TaskOutcome};
use creditcore_domain::ProcessingError;
use creditcore_persistence::NewFailedJob;
use creditcore_queue::QueuedTask;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Worker pool tuning.
#[derive(Clone, Copy, Debug)]
pub struct WorkerConfig {
    /// Concurrent tasks per worker process.
    pub concurrency: usize,
    /// Hard ceiling on a single task run.
    pub task_timeout: Duration,
    /// Total attempts per delivery (first try included).
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt with jitter.
    pub backoff_base: Duration,
    /// Window in-flight tasks get to finish after a shutdown signal.
    pub shutdown_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            task_timeout: Duration::from_secs(300),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// Consumes the work queue until shutdown.
pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
    config: WorkerConfig,
}

impl WorkerPool {
    /// Create a pool.
    pub fn new(ctx: Arc<WorkerContext>, config: WorkerConfig) -> Self {
        Self { ctx, config }
    }

    /// Pop-and-dispatch loop. Returns after shutdown, once in-flight tasks
    /// drained or the grace window expired. Tasks cut off by the grace
    /// window stay unacked (the queue redelivers) and their `processing`
    /// rows fall to the orphan sweeper; their leases expire by TTL.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut in_flight: JoinSet<()> = JoinSet::new();
        info!(
            concurrency = self.config.concurrency,
            worker_id = %self.ctx.worker_id,
            "worker pool started"
        );

        loop {
            // Reap finished tasks without blocking.
            while in_flight.try_join_next().is_some() {}

            let free = semaphore.available_permits().max(1);
            let popped = tokio::select! {
                popped = self.ctx.queue.pop(free, Duration::from_secs(5)) => popped,
                _ = shutdown.notified() => break,
            };

            let tasks = match popped {
                Ok(tasks) => tasks,
                Err(err) => {
                    error!(error = %err, "failed to pop from work queue");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for task in tasks {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let ctx = Arc::clone(&self.ctx);
                let config = self.config;
                in_flight.spawn(async move {
                    handle_task(&ctx, &config, task).await;
                    drop(permit);
                });
            }
        }

        info!(
            grace_secs = self.config.shutdown_grace.as_secs(),
            "worker pool draining"
        );
        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("shutdown grace expired, aborting remaining tasks");
            in_flight.abort_all();
        }
        info!("worker pool stopped");
    }
}

/// Run one delivery through the retry policy and terminal bookkeeping.
///
/// Exposed so embedders and tests can drive single deliveries without the
/// pop loop.
pub async fn handle_task(ctx: &WorkerContext, config: &WorkerConfig, task: QueuedTask) {
    let message_id = task.message_id.clone();

    let pending_job = match ctx.pending_jobs.mark_processing(&message_id).await {
        Ok(job) => job,
        Err(err) => {
            // Bookkeeping only; the task itself decides idempotently.
            warn!(%message_id, error = %err, "failed to mark pending job processing");
            None
        }
    };

    let mut attempt = 1u32;
    loop {
        let result = tokio::time::timeout(
            config.task_timeout,
            process_credit_application(ctx, &task.envelope),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProcessingError::NetworkTimeout(format!(
                "task exceeded {}s deadline",
                config.task_timeout.as_secs()
            )))
        });

        match result {
            Ok(outcome) => {
                let note = match &outcome {
                    TaskOutcome::SkippedAlreadyProcessing => Some("skipped (already processing)"),
                    _ => None,
                };
                if let Err(err) = ctx.pending_jobs.mark_completed(&message_id, note).await {
                    warn!(%message_id, error = %err, "failed to mark pending job completed");
                }
                if let Err(err) = ctx.queue.ack(&message_id).await {
                    warn!(%message_id, error = %err, "failed to ack task");
                }
                return;
            }
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let delay = backoff_delay(config.backoff_base, attempt);
                warn!(
                    %message_id,
                    attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                error!(
                    %message_id,
                    attempt,
                    error_type = err.kind(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "task failed, dead-lettering"
                );
                let dead_letter = NewFailedJob {
                    job_id: message_id.clone(),
                    task_name: task.envelope.task_name.clone(),
                    job_args: serde_json::Value::Array(task.envelope.args.clone()),
                    job_kwargs: serde_json::Value::Object(task.envelope.kwargs.clone()),
                    error_type: err.kind().to_string(),
                    error_message: err.to_string(),
                    error_traceback: Some(error_chain(&err)),
                    retry_count: attempt as i32,
                    max_retries: config.max_retries as i32,
                    is_retryable: err.is_retryable(),
                    pending_job_id: pending_job.as_ref().map(|job| job.id),
                };
                if let Err(db_err) = ctx.failed_jobs.insert(dead_letter).await {
                    error!(%message_id, error = %db_err, "failed to write dead-letter row");
                }
                if let Err(db_err) = ctx
                    .pending_jobs
                    .mark_failed(&message_id, &err.to_string())
                    .await
                {
                    warn!(%message_id, error = %db_err, "failed to mark pending job failed");
                }
                if let Err(queue_err) = ctx.queue.ack(&message_id).await {
                    warn!(%message_id, error = %queue_err, "failed to ack dead-lettered task");
                }
                return;
            }
        }
    }
}

/// Exponential backoff with ±25% jitter: base * 2^(attempt-1).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << (attempt - 1).min(16));
    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    exp.mul_f64(jitter)
}

/// Render the error source chain, nearest cause first.
fn error_chain(err: &ProcessingError) -> String {
    use std::error::Error;
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join("\ncaused by: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_exponentially() {
        let base = Duration::from_secs(1);
        for _ in 0..20 {
            let first = backoff_delay(base, 1);
            let second = backoff_delay(base, 2);
            let third = backoff_delay(base, 3);
            assert!(first >= Duration::from_millis(750) && first <= Duration::from_millis(1250));
            assert!(second >= Duration::from_millis(1500) && second <= Duration::from_millis(2500));
            assert!(third >= Duration::from_millis(3000) && third <= Duration::from_millis(5000));
        }
    }

    #[test]
    fn test_error_chain_renders_sources() {
        let err = ProcessingError::DatabaseUnavailable("pool timed out".into());
        let chain = error_chain(&err);
        assert!(chain.contains("pool timed out"));
    }
}
