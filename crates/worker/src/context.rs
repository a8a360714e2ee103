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

//! Shared dependencies of the worker tasks.

use creditcore_circuit_breaker::CircuitBreakerRegistry;
use creditcore_locks::LockManager;
use creditcore_persistence::{
    ApplicationRecord, ApplicationRepository, FailedJobStore, PendingJobStore, PiiCipher,
};
use creditcore_queue::TaskQueue;
use creditcore_realtime::{UpdatePayload, UpdatePublisher};
use creditcore_strategies::StrategyRegistry;
use std::sync::Arc;

/// Everything a worker task needs, shared across the pool.
pub struct WorkerContext {
    /// Application reads and guarded transitions.
    pub repository: ApplicationRepository,
    /// Pending-job status updates.
    pub pending_jobs: PendingJobStore,
    /// Dead-letter inserts.
    pub failed_jobs: FailedJobStore,
    /// Per-application leases.
    pub locks: Arc<dyn LockManager>,
    /// The work queue (for DLQ re-enqueues and acks).
    pub queue: Arc<dyn TaskQueue>,
    /// Provider-call protection.
    pub breakers: Arc<CircuitBreakerRegistry>,
    /// Country strategy table.
    pub strategies: Arc<StrategyRegistry>,
    /// Realtime update sink.
    pub publisher: Arc<dyn UpdatePublisher>,
    /// PII cipher for document decryption.
    pub cipher: PiiCipher,
    /// Stable identity of this worker process (lock holder id).
    pub worker_id: String,
}

impl WorkerContext {
    /// Publish an update for a record. Best-effort: failures are logged and
    /// never propagate into the pipeline.
    pub async fn broadcast(&self, record: &ApplicationRecord) {
        let payload = UpdatePayload {
            id: record.id.to_string(),
            status: record.status.as_str().to_string(),
            risk_score: record.risk_score.map(|score| score.to_string()),
            updated_at: Some(record.updated_at.to_rfc3339()),
        };
        if let Err(err) = self.publisher.publish_update(&payload).await {
            tracing::warn!(
                application_id = %record.id,
                status = %record.status,
                error = %err,
                "failed to publish application update"
            );
        }
    }
}
