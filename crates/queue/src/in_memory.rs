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

//! In-memory work queue for unit tests.
//!
//! Same delivery contract as the Redis backend: popped tasks stay pending
//! until acked; requeued tasks go back to the front.

use crate::envelope::TaskEnvelope;
use crate::{QueueResult, QueuedTask, TaskQueue};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use ulid::Ulid;

#[derive(Default)]
struct QueueState {
    ready: VecDeque<QueuedTask>,
    pending_ack: HashMap<String, QueuedTask>,
}

/// Process-local task queue.
#[derive(Clone, Default)]
pub struct InMemoryTaskQueue {
    state: Arc<Mutex<QueueState>>,
    arrival: Arc<Notify>,
}

impl InMemoryTaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks neither delivered nor pending ack. Test helper.
    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Tasks delivered but not acked. Test helper.
    pub async fn pending_ack_len(&self) -> usize {
        self.state.lock().await.pending_ack.len()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn push(&self, envelope: &TaskEnvelope) -> QueueResult<String> {
        let message_id = Ulid::new().to_string();
        let mut state = self.state.lock().await;
        state.ready.push_back(QueuedTask {
            message_id: message_id.clone(),
            envelope: envelope.clone(),
        });
        drop(state);
        self.arrival.notify_waiters();
        Ok(message_id)
    }

    async fn pop(&self, max: usize, timeout: Duration) -> QueueResult<Vec<QueuedTask>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut state = self.state.lock().await;
                if !state.ready.is_empty() {
                    let mut tasks = Vec::new();
                    while tasks.len() < max {
                        let Some(task) = state.ready.pop_front() else {
                            break;
                        };
                        state
                            .pending_ack
                            .insert(task.message_id.clone(), task.clone());
                        tasks.push(task);
                    }
                    return Ok(tasks);
                }
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::select! {
                _ = self.arrival.notified() => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        self.state.lock().await.pending_ack.remove(message_id);
        Ok(())
    }

    async fn requeue(&self, message_id: &str) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        if let Some(task) = state.pending_ack.remove(message_id) {
            state.ready.push_front(task);
        }
        drop(state);
        self.arrival.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_push_pop_ack() {
        let queue = InMemoryTaskQueue::new();
        let id = queue
            .push(&TaskEnvelope::process_application(Uuid::new_v4()))
            .await
            .unwrap();

        let tasks = queue.pop(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].message_id, id);
        assert_eq!(queue.pending_ack_len().await, 1);

        queue.ack(&id).await.unwrap();
        assert_eq!(queue.pending_ack_len().await, 0);
        assert_eq!(queue.ready_len().await, 0);
    }

    #[tokio::test]
    async fn test_pop_times_out_empty() {
        let queue = InMemoryTaskQueue::new();
        let tasks = queue.pop(10, Duration::from_millis(20)).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_requeue_redelivers() {
        let queue = InMemoryTaskQueue::new();
        let id = queue
            .push(&TaskEnvelope::process_application(Uuid::new_v4()))
            .await
            .unwrap();

        let tasks = queue.pop(1, Duration::from_millis(10)).await.unwrap();
        assert_eq!(tasks.len(), 1);
        queue.requeue(&id).await.unwrap();

        let tasks = queue.pop(1, Duration::from_millis(10)).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].message_id, id);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = InMemoryTaskQueue::new();
        let popper = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(1, Duration::from_secs(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        queue
            .push(&TaskEnvelope::process_application(Uuid::new_v4()))
            .await
            .unwrap();
        let tasks = popper.await.unwrap().unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryTaskQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        queue.push(&TaskEnvelope::process_application(a)).await.unwrap();
        queue.push(&TaskEnvelope::process_application(b)).await.unwrap();

        let tasks = queue.pop(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(tasks[0].envelope.application_id(), Some(a.to_string().as_str()));
        assert_eq!(tasks[1].envelope.application_id(), Some(b.to_string().as_str()));
    }
}
