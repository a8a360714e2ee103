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

//! Redis Streams backend.
//!
//! - `XADD` appends tasks to the stream; Redis generates the message id
//!   that becomes the `pending_jobs.queue_message_id` handle.
//! - `XREADGROUP` with the `workers` consumer group load-balances delivery
//!   across worker processes.
//! - `XACK` on completion; `XCLAIM` back to this consumer for an explicit
//!   requeue. Unacked messages redeliver after the claim idle time.

use crate::envelope::TaskEnvelope;
use crate::{QueueError, QueueResult, QueuedTask, TaskQueue};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisResult, Value};
use std::collections::HashMap;
use std::time::Duration;
use ulid::Ulid;

const STREAM_KEY: &str = "queue:credit-tasks";
const CONSUMER_GROUP: &str = "workers";

/// Redis Streams work queue.
#[derive(Clone)]
pub struct RedisTaskQueue {
    conn: ConnectionManager,
    consumer_name: String,
    max_stream_len: usize,
}

impl RedisTaskQueue {
    /// Connect and ensure the consumer group exists.
    pub async fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::Backend(format!("failed to create redis client: {e}")))?;
        let mut conn = client
            .get_tokio_connection_manager()
            .await
            .map_err(|e| QueueError::Backend(format!("failed to connect redis: {e}")))?;

        // Create the consumer group; BUSYGROUP means it already exists.
        let created: RedisResult<Value> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(STREAM_KEY)
            .arg(CONSUMER_GROUP)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        if let Err(err) = created {
            if !err.to_string().contains("BUSYGROUP") {
                return Err(err.into());
            }
        }

        Ok(Self {
            conn,
            consumer_name: format!("consumer-{}", Ulid::new()),
            max_stream_len: 100_000,
        })
    }

    fn parse_xread_reply(reply: Value) -> QueueResult<Vec<QueuedTask>> {
        // Reply shape: [[stream, [[id, [field, value, ...]], ...]]]
        let mut tasks = Vec::new();
        let Value::Bulk(streams) = reply else {
            return Ok(tasks);
        };
        for stream in streams {
            let Value::Bulk(parts) = stream else { continue };
            let Some(Value::Bulk(entries)) = parts.get(1) else {
                continue;
            };
            for entry in entries {
                let Value::Bulk(entry_parts) = entry else {
                    continue;
                };
                let Some(Value::Data(id_bytes)) = entry_parts.first() else {
                    continue;
                };
                let message_id = String::from_utf8_lossy(id_bytes).to_string();
                let Some(Value::Bulk(fields)) = entry_parts.get(1) else {
                    continue;
                };
                let mut field_map = HashMap::new();
                for pair in fields.chunks(2) {
                    if let [Value::Data(key), Value::Data(value)] = pair {
                        field_map.insert(
                            String::from_utf8_lossy(key).to_string(),
                            String::from_utf8_lossy(value).to_string(),
                        );
                    }
                }
                let Some(payload) = field_map.get("task") else {
                    continue;
                };
                let envelope: TaskEnvelope = serde_json::from_str(payload)?;
                tasks.push(QueuedTask {
                    message_id,
                    envelope,
                });
            }
        }
        Ok(tasks)
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn push(&self, envelope: &TaskEnvelope) -> QueueResult<String> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(envelope)?;
        let message_id: String = redis::cmd("XADD")
            .arg(STREAM_KEY)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_stream_len)
            .arg("*")
            .arg("task")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(message_id)
    }

    async fn pop(&self, max: usize, timeout: Duration) -> QueueResult<Vec<QueuedTask>> {
        let mut conn = self.conn.clone();
        let reply: RedisResult<Value> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(CONSUMER_GROUP)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(max)
            .arg("BLOCK")
            .arg(timeout.as_millis() as u64)
            .arg("STREAMS")
            .arg(STREAM_KEY)
            .arg(">")
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(value) => Self::parse_xread_reply(value),
            // Nil reply: nothing arrived within the block window.
            Err(err) if err.to_string().contains("nil") => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("XACK")
            .arg(STREAM_KEY)
            .arg(CONSUMER_GROUP)
            .arg(message_id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn requeue(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        // Claim the message back with zero idle time so another consumer's
        // XREADGROUP on pending entries can redeliver it immediately.
        let _: Value = redis::cmd("XCLAIM")
            .arg(STREAM_KEY)
            .arg(CONSUMER_GROUP)
            .arg(&self.consumer_name)
            .arg(0)
            .arg(message_id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
