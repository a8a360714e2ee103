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

//! Partition assurance.
//!
//! The heavy lifting is plpgsql (`check_and_partition_table` and friends in
//! the migrations); this module drives it for the three growth tables and
//! reports what happened. Conversion to a partitioned table happens once a
//! table crosses the row threshold; already-partitioned tables get their
//! next three monthly partitions created ahead of time.

use crate::PersistenceResult;
use serde_json::Value;
use sqlx::{PgPool, Row};

/// Row threshold that triggers conversion to a partitioned table.
pub const DEFAULT_PARTITION_THRESHOLD: i64 = 1_000_000;

/// Tables partitioned by `created_at`.
const PARTITIONABLE_TABLES: [&str; 3] = ["applications", "audit_logs", "webhook_events"];

/// Outcome of one table's partition check.
#[derive(Clone, Debug)]
pub struct PartitionCheck {
    /// Table the check ran against.
    pub table_name: String,
    /// Whether the database function succeeded.
    pub success: bool,
    /// One of `no_action_needed`, `ensure_future_partitions`,
    /// `converted_to_partitioned`.
    pub action_taken: Option<String>,
    /// Partitions created, when applicable.
    pub partitions_created: i64,
    /// Failure detail, when `success` is false.
    pub error_message: Option<String>,
}

/// Driver for the partition-maintenance database functions.
#[derive(Clone)]
pub struct PartitionMaintenance {
    pool: PgPool,
    threshold: i64,
}

impl PartitionMaintenance {
    /// Create with the default 1M-row threshold.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            threshold: DEFAULT_PARTITION_THRESHOLD,
        }
    }

    /// Override the conversion threshold.
    pub fn with_threshold(pool: PgPool, threshold: i64) -> Self {
        Self { pool, threshold }
    }

    /// Check one table, converting or extending partitions as needed.
    pub async fn check_table(&self, table: &str) -> PersistenceResult<PartitionCheck> {
        let row = sqlx::query("SELECT check_and_partition_table($1, $2, 'created_at') AS result")
            .bind(table)
            .bind(self.threshold)
            .fetch_one(&self.pool)
            .await?;
        let result: Value = row.try_get("result")?;
        Ok(PartitionCheck {
            table_name: table.to_string(),
            success: result["success"].as_bool().unwrap_or(false),
            action_taken: result["action_taken"].as_str().map(String::from),
            partitions_created: result["partitions_created"].as_i64().unwrap_or(0),
            error_message: result["error_message"].as_str().map(String::from),
        })
    }

    /// Check every partitionable table. Errors on individual tables are
    /// reported in the results, not propagated; one bad table must not stop
    /// the others.
    pub async fn run(&self) -> PersistenceResult<Vec<PartitionCheck>> {
        let mut checks = Vec::with_capacity(PARTITIONABLE_TABLES.len());
        for table in PARTITIONABLE_TABLES {
            match self.check_table(table).await {
                Ok(check) => {
                    if check.success {
                        tracing::info!(
                            table = %check.table_name,
                            action = check.action_taken.as_deref().unwrap_or("unknown"),
                            partitions_created = check.partitions_created,
                            "partition check completed"
                        );
                    } else {
                        tracing::warn!(
                            table = %check.table_name,
                            error = check.error_message.as_deref().unwrap_or("unknown"),
                            "partition check failed"
                        );
                    }
                    checks.push(check);
                }
                Err(err) => {
                    tracing::warn!(table, error = %err, "partition check errored");
                    checks.push(PartitionCheck {
                        table_name: table.to_string(),
                        success: false,
                        action_taken: None,
                        partitions_created: 0,
                        error_message: Some(err.to_string()),
                    });
                }
            }
        }
        Ok(checks)
    }
}
