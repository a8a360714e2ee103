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

//! Application status values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a credit application.
///
/// Stored in Postgres as the `application_status` enum type; the string
/// forms here match the database labels exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Newly created, awaiting pickup by a worker.
    Pending,
    /// A worker is validating and evaluating the application.
    Validating,
    /// Evaluation could not auto-decide; a human (or webhook) must.
    UnderReview,
    /// Terminal: credit granted.
    Approved,
    /// Terminal: credit denied.
    Rejected,
    /// Terminal: withdrawn before processing finished.
    Cancelled,
    /// Terminal: post-approval settlement finished.
    Completed,
}

impl ApplicationStatus {
    /// The database enum label for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Validating => "VALIDATING",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Cancelled => "CANCELLED",
            ApplicationStatus::Completed => "COMPLETED",
        }
    }

    /// Statuses counted as "active" for the one-active-application-per-
    /// (country, document) invariant.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            ApplicationStatus::Cancelled
                | ApplicationStatus::Rejected
                | ApplicationStatus::Completed
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "VALIDATING" => Ok(ApplicationStatus::Validating),
            "UNDER_REVIEW" => Ok(ApplicationStatus::UnderReview),
            "APPROVED" => Ok(ApplicationStatus::Approved),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "CANCELLED" => Ok(ApplicationStatus::Cancelled),
            "COMPLETED" => Ok(ApplicationStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status label outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status: {0}")]
pub struct UnknownStatus(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_labels() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Validating,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::Cancelled,
            ApplicationStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_serde_matches_db_labels() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::UnderReview).unwrap(),
            "\"UNDER_REVIEW\""
        );
    }

    #[test]
    fn test_active_statuses() {
        assert!(ApplicationStatus::Pending.is_active());
        assert!(ApplicationStatus::Validating.is_active());
        assert!(ApplicationStatus::UnderReview.is_active());
        assert!(ApplicationStatus::Approved.is_active());
        assert!(!ApplicationStatus::Rejected.is_active());
        assert!(!ApplicationStatus::Cancelled.is_active());
        assert!(!ApplicationStatus::Completed.is_active());
    }
}
