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

//! Application status state machine.
//!
//! ```text
//! PENDING ──> VALIDATING ──> APPROVED
//!    │             │──> REJECTED
//!    │             └──> UNDER_REVIEW ──> APPROVED | REJECTED
//!    └──> CANCELLED
//! ```
//!
//! APPROVED, REJECTED, CANCELLED and COMPLETED are terminal: no transition
//! leaves them. No backward transitions exist. Every status write in the
//! persistence layer passes through [`validate_transition`] first, and the
//! database audit trigger records the change.

use crate::status::ApplicationStatus;

/// Allowed next statuses for a given current status.
///
/// Returns the empty slice for terminal states.
pub fn allowed_transitions(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    match from {
        ApplicationStatus::Pending => {
            &[ApplicationStatus::Validating, ApplicationStatus::Cancelled]
        }
        ApplicationStatus::Validating => &[
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::UnderReview,
        ],
        ApplicationStatus::UnderReview => {
            &[ApplicationStatus::Approved, ApplicationStatus::Rejected]
        }
        ApplicationStatus::Approved
        | ApplicationStatus::Rejected
        | ApplicationStatus::Cancelled
        | ApplicationStatus::Completed => &[],
    }
}

/// Whether a status admits no further transitions.
pub fn is_terminal(status: ApplicationStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// Validate a status transition against the table.
///
/// A same-state "transition" is a no-op and allowed (callers may re-persist
/// a row without a status change). Anything leaving a terminal state, or
/// targeting a status not in the table, is a permanent error.
pub fn validate_transition(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<(), StateTransitionError> {
    if from == to {
        return Ok(());
    }
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateTransitionError { from, to })
    }
}

/// A forbidden status transition. Permanent: retrying cannot make it legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid state transition: {from} -> {to}")]
pub struct StateTransitionError {
    /// Status the application was in.
    pub from: ApplicationStatus,
    /// Status the caller attempted to reach.
    pub to: ApplicationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_declared_transitions_allowed() {
        for (from, to) in [
            (Pending, Validating),
            (Pending, Cancelled),
            (Validating, Approved),
            (Validating, Rejected),
            (Validating, UnderReview),
            (UnderReview, Approved),
            (UnderReview, Rejected),
        ] {
            assert!(validate_transition(from, to).is_ok(), "{from} -> {to}");
        }
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        for terminal in [Approved, Rejected, Cancelled, Completed] {
            assert!(is_terminal(terminal));
            for target in [
                Pending, Validating, UnderReview, Approved, Rejected, Cancelled, Completed,
            ] {
                if target == terminal {
                    continue;
                }
                assert_eq!(
                    validate_transition(terminal, target),
                    Err(StateTransitionError {
                        from: terminal,
                        to: target
                    })
                );
            }
        }
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(validate_transition(Validating, Pending).is_err());
        assert!(validate_transition(UnderReview, Validating).is_err());
        assert!(validate_transition(UnderReview, Pending).is_err());
    }

    #[test]
    fn test_pending_cannot_skip_validation() {
        assert!(validate_transition(Pending, Approved).is_err());
        assert!(validate_transition(Pending, Rejected).is_err());
        assert!(validate_transition(Pending, UnderReview).is_err());
    }

    #[test]
    fn test_same_state_is_noop() {
        for status in [Pending, Validating, UnderReview, Approved] {
            assert!(validate_transition(status, status).is_ok());
        }
    }

    #[test]
    fn test_completed_unreachable_from_pipeline() {
        // COMPLETED is set by settlement outside this pipeline; nothing here
        // may transition into it.
        for from in [Pending, Validating, UnderReview] {
            assert!(validate_transition(from, Completed).is_err());
        }
    }
}
