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

//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use creditcore_persistence::PersistenceError;
use serde_json::json;

/// API-level errors with their HTTP renderings.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Input failed validation; details are user-visible.
    #[error("validation failed")]
    Validation(Vec<String>),

    /// Webhook signature missing or wrong.
    #[error("invalid webhook signature")]
    Unauthorized,

    /// Referenced row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Active duplicate application.
    #[error("an active application already exists for this document")]
    Conflict,

    /// Webhook payload over the limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// Semantically invalid (unreachable webhook transition).
    #[error("{0}")]
    Unprocessable(String),

    /// Anything the client cannot fix.
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "internal error");
        }
        let body = match &self {
            ApiError::Validation(errors) => json!({
                "error": "validation_failed",
                "details": errors,
            }),
            other => json!({
                "error": other.to_string(),
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::DuplicateActiveApplication => ApiError::Conflict,
            PersistenceError::ApplicationNotFound(id) => {
                ApiError::NotFound(format!("application {id} not found"))
            }
            PersistenceError::InvalidTransition(e) => ApiError::Unprocessable(e.to_string()),
            // IdempotencyConflict is resolved by the create handler before
            // it can reach this conversion.
            other => ApiError::Internal(other.to_string()),
        }
    }
}
