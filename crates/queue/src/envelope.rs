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

//! Task wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Task name of the main pipeline job.
pub const PROCESS_CREDIT_APPLICATION: &str = "process_credit_application";

/// W3C trace context carried with a task so worker spans join the caller's
/// trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// `traceparent` header value.
    pub traceparent: String,
    /// `tracestate` header value, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracestate: Option<String>,
}

/// A queued task: `{task_name, args, kwargs, trace_context?}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Task function to execute.
    pub task_name: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Keyword arguments.
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    /// Optional distributed-tracing context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<TraceContext>,
}

impl TaskEnvelope {
    /// Envelope for processing one application.
    pub fn process_application(application_id: Uuid) -> Self {
        Self {
            task_name: PROCESS_CREDIT_APPLICATION.to_string(),
            args: vec![Value::String(application_id.to_string())],
            kwargs: Map::new(),
            trace_context: None,
        }
    }

    /// Attach trace context.
    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace_context = Some(trace);
        self
    }

    /// First positional argument parsed as an application id, when present.
    pub fn application_id(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let id = Uuid::new_v4();
        let envelope = TaskEnvelope::process_application(id).with_trace(TraceContext {
            traceparent: "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".into(),
            tracestate: None,
        });
        let json = serde_json::to_string(&envelope).unwrap();
        let back: TaskEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
        assert_eq!(back.application_id(), Some(id.to_string().as_str()));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let envelope: TaskEnvelope =
            serde_json::from_str(r#"{"task_name":"process_credit_application"}"#).unwrap();
        assert!(envelope.args.is_empty());
        assert!(envelope.kwargs.is_empty());
        assert!(envelope.trace_context.is_none());
        assert_eq!(envelope.application_id(), None);
    }
}
