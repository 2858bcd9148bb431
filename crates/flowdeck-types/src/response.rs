//! Response envelopes for action execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::InputBag;

/// Transport status reported by the engine for a processed job.
///
/// This is orthogonal to whether the *action* succeeded: a broken action
/// still yields `Ok` with a failed [`ExecuteActionResponse`]. Non-`Ok`
/// statuses mean the engine itself could not produce a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineResponseStatus {
    /// The engine ran the operation to a verdict.
    Ok,
    /// The engine faulted before producing a verdict.
    Error,
    /// No response arrived before the submission deadline.
    Timeout,
    /// The engine was killed for exceeding its memory budget.
    MemoryIssue,
}

impl std::fmt::Display for EngineResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
            Self::MemoryIssue => "MEMORY_ISSUE",
        };
        f.write_str(s)
    }
}

/// Envelope pairing a transport status with the engine's payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResponse<T> {
    /// Transport-level status.
    pub status: EngineResponseStatus,
    /// The payload; meaningful when `status` is [`EngineResponseStatus::Ok`].
    pub response: T,
}

impl<T> EngineResponse<T> {
    /// Wrap a payload with an `Ok` status.
    pub fn ok(response: T) -> Self {
        Self {
            status: EngineResponseStatus::Ok,
            response,
        }
    }
}

/// Result of invoking a single action entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The action ran to completion.
    Success {
        /// Whatever the action returned.
        output: Value,
    },
    /// The action raised a fault.
    Failure {
        /// The fault's message, stringified if unstructured.
        message: String,
    },
}

/// The response returned to the caller of a direct action execution.
///
/// Always delivered with HTTP 200 / engine status `Ok`; `success: false`
/// is a data-level outcome, not a protocol error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActionResponse {
    /// Whether the action ran to completion.
    pub success: bool,
    /// The raw input the caller supplied (echoed back for diagnosis).
    pub input: InputBag,
    /// The action's output, `null` on failure.
    pub output: Value,
    /// Failure description when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecuteActionResponse {
    /// Build a success response.
    pub fn success(input: InputBag, output: Value) -> Self {
        Self {
            success: true,
            input,
            output,
            message: None,
        }
    }

    /// Build a failure response with a null output.
    pub fn failure(input: InputBag, message: impl Into<String>) -> Self {
        Self {
            success: false,
            input,
            output: Value::Null,
            message: Some(message.into()),
        }
    }

    /// Build a response from an execution outcome.
    pub fn from_outcome(input: InputBag, outcome: ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Success { output } => Self::success(input, output),
            ExecutionOutcome::Failure { message } => Self::failure(input, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(EngineResponseStatus::Ok.to_string(), "OK");
        assert_eq!(EngineResponseStatus::Timeout.to_string(), "TIMEOUT");
        assert_eq!(EngineResponseStatus::MemoryIssue.to_string(), "MEMORY_ISSUE");
    }

    #[test]
    fn failure_response_has_null_output_and_message() {
        let resp = ExecuteActionResponse::failure(InputBag::new(), "rate limited");
        assert!(!resp.success);
        assert_eq!(resp.output, Value::Null);
        assert_eq!(resp.message.as_deref(), Some("rate limited"));
    }

    #[test]
    fn message_is_omitted_on_success() {
        let resp = ExecuteActionResponse::success(InputBag::new(), serde_json::json!(1));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("message").is_none());
    }
}
