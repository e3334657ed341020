use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome discriminant of a completed `execute_tool` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// The tool ran and returned normally.
    Success,
    /// The tool ran but reported a failure.
    Error,
    /// The Security Gate's decision prevented execution.
    Blocked,
    /// Output was truncated by the Executor's compression step.
    Partial,
    /// Execution was canceled before completion (timeout, shutdown).
    Canceled,
}

/// The structured result of one `execute_tool` call, returned over MCP as
/// the tool's result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Outcome discriminant.
    pub status: ToolStatus,
    /// Successful or partial output, already passed through the
    /// Executor's compression budget.
    pub data: Option<serde_json::Value>,
    /// Machine-readable error code from the §7 error taxonomy, present
    /// whenever `status` is not `Success`.
    pub error_code: Option<String>,
    /// Human-readable error message.
    pub error_message: Option<String>,
    /// Execution metadata: timing, truncation markers, the resolved
    /// fully-qualified tool name.
    pub metadata: HashMap<String, String>,
    /// Wall-clock time the response was produced.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ToolResponse {
    /// Builds a successful response.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: ToolStatus::Success,
            data: Some(data),
            error_code: None,
            error_message: None,
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Builds an error response for the given `§7` error code.
    pub fn error(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            data: None,
            error_code: Some(error_code.into()),
            error_message: Some(message.into()),
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Builds a response for a Security Gate block.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Blocked,
            data: None,
            error_code: Some("SECURITY_BLOCKED".to_string()),
            error_message: Some(reason.into()),
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Attaches a metadata field, returning `self` for chaining.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
