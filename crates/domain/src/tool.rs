//! `ToolCall` data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type CallId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: CallId,
    pub tool_name: String,
    pub arguments: Value,
    pub received_at: DateTime<Utc>,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        ToolCall {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
            received_at: Utc::now(),
        }
    }
}

/// The shape sent back upstream for a completed (or failed) tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: CallId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, result: Value) -> Self {
        ToolResult {
            call_id: call_id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(call_id: impl Into<String>, sanitized_error: impl Into<String>) -> Self {
        ToolResult {
            call_id: call_id.into(),
            success: false,
            result: None,
            error: Some(sanitized_error.into()),
        }
    }
}
