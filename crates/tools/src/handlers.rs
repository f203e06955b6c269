//! Demo tool handlers exercising the registry end-to-end: the happy path
//! and a slow handler that exercises the dispatch timeout.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;

use crate::registry::{ToolDefinition, ToolHandler};
use crate::schema::Schema;

pub struct RecordResponseHandler;

#[async_trait]
impl ToolHandler for RecordResponseHandler {
    async fn call(&self, arguments: Value) -> std::result::Result<Value, String> {
        let question_id = arguments
            .get("questionId")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing questionId".to_string())?;
        let answer = arguments
            .get("answer")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing answer".to_string())?;
        Ok(json!({
            "recorded": true,
            "questionId": question_id,
            "answer": answer,
        }))
    }
}

pub fn record_response_definition() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("questionId".to_string(), Schema::String { allowed: None });
    properties.insert("answer".to_string(), Schema::String { allowed: None });
    ToolDefinition {
        name: "record_response".to_string(),
        description: "Records the respondent's answer to the current question.".to_string(),
        schema: Schema::Object {
            properties,
            required: vec!["questionId".to_string(), "answer".to_string()],
        },
        handler: Arc::new(RecordResponseHandler),
    }
}

pub struct EndSurveyHandler;

#[async_trait]
impl ToolHandler for EndSurveyHandler {
    async fn call(&self, arguments: Value) -> std::result::Result<Value, String> {
        let reason = arguments
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("completed");
        Ok(json!({ "ended": true, "reason": reason }))
    }
}

pub fn end_survey_definition() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "reason".to_string(),
        Schema::String {
            allowed: Some(vec![
                "completed".to_string(),
                "user_ended".to_string(),
                "error".to_string(),
            ]),
        },
    );
    ToolDefinition {
        name: "end_survey".to_string(),
        description: "Ends the current survey session.".to_string(),
        schema: Schema::Object {
            properties,
            required: vec![],
        },
        handler: Arc::new(EndSurveyHandler),
    }
}

/// Sleeps for `delay` before succeeding — used by the tool-timeout
/// end-to-end scenario, never registered outside tests.
pub struct SleepingHandler {
    pub delay: Duration,
}

#[async_trait]
impl ToolHandler for SleepingHandler {
    async fn call(&self, _arguments: Value) -> std::result::Result<Value, String> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({ "recorded": true }))
    }
}
