//! Tool dispatcher: registry of name → `{ schema, handler }`,
//! dispatch with a per-call deadline and a cancellation path. Mirrors the
//! donor `ToolRouter::dispatch_to_node`'s oneshot-reply-plus-timeout shape,
//! but for an in-process async handler instead of a remote node, and adds
//! an `InFlightCalls` map keyed by call id (rather than node id) so an
//! upstream cancellation list can abort exactly the matching tasks.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vsg_domain::tool::{ToolCall, ToolResult};

use crate::schema::{self, Schema};
use crate::sanitize::sanitize_error_text;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> std::result::Result<Value, String>;
}

pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: Schema,
    pub handler: Arc<dyn ToolHandler>,
}

pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
    in_flight: parking_lot::Mutex<HashMap<String, CancellationToken>>,
    default_timeout: Duration,
}

/// `None` means the call was cancelled: no response
/// is sent upstream for a cancelled call.
pub type DispatchOutcome = Option<ToolResult>;

impl ToolRegistry {
    pub fn new(default_timeout: Duration) -> Self {
        ToolRegistry {
            tools: HashMap::new(),
            in_flight: parking_lot::Mutex::new(HashMap::new()),
            default_timeout,
        }
    }

    pub fn register(&mut self, definition: ToolDefinition) {
        self.tools.insert(definition.name.clone(), definition);
    }

    pub fn declarations(&self) -> Vec<(&str, &str, &Schema)> {
        self.tools
            .values()
            .map(|t| (t.name.as_str(), t.description.as_str(), &t.schema))
            .collect()
    }

    pub async fn dispatch(&self, call: &ToolCall) -> DispatchOutcome {
        let Some(def) = self.tools.get(&call.tool_name) else {
            tracing::warn!(call_id = %call.call_id, tool = %call.tool_name, "tool not found");
            return Some(ToolResult::failure(
                call.call_id.clone(),
                sanitize_error_text(&format!("unknown tool '{}'", call.tool_name)),
            ));
        };

        let violations = schema::validate(&def.schema, &call.arguments);
        if !violations.is_empty() {
            tracing::warn!(call_id = %call.call_id, tool = %call.tool_name, ?violations, "invalid tool arguments");
            return Some(ToolResult::failure(
                call.call_id.clone(),
                sanitize_error_text(&violations.join("; ")),
            ));
        }

        let token = CancellationToken::new();
        self.in_flight.lock().insert(call.call_id.clone(), token.clone());

        let handler = def.handler.clone();
        let args = call.arguments.clone();
        let call_id = call.call_id.clone();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!(call_id = %call_id, "tool call cancelled");
                None
            }
            res = tokio::time::timeout(self.default_timeout, handler.call(args)) => {
                Some(match res {
                    Ok(Ok(value)) => ToolResult::success(call_id.clone(), value),
                    Ok(Err(raw_error)) => {
                        tracing::warn!(call_id = %call_id, "tool execution error");
                        ToolResult::failure(call_id.clone(), sanitize_error_text(&raw_error))
                    }
                    Err(_elapsed) => {
                        tracing::warn!(call_id = %call_id, timeout = ?self.default_timeout, "tool call timed out");
                        ToolResult::failure(call_id.clone(), "the tool call took too long to respond")
                    }
                })
            }
        };

        self.in_flight.lock().remove(&call_id);
        outcome
    }

    pub fn cancel(&self, call_id: &str) {
        if let Some(token) = self.in_flight.lock().get(call_id) {
            token.cancel();
        }
    }

    pub fn cancel_all(&self, call_ids: &[String]) {
        for id in call_ids {
            self.cancel(id);
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vsg_domain::tool::ToolCall;

    struct EchoHandler;
    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, arguments: Value) -> std::result::Result<Value, String> {
            Ok(arguments)
        }
    }

    struct SleepyHandler(Duration);
    #[async_trait]
    impl ToolHandler for SleepyHandler {
        async fn call(&self, _arguments: Value) -> std::result::Result<Value, String> {
            tokio::time::sleep(self.0).await;
            Ok(json!({"ok": true}))
        }
    }

    struct FailingHandler;
    #[async_trait]
    impl ToolHandler for FailingHandler {
        async fn call(&self, _arguments: Value) -> std::result::Result<Value, String> {
            Err("  at /internal/path.rs:10:1\ndb write failed".to_string())
        }
    }

    fn registry_with(name: &str, handler: Arc<dyn ToolHandler>, timeout: Duration) -> ToolRegistry {
        let mut registry = ToolRegistry::new(timeout);
        registry.register(ToolDefinition {
            name: name.to_string(),
            description: "test tool".to_string(),
            schema: Schema::Object {
                properties: HashMap::new(),
                required: vec![],
            },
            handler,
        });
        registry
    }

    #[tokio::test]
    async fn unknown_tool_returns_failure() {
        let registry = registry_with("known", Arc::new(EchoHandler), Duration::from_secs(1));
        let call = ToolCall::new("c1", "unknown", json!({}));
        let outcome = registry.dispatch(&call).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn successful_call_returns_handler_result() {
        let registry = registry_with("echo", Arc::new(EchoHandler), Duration::from_secs(1));
        let call = ToolCall::new("c1", "echo", json!({"x": 1}));
        let outcome = registry.dispatch(&call).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.result, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn timeout_yields_sanitized_failure() {
        let registry = registry_with(
            "slow",
            Arc::new(SleepyHandler(Duration::from_millis(50))),
            Duration::from_millis(10),
        );
        let call = ToolCall::new("c1", "slow", json!({}));
        let outcome = registry.dispatch(&call).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn handler_error_is_sanitized() {
        let registry = registry_with("fail", Arc::new(FailingHandler), Duration::from_secs(1));
        let call = ToolCall::new("c1", "fail", json!({}));
        let outcome = registry.dispatch(&call).await.unwrap();
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(!error.contains("/internal"));
        assert!(!error.contains(".rs:"));
    }

    #[tokio::test]
    async fn cancellation_suppresses_the_response() {
        let registry = Arc::new(registry_with(
            "slow",
            Arc::new(SleepyHandler(Duration::from_millis(200))),
            Duration::from_secs(5),
        ));
        let call = ToolCall::new("c1", "slow", json!({}));
        let registry_clone = registry.clone();
        let handle = tokio::spawn(async move { registry_clone.dispatch(&call).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.cancel("c1");

        let outcome = handle.await.unwrap();
        assert!(outcome.is_none());
    }
}
