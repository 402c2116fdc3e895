//! Tool dispatch: turns a batch of tool calls into tool-role messages.
//!
//! Every call produces exactly one message, in request order. Lookup,
//! validation and execution failures all become error messages the model
//! can read; only a malformed batch is refused outright.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use agentloop_core::error::{ContractViolation, ToolError};
use agentloop_core::event::{DomainEvent, EventBus};
use agentloop_core::message::{Message, ToolCall};
use agentloop_core::tool::ToolRegistry;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

/// Executes tool calls against a registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    parallel: bool,
    event_bus: Option<Arc<EventBus>>,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            parallel: false,
            event_bus: None,
        }
    }

    /// Run the calls of a batch concurrently. Results are still returned in
    /// request order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Dispatch a batch. One tool message per call, same order as `calls`.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Result<Vec<Message>, ContractViolation> {
        check_batch(calls)?;
        debug!(count = calls.len(), parallel = self.parallel, "Dispatching tool calls");

        if self.parallel {
            Ok(join_all(calls.iter().map(|call| self.dispatch_one(call))).await)
        } else {
            let mut messages = Vec::with_capacity(calls.len());
            for call in calls {
                messages.push(self.dispatch_one(call).await);
            }
            Ok(messages)
        }
    }

    async fn dispatch_one(&self, call: &ToolCall) -> Message {
        let start = Instant::now();
        let result = self.tools.execute(&normalized(call)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (message, success) = match result {
            Ok(value) => (
                Message::tool_result(&call.id, &call.name, render(&value)),
                true,
            ),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                (Message::tool_error(&call.id, &call.name, error_text(&e)), false)
            }
        };

        debug!(tool = %call.name, success, duration_ms, "Tool executed");

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments: call.arguments.clone(),
                output: message.content.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }

        message
    }
}

/// Reject batches the dispatcher cannot answer unambiguously.
fn check_batch(calls: &[ToolCall]) -> Result<(), ContractViolation> {
    let mut seen = HashSet::new();
    for call in calls {
        if call.id.is_empty() {
            return Err(ContractViolation::MalformedToolCall(format!(
                "call to '{}' has an empty id",
                call.name
            )));
        }
        if call.name.is_empty() {
            return Err(ContractViolation::MalformedToolCall(format!(
                "call '{}' has an empty tool name",
                call.id
            )));
        }
        if !seen.insert(call.id.as_str()) {
            return Err(ContractViolation::MalformedToolCall(format!(
                "duplicate call id '{}' in one batch",
                call.id
            )));
        }
        if !(call.arguments.is_object() || call.arguments.is_null()) {
            return Err(ContractViolation::MalformedToolCall(format!(
                "arguments of call '{}' are not an object",
                call.id
            )));
        }
    }
    Ok(())
}

/// Null arguments mean "no arguments".
fn normalized(call: &ToolCall) -> ToolCall {
    if call.arguments.is_null() {
        ToolCall::new(&call.id, &call.name, Value::Object(Default::default()))
    } else {
        call.clone()
    }
}

/// Strings go out as-is; everything else as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_text(e: &ToolError) -> String {
    format!("Error: {e}")
}
