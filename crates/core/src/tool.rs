//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: each one is a named,
//! schema-described callable. Tools are registered explicitly in a
//! [`ToolRegistry`]; nothing is discovered implicitly.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;
use crate::message::ToolCall;
use crate::provider::ToolDefinition;
use crate::schema::{ParameterSchema, ToolArgs};

/// The core Tool trait.
///
/// `execute` only ever sees arguments that already passed
/// [`ParameterSchema::validate`]. A domain failure is reported as
/// [`ToolError::ExecutionFailed`] with a message fit for the model to read.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "divide").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The typed parameter list.
    fn parameters(&self) -> ParameterSchema;

    /// Execute the tool with validated arguments.
    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().to_json_schema(),
        }
    }
}

type ToolFn = dyn Fn(ToolArgs) -> Result<Value, ToolError> + Send + Sync;

/// A tool backed by a plain function.
pub struct FnTool {
    name: String,
    description: String,
    parameters: ParameterSchema,
    func: Box<ToolFn>,
}

impl FnTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        func: impl Fn(ToolArgs) -> Result<Value, ToolError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> ParameterSchema {
        self.parameters.clone()
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        (self.func)(args)
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up, validate and execute tools when the LLM requests them
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique; a second tool with the same name
    /// is rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get all tool definitions (for sending to the LLM), sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Look up, validate and run a tool call.
    pub async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let args = tool
            .parameters()
            .validate(&call.arguments)
            .map_err(|reason| ToolError::InvalidArguments {
                tool_name: call.name.clone(),
                reason,
            })?;
        tool.execute(args).await
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamKind, ParamSpec};

    fn echo_tool() -> FnTool {
        FnTool::new(
            "echo",
            "Echoes back the input",
            ParameterSchema::new().param(ParamSpec::required("text", ParamKind::String, "Text to echo")),
            |args| Ok(Value::String(args.str("text")?.to_string())),
        )
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo_tool())).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo_tool())).unwrap();
        let err = registry.register(Arc::new(echo_tool())).unwrap_err();
        assert_eq!(err, ToolError::DuplicateName("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo_tool())).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["required"], serde_json::json!(["text"]));
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo_tool())).unwrap();

        let call = ToolCall::new("call_1", "echo", serde_json::json!({"text": "hello world"}));
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result, Value::String("hello world".into()));
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall::new("call_1", "nonexistent", serde_json::json!({}));
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn registry_execute_invalid_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo_tool())).unwrap();
        let call = ToolCall::new("call_1", "echo", serde_json::json!({}));
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
