//! Built-in tool implementations for agentloop.
//!
//! The reference set is integer arithmetic, enough for the model to chain
//! tool calls (compute `(2 + 3) * 4` as `add` then `multiply`).

pub mod arithmetic;

use std::sync::Arc;

use agentloop_core::tool::{Tool, ToolRegistry};

pub use arithmetic::{AddTool, DivideTool, MultiplyTool, SubtractTool};

/// All built-in tools, in registration order.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(AddTool),
        Arc::new(SubtractTool),
        Arc::new(MultiplyTool),
        Arc::new(DivideTool),
    ]
}

/// Create a registry holding every built-in tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in builtin_tools() {
        if let Err(e) = registry.register(tool) {
            // Built-in names are distinct; this only fires if that changes.
            tracing::warn!(error = %e, "Skipping built-in tool");
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_arithmetic() {
        let registry = default_registry();
        assert_eq!(registry.len(), 4);
        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["add", "divide", "multiply", "subtract"]);
    }

    #[test]
    fn registering_builtins_twice_is_rejected() {
        let mut registry = default_registry();
        assert!(registry.register(Arc::new(AddTool)).is_err());
    }
}
