//! Arithmetic tools: add, subtract, multiply, divide.
//!
//! Each takes two integers `a` and `b`. Integer results use checked
//! arithmetic so overflow comes back as a tool error rather than wrapping.
//! Division returns a float and refuses a zero divisor.

use agentloop_core::error::ToolError;
use agentloop_core::schema::{ParamKind, ParamSpec, ParameterSchema, ToolArgs};
use agentloop_core::tool::Tool;
use async_trait::async_trait;
use serde_json::Value;

/// The `a`, `b` integer pair shared by every arithmetic tool.
fn operand_schema() -> ParameterSchema {
    ParameterSchema::new()
        .param(ParamSpec::required("a", ParamKind::Integer, "First operand"))
        .param(ParamSpec::required("b", ParamKind::Integer, "Second operand"))
}

fn operands(args: &ToolArgs) -> Result<(i64, i64), ToolError> {
    Ok((args.i64("a")?, args.i64("b")?))
}

fn overflow(op: &str, a: i64, b: i64) -> ToolError {
    ToolError::ExecutionFailed(format!("Integer overflow computing {a} {op} {b}."))
}

pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two integers and return the sum."
    }

    fn parameters(&self) -> ParameterSchema {
        operand_schema()
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let (a, b) = operands(&args)?;
        a.checked_add(b)
            .map(Value::from)
            .ok_or_else(|| overflow("+", a, b))
    }
}

pub struct SubtractTool;

#[async_trait]
impl Tool for SubtractTool {
    fn name(&self) -> &str {
        "subtract"
    }

    fn description(&self) -> &str {
        "Subtract b from a and return the difference."
    }

    fn parameters(&self) -> ParameterSchema {
        operand_schema()
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let (a, b) = operands(&args)?;
        a.checked_sub(b)
            .map(Value::from)
            .ok_or_else(|| overflow("-", a, b))
    }
}

pub struct MultiplyTool;

#[async_trait]
impl Tool for MultiplyTool {
    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "Multiply two integers and return the product."
    }

    fn parameters(&self) -> ParameterSchema {
        operand_schema()
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let (a, b) = operands(&args)?;
        a.checked_mul(b)
            .map(Value::from)
            .ok_or_else(|| overflow("*", a, b))
    }
}

pub struct DivideTool;

#[async_trait]
impl Tool for DivideTool {
    fn name(&self) -> &str {
        "divide"
    }

    fn description(&self) -> &str {
        "Divide a by b and return the quotient as a float. Fails on division by zero."
    }

    fn parameters(&self) -> ParameterSchema {
        operand_schema()
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let (a, b) = operands(&args)?;
        if b == 0 {
            return Err(ToolError::ExecutionFailed(
                "Division by zero is not allowed.".into(),
            ));
        }
        // Always finite here: b != 0 and both sides fit in f64's range.
        Ok(Value::from(a as f64 / b as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(tool: &dyn Tool, args: Value) -> Result<Value, ToolError> {
        let args = tool.parameters().validate(&args).unwrap();
        tool.execute(args).await
    }

    #[tokio::test]
    async fn basic_operations() {
        assert_eq!(run(&AddTool, json!({"a": 2, "b": 3})).await.unwrap(), json!(5));
        assert_eq!(run(&SubtractTool, json!({"a": 2, "b": 3})).await.unwrap(), json!(-1));
        assert_eq!(run(&MultiplyTool, json!({"a": 5, "b": 4})).await.unwrap(), json!(20));
        assert_eq!(run(&DivideTool, json!({"a": 10, "b": 4})).await.unwrap(), json!(2.5));
    }

    #[tokio::test]
    async fn divide_returns_float() {
        let v = run(&DivideTool, json!({"a": 20, "b": 5})).await.unwrap();
        assert_eq!(v.as_f64(), Some(4.0));
        assert!(v.is_f64());
    }

    #[tokio::test]
    async fn divide_by_zero_is_a_clean_error() {
        let err = run(&DivideTool, json!({"a": 10, "b": 0})).await.unwrap_err();
        assert_eq!(
            err,
            ToolError::ExecutionFailed("Division by zero is not allowed.".into())
        );
    }

    #[tokio::test]
    async fn overflow_is_an_error() {
        let err = run(&AddTool, json!({"a": i64::MAX, "b": 1})).await.unwrap_err();
        assert!(err.to_string().contains("overflow"));
        assert!(run(&MultiplyTool, json!({"a": i64::MIN, "b": -1})).await.is_err());
    }

    #[tokio::test]
    async fn coerced_arguments() {
        assert_eq!(
            run(&AddTool, json!({"a": "2", "b": 3.0})).await.unwrap(),
            json!(5)
        );
    }

    #[test]
    fn schema_requires_both_operands() {
        let schema = AddTool.parameters().to_json_schema();
        assert_eq!(schema["required"], json!(["a", "b"]));
        assert_eq!(schema["properties"]["a"]["type"], "integer");
    }
}
