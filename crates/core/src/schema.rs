//! Typed parameter schemas for tools.
//!
//! A tool declares its parameters as a flat list of named, typed fields.
//! The schema does two jobs: it renders itself as JSON Schema for the model,
//! and it validates (and coerces) the arguments the model sends back before
//! the tool body ever sees them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// The primitive type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Coerce a JSON value into this kind.
    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (ParamKind::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::from(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(format!("expected an integer, got {n}")),
                }
            }
            (ParamKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected an integer, got \"{s}\"")),

            (ParamKind::Number, Value::Number(_)) => Ok(value.clone()),
            (ParamKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected a number, got \"{s}\"")),

            (ParamKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (ParamKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("expected a boolean, got \"{s}\"")),
            },

            (ParamKind::String, Value::String(_)) => Ok(value.clone()),
            (ParamKind::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ParamKind::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (kind, other) => Err(format!(
                "expected {} {}, got {}",
                if matches!(kind, ParamKind::Integer) { "an" } else { "a" },
                kind.as_str(),
                json_type_name(other)
            )),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// The full parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: add a parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Render as a JSON Schema object, as expected by function-calling APIs.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            properties.insert(
                p.name.clone(),
                serde_json::json!({
                    "type": p.kind.as_str(),
                    "description": p.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate and coerce raw arguments.
    ///
    /// `null` is treated as an empty object. Fields the schema does not
    /// declare are dropped. On failure, returns the reason as a short
    /// human-readable string.
    pub fn validate(&self, arguments: &Value) -> Result<ToolArgs, String> {
        let empty = Map::new();
        let raw = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => return Err(format!("arguments must be an object, got {}", json_type_name(other))),
        };

        let mut validated = Map::new();
        for p in &self.params {
            match raw.get(&p.name) {
                None | Some(Value::Null) if p.required => {
                    return Err(format!("missing required field '{}'", p.name));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    let coerced = p
                        .kind
                        .coerce(value)
                        .map_err(|reason| format!("field '{}': {reason}", p.name))?;
                    validated.insert(p.name.clone(), coerced);
                }
            }
        }
        Ok(ToolArgs(validated))
    }
}

/// Arguments that passed schema validation.
///
/// Getters only fail if the tool asks for a field it did not declare (or an
/// optional one that was omitted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    fn missing(name: &str) -> ToolError {
        ToolError::ExecutionFailed(format!("argument '{name}' was not provided"))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        self.0.get(name).and_then(Value::as_i64).ok_or_else(|| Self::missing(name))
    }

    pub fn f64(&self, name: &str) -> Result<f64, ToolError> {
        self.0.get(name).and_then(Value::as_f64).ok_or_else(|| Self::missing(name))
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.0.get(name).and_then(Value::as_str).ok_or_else(|| Self::missing(name))
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        self.0.get(name).and_then(Value::as_bool).ok_or_else(|| Self::missing(name))
    }
}
