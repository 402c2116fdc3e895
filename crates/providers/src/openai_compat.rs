//! OpenAI-compatible provider implementation.
//!
//! Works with: Ollama, OpenAI, OpenRouter, vLLM, llama.cpp server, and any
//! other endpoint exposing `/chat/completions` with function calling.
//!
//! One request per model call, no streaming. Tool-call arguments come back
//! as JSON-encoded strings; they are decoded here so the rest of the loop
//! only ever sees structured arguments.

use agentloop_core::error::ProviderError;
use agentloop_core::message::{Message, Role, ToolCall};
use agentloop_core::provider::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// An OpenAI-compatible model gateway.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert the system directive plus history to OpenAI API format.
    fn to_api_messages(system: &Message, messages: &[Message]) -> Vec<ApiMessage> {
        std::iter::once(system)
            .chain(messages.iter())
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::Human => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Decode the tool calls of a response message.
    ///
    /// Arguments arrive as a JSON string (OpenAI) or, from some servers, as
    /// an inline object. Anything that does not decode to an object is a
    /// malformed response.
    fn decode_tool_calls(calls: Vec<ApiResponseToolCall>) -> Result<Vec<ToolCall>, ProviderError> {
        calls
            .into_iter()
            .map(|tc| {
                let arguments = match tc.function.arguments {
                    serde_json::Value::String(s) if s.trim().is_empty() => serde_json::json!({}),
                    serde_json::Value::String(s) => serde_json::from_str(&s).map_err(|e| {
                        ProviderError::MalformedResponse(format!(
                            "arguments for '{}' are not valid JSON: {e}",
                            tc.function.name
                        ))
                    })?,
                    serde_json::Value::Null => serde_json::json!({}),
                    other => other,
                };
                if !arguments.is_object() {
                    return Err(ProviderError::MalformedResponse(format!(
                        "arguments for '{}' are not a JSON object",
                        tc.function.name
                    )));
                }
                let id = tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                Ok(ToolCall {
                    id,
                    name: tc.function.name,
                    arguments,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.system, &request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(provider = %self.name, model = %request.model, messages = request.messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        Self::into_provider_response(api_response)
    }
}

impl OpenAiCompatProvider {
    fn into_provider_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        if let Some(role) = choice.message.role.as_deref() {
            if role != "assistant" {
                return Err(ProviderError::MalformedResponse(format!(
                    "expected an assistant message, got role '{role}'"
                )));
            }
        }

        let tool_calls = Self::decode_tool_calls(choice.message.tool_calls.unwrap_or_default())?;
        let message = Message::assistant_with_tool_calls(
            choice.message.content.unwrap_or_default(),
            tool_calls,
        );

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model.unwrap_or_default(),
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ApiResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ApiResponseFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Result<ProviderResponse, ProviderError> {
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        OpenAiCompatProvider::into_provider_response(api)
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url().contains("localhost:11434"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://host:8080/v1/", "");
        assert_eq!(provider.base_url(), "http://host:8080/v1");
    }

    #[test]
    fn system_directive_goes_first() {
        let system = Message::system("You are helpful");
        let messages = vec![Message::human("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&system, &messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn outbound_tool_calls_encode_arguments_as_string() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "add", serde_json::json!({"a": 2, "b": 3}))],
        );
        let api = OpenAiCompatProvider::to_api_messages(&Message::system(""), &[msg]);
        let tc = api[1].tool_calls.as_ref().unwrap();
        assert_eq!(tc[0].function.name, "add");
        let decoded: serde_json::Value = serde_json::from_str(&tc[0].function.arguments).unwrap();
        assert_eq!(decoded, serde_json::json!({"a": 2, "b": 3}));
    }

    #[test]
    fn tool_response_keeps_call_id() {
        let msg = Message::tool_result("call_1", "add", "5");
        let api = OpenAiCompatProvider::to_api_messages(&Message::system(""), &[msg]);
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "divide".into(),
            description: "Divide a by b".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "divide");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn parses_text_response() {
        let resp = parse(
            r#"{"model":"qwen3:0.6b","choices":[{"message":{"role":"assistant","content":"Hi!"}}],
               "usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
        )
        .unwrap();
        assert_eq!(resp.message.role, Role::Assistant);
        assert_eq!(resp.message.content, "Hi!");
        assert!(resp.message.tool_calls.is_empty());
        assert_eq!(resp.usage.unwrap().total_tokens, 12);
        assert_eq!(resp.model, "qwen3:0.6b");
    }

    #[test]
    fn parses_tool_call_response() {
        let resp = parse(
            r#"{"model":"m","choices":[{"message":{"role":"assistant","content":null,"tool_calls":[
                {"id":"call_a","type":"function","function":{"name":"add","arguments":"{\"a\":99,\"b\":66}"}},
                {"id":"call_b","type":"function","function":{"name":"multiply","arguments":{"a":165,"b":2}}}
            ]}}]}"#,
        )
        .unwrap();
        let calls = &resp.message.tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments["a"], 99);
        assert_eq!(calls[1].name, "multiply");
        assert_eq!(calls[1].arguments["b"], 2);
        assert_eq!(resp.message.content, "");
    }

    #[test]
    fn missing_call_id_is_generated() {
        let resp = parse(
            r#"{"choices":[{"message":{"tool_calls":[{"function":{"name":"add","arguments":"{}"}}]}}]}"#,
        )
        .unwrap();
        assert!(resp.message.tool_calls[0].id.starts_with("call_"));
    }

    #[test]
    fn undecodable_arguments_are_malformed() {
        let err = parse(
            r#"{"choices":[{"message":{"tool_calls":[{"id":"c","function":{"name":"add","arguments":"{a: 1"}}]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));

        let err = parse(
            r#"{"choices":[{"message":{"tool_calls":[{"id":"c","function":{"name":"add","arguments":"[1,2]"}}]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn empty_choices_are_malformed() {
        let err = parse(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn non_assistant_role_is_malformed() {
        let err = parse(r#"{"choices":[{"message":{"role":"user","content":"?"}}]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
