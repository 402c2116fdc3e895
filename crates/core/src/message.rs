//! Message and Conversation domain types.
//!
//! These are the value objects that flow through the whole loop:
//! the user submits a human message → the provider answers with an assistant
//! message → the dispatcher answers each requested tool call with a tool
//! message → everything is merged into the conversation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ContractViolation;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    Human,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call, echoed back by the tool message
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A single message in a conversation.
///
/// Messages are immutable once created; the conversation only ever appends
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default = "new_message_id")]
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content (may be empty for a pure tool request)
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// If this is a tool result, the name of the tool that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether a tool result reports a failure
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: new_message_id(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a new human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::with_role(Role::Human, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant message that requests tool execution.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::assistant(content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a successful tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(tool_name.into());
        msg
    }

    /// Create a tool message reporting a failure back to the model.
    pub fn tool_error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::tool_result(tool_call_id, tool_name, content);
        msg.is_error = true;
        msg
    }

    /// True for assistant messages that request at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// A conversation is an ordered, append-only sequence of messages.
///
/// There is no way to edit or remove a message once it is in; new messages
/// enter only through [`Conversation::merge`].
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a conversation from an already-ordered message list (e.g. a
    /// persisted history).
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut conv = Self::new();
        if let Some(first) = messages.first() {
            conv.created_at = first.timestamp;
        }
        if let Some(last) = messages.last() {
            conv.updated_at = last.timestamp;
        }
        conv.messages = messages;
        conv
    }

    /// The reducer: append `incoming` to the end, preserving its order.
    ///
    /// No deduplication, no reordering, no validation. Existing messages keep
    /// their position.
    pub fn merge(mut self, incoming: impl IntoIterator<Item = Message>) -> Self {
        let before = self.messages.len();
        self.messages.extend(incoming);
        if self.messages.len() > before {
            self.updated_at = Utc::now();
        }
        self
    }

    /// Read-only view of the history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Check that `incoming` tool messages answer calls that were issued by
    /// an assistant message earlier in this conversation (or earlier in
    /// `incoming` itself).
    pub fn check_tool_replies(&self, incoming: &[Message]) -> Result<(), ContractViolation> {
        let mut issued = self.issued_call_ids();
        check_sequence(incoming, &mut issued)
    }

    /// Check the tool-reply invariant over the whole history.
    pub fn validate(&self) -> Result<(), ContractViolation> {
        let mut issued = HashSet::new();
        check_sequence(&self.messages, &mut issued)
    }

    fn issued_call_ids(&self) -> HashSet<String> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_calls.iter().map(|tc| tc.id.clone()))
            .collect()
    }
}

fn check_sequence(
    messages: &[Message],
    issued: &mut HashSet<String>,
) -> Result<(), ContractViolation> {
    for msg in messages {
        // tool_calls belong to assistant messages, tool_call_id to tool messages
        if msg.role != Role::Assistant && !msg.tool_calls.is_empty() {
            return Err(ContractViolation::MalformedToolCall(format!(
                "{} message carries tool calls",
                msg.role
            )));
        }
        if msg.role != Role::Tool && msg.tool_call_id.is_some() {
            return Err(ContractViolation::MalformedToolCall(format!(
                "{} message carries a tool_call_id",
                msg.role
            )));
        }

        match msg.role {
            Role::Assistant => {
                issued.extend(msg.tool_calls.iter().map(|tc| tc.id.clone()));
            }
            Role::Tool => {
                let id = msg
                    .tool_call_id
                    .as_deref()
                    .ok_or(ContractViolation::MissingToolCallId)?;
                if !issued.contains(id) {
                    return Err(ContractViolation::UnknownToolCallId(id.to_string()));
                }
            }
            Role::Human | Role::System => {}
        }
    }
    Ok(())
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
