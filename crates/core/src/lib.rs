//! # agentloop core
//!
//! Domain types, traits, and error definitions for the agentloop runtime.
//! This crate has **no I/O of its own**. It defines the domain model that
//! the provider, tool, history and agent crates implement against.
//!
//! The pieces, leaves first:
//! - [`Message`] / [`Conversation`] with the append-only [`Conversation::merge`] reducer
//! - [`Tool`] / [`ToolRegistry`] with typed [`ParameterSchema`]s
//! - [`Provider`], the model gateway boundary
//! - [`routing`], the AGENT → TOOLS → DONE state machine
//! - [`HistoryStore`], the persistence boundary

pub mod error;
pub mod event;
pub mod history;
pub mod message;
pub mod provider;
pub mod routing;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ContractViolation, Error, HistoryError, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use history::{HistoryStore, is_valid_session_name};
pub use message::{Conversation, ConversationId, Message, Role, ToolCall};
pub use provider::{
    DEFAULT_SYSTEM_PROMPT, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage,
};
pub use routing::{Phase, RoutingDecision, route};
pub use schema::{ParamKind, ParamSpec, ParameterSchema, ToolArgs};
pub use tool::{FnTool, Tool, ToolRegistry};
