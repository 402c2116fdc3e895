//! Error types for the agentloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is what a turn
//! can fail with.
//!
//! Tool failures never reach the caller of a turn. The dispatcher turns them
//! into tool-role messages and hands them back to the model instead.

use thiserror::Error;

/// The top-level error type for all agentloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model gateway errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Broken invariants ---
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Turn exceeded the limit of {limit} tool iterations")]
    IterationLimit { limit: u32 },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    NotFound(String),

    #[error("a tool named '{0}' is already registered")]
    DuplicateName(String),

    #[error("invalid arguments for '{tool_name}': {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    /// A domain failure raised by the tool body (e.g. division by zero).
    #[error("{0}")]
    ExecutionFailed(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid session name '{0}': use letters, digits, '-' or '_'")]
    InvalidSession(String),
}

/// A broken invariant between the loop driver and its collaborators.
///
/// These are never recovered from: they mean the model gateway or a caller
/// handed over data the loop cannot make sense of.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("tool message answers unknown call id '{0}'")]
    UnknownToolCallId(String),

    #[error("tool message is missing its tool_call_id")]
    MissingToolCallId,

    #[error("malformed tool call: {0}")]
    MalformedToolCall(String),

    #[error("cannot route on an empty conversation")]
    EmptyConversation,

    #[error("cannot route on a {0} message; expected an assistant message")]
    NotAssistant(String),

    #[error("model gateway returned a {0} message; expected an assistant message")]
    UnexpectedResponseRole(String),

    #[error("a turn must start with a human message, got {0}")]
    UnexpectedInputRole(String),
}
