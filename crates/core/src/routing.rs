//! Routing: the AGENT → TOOLS → DONE state machine.
//!
//! ```text
//!            tool_calls non-empty
//!   AGENT ───────────────────────▶ TOOLS
//!     │   ◀───────────────────────   │
//!     │      all replies merged
//!     │ tool_calls empty
//!     ▼
//!   DONE
//! ```
//!
//! The decision after every model call is made from the latest message
//! alone.

use serde::{Deserialize, Serialize};

use crate::error::ContractViolation;
use crate::message::{Conversation, Message, Role};

/// What to do after an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    DispatchTools,
    Terminate,
}

/// Decide from a single message.
pub fn decide(message: &Message) -> Result<RoutingDecision, ContractViolation> {
    if message.role != Role::Assistant {
        return Err(ContractViolation::NotAssistant(message.role.to_string()));
    }
    if message.tool_calls.is_empty() {
        Ok(RoutingDecision::Terminate)
    } else {
        Ok(RoutingDecision::DispatchTools)
    }
}

/// Decide from the latest message of a conversation.
pub fn route(conversation: &Conversation) -> Result<RoutingDecision, ContractViolation> {
    let last = conversation
        .last()
        .ok_or(ContractViolation::EmptyConversation)?;
    decide(last)
}

/// Where the loop driver currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting on the model
    Agent,
    /// Running the requested tool calls
    Tools,
    /// Turn finished
    Done,
}

impl Phase {
    /// Every turn starts by asking the model.
    pub fn initial() -> Self {
        Phase::Agent
    }

    /// Take the transition out of the current phase.
    ///
    /// From `Agent` this routes on the latest message; from `Tools` it
    /// returns to `Agent` unconditionally. `Done` is terminal.
    pub fn advance(self, conversation: &Conversation) -> Result<Phase, ContractViolation> {
        match self {
            Phase::Agent => Ok(match route(conversation)? {
                RoutingDecision::DispatchTools => Phase::Tools,
                RoutingDecision::Terminate => Phase::Done,
            }),
            Phase::Tools => Ok(Phase::Agent),
            Phase::Done => Ok(Phase::Done),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Phase::Done)
    }
}
