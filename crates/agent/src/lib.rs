//! The agent loop: drives one conversation turn to completion.
//!
//! A turn follows the **AGENT → TOOLS → DONE** cycle:
//!
//! 1. **Receive** a human message and merge it into the conversation
//! 2. **Call the model** with the system prompt and the full history
//! 3. **If tool calls**: dispatch them, merge the results, go back to 2
//! 4. **If plain text**: the turn is done
//!
//! The loop continues until the model answers without tool calls or the
//! iteration limit is hit, which fails the turn.

pub mod dispatcher;
pub mod loop_runner;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::ToolDispatcher;
pub use loop_runner::{AgentLoop, TurnOutcome};
