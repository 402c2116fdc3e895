//! The agent reasoning loop implementation.

use std::sync::Arc;

use agentloop_config::AppConfig;
use agentloop_core::error::{ContractViolation, Error, Result};
use agentloop_core::event::{DomainEvent, EventBus};
use agentloop_core::message::{Conversation, Message, Role};
use agentloop_core::provider::{DEFAULT_SYSTEM_PROMPT, Provider, ProviderRequest};
use agentloop_core::routing::Phase;
use agentloop_core::tool::ToolRegistry;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dispatcher::ToolDispatcher;

/// The result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The conversation with every message of the turn merged in
    pub conversation: Conversation,

    /// Tool round trips taken
    pub iterations: u32,

    /// Tool calls executed across the turn
    pub tool_calls_made: usize,
}

impl TurnOutcome {
    /// The terminal assistant message.
    pub fn reply(&self) -> Option<&Message> {
        self.conversation.last()
    }

    /// Text of the terminal assistant message.
    pub fn reply_text(&self) -> &str {
        self.reply().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    /// The model gateway
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Sent ahead of the history on every call, never stored in it
    system_prompt: String,

    /// Tool execution
    dispatcher: ToolDispatcher,

    /// Maximum tool round trips per turn
    max_iterations: u32,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            dispatcher: ToolDispatcher::new(tools).with_event_bus(event_bus.clone()),
            max_iterations: 25,
            event_bus,
        }
    }

    /// Build a loop from the application config.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let mut agent = Self::new(provider, config.model.clone(), tools, event_bus)
            .with_temperature(config.temperature)
            .with_system_prompt(config.agent.system_prompt.clone())
            .with_max_iterations(config.agent.max_iterations)
            .with_parallel_tools(config.agent.parallel_tools);
        if let Some(max) = config.max_tokens {
            agent = agent.with_max_tokens(max);
        }
        agent
    }

    /// Set the maximum number of tool round trips per turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Run the calls of each batch concurrently.
    pub fn with_parallel_tools(mut self, parallel: bool) -> Self {
        self.dispatcher = self.dispatcher.with_parallel(parallel);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.dispatcher.tools()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one turn: merge `input`, then alternate model calls and tool
    /// dispatch until the model answers without tool calls.
    ///
    /// The caller's conversation is never modified. On success the returned
    /// outcome holds the extended conversation; on failure nothing from the
    /// turn survives.
    pub async fn run_turn(
        &self,
        conversation: &Conversation,
        input: Message,
    ) -> Result<TurnOutcome> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            "Processing turn"
        );
        self.event_bus.publish(DomainEvent::TurnStarted {
            conversation_id: conversation.id.to_string(),
            content_preview: input.content.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        match self.drive(conversation, input).await {
            Ok(outcome) => {
                info!(
                    conversation_id = %conversation.id,
                    iterations = outcome.iterations,
                    tool_calls = outcome.tool_calls_made,
                    "Turn completed"
                );
                self.event_bus.publish(DomainEvent::TurnCompleted {
                    conversation_id: conversation.id.to_string(),
                    iterations: outcome.iterations,
                    tool_calls_made: outcome.tool_calls_made,
                    timestamp: Utc::now(),
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "Turn failed");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("turn in conversation {}", conversation.id),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&self, conversation: &Conversation, input: Message) -> Result<TurnOutcome> {
        if input.role != Role::Human {
            return Err(ContractViolation::UnexpectedInputRole(input.role.to_string()).into());
        }
        conversation.check_tool_replies(std::slice::from_ref(&input))?;

        let mut conv = conversation.clone().merge([input]);
        let tool_definitions = self.dispatcher.tools().definitions();
        let mut phase = Phase::initial();
        let mut iterations = 0u32;
        let mut tool_calls_made = 0usize;

        while !phase.is_done() {
            match phase {
                Phase::Agent => {
                    let request = ProviderRequest {
                        model: self.model.clone(),
                        system: Message::system(&self.system_prompt),
                        messages: conv.messages().to_vec(),
                        temperature: self.temperature,
                        max_tokens: self.max_tokens,
                        tools: tool_definitions.clone(),
                    };

                    let response = self.provider.complete(request).await?;
                    if response.message.role != Role::Assistant {
                        return Err(ContractViolation::UnexpectedResponseRole(
                            response.message.role.to_string(),
                        )
                        .into());
                    }

                    debug!(
                        conversation_id = %conv.id,
                        tool_calls = response.message.tool_calls.len(),
                        "Model responded"
                    );
                    self.event_bus.publish(DomainEvent::ResponseGenerated {
                        conversation_id: conv.id.to_string(),
                        model: response.model.clone(),
                        tool_calls: response.message.tool_calls.len(),
                        tokens_used: response.usage.map(|u| u.total_tokens),
                        timestamp: Utc::now(),
                    });

                    conv = conv.merge([response.message]);
                }
                Phase::Tools => {
                    iterations += 1;
                    if iterations > self.max_iterations {
                        return Err(Error::IterationLimit {
                            limit: self.max_iterations,
                        });
                    }

                    let calls = conv
                        .last()
                        .map(|m| m.tool_calls.clone())
                        .unwrap_or_default();
                    debug!(conversation_id = %conv.id, iteration = iterations, count = calls.len(), "Executing tool calls");

                    let replies = self.dispatcher.dispatch(&calls).await?;
                    conv.check_tool_replies(&replies)?;
                    tool_calls_made += replies.len();
                    conv = conv.merge(replies);
                }
                Phase::Done => break,
            }
            phase = phase.advance(&conv)?;
        }

        Ok(TurnOutcome {
            conversation: conv,
            iterations,
            tool_calls_made,
        })
    }
}
