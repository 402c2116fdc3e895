//! `agentloop chat`: Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use agentloop_agent::AgentLoop;
use agentloop_config::AppConfig;
use agentloop_core::event::{DomainEvent, EventBus};
use agentloop_core::history::HistoryStore;
use agentloop_core::message::{Conversation, Message};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

pub struct ChatOptions {
    pub message: Option<String>,
    pub session: Option<String>,
    pub ephemeral: bool,
    pub show_tools: bool,
}

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Empty,
    Exit,
    Save,
    History,
    Message(String),
}

/// `exit` and `quit` end the session (any case); `/save` and `/history`
/// are local commands; anything else goes to the agent.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line.to_lowercase().as_str() {
        "exit" | "quit" => Input::Exit,
        "/save" => Input::Save,
        "/history" => Input::History,
        _ => Input::Message(line.to_string()),
    }
}

pub async fn run(opts: ChatOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = agentloop_providers::build_from_config(&config)?;
    let tools = Arc::new(agentloop_tools::default_registry());
    let event_bus = Arc::new(EventBus::default());
    if opts.show_tools {
        spawn_tool_printer(&event_bus);
    }
    let agent = AgentLoop::from_config(&config, provider, tools, event_bus);

    let store = super::history::open_store(&config, opts.session.as_deref(), opts.ephemeral)?;
    let conversation = store.load().await?;

    match opts.message {
        Some(msg) => single_message(&agent, store.as_ref(), conversation, msg).await,
        None => interactive(&agent, &config, store.as_ref(), conversation).await,
    }
}

async fn single_message(
    agent: &AgentLoop,
    store: &dyn HistoryStore,
    conversation: Conversation,
    msg: String,
) -> Result<(), Box<dyn std::error::Error>> {
    eprint!("  Thinking...");
    let result = agent.run_turn(&conversation, Message::human(msg)).await;
    eprint!("\r              \r");

    let outcome = result?;
    println!("{}", outcome.reply_text());
    store.save(&outcome.conversation).await?;
    Ok(())
}

async fn interactive(
    agent: &AgentLoop,
    config: &AppConfig,
    store: &dyn HistoryStore,
    mut conversation: Conversation,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  agentloop: Interactive Mode");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", agent.model());
    println!("  Tools:     {}", agent.tools().names().join(", "));
    println!("  History:   {}", store.name());
    println!();
    if conversation.is_empty() {
        println!("  Starting a new conversation.");
    } else {
        println!("  Loaded {} messages from previous sessions.", conversation.len());
    }
    println!("  Type 'exit' or 'quit' to end the chat. /save saves now, /history shows the count.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::Save => match store.save(&conversation).await {
                Ok(()) => println!("  Saved {} messages.", conversation.len()),
                Err(e) => eprintln!("  [Error] {e}"),
            },
            Input::History => {
                println!("  {} messages in this conversation.", conversation.len())
            }
            Input::Message(text) => {
                eprint!("  ...");
                let result = agent.run_turn(&conversation, Message::human(text)).await;
                eprint!("\r     \r");

                match result {
                    Ok(outcome) => {
                        println!();
                        for line in outcome.reply_text().lines() {
                            println!("  AI > {line}");
                        }
                        println!();
                        conversation = outcome.conversation;

                        if config.history.autosave {
                            if let Err(e) = store.save(&conversation).await {
                                warn!(error = %e, "Autosave failed");
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
    }

    println!("  Saving conversation history...");
    store.save(&conversation).await?;
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Print each tool execution as it happens.
fn spawn_tool_printer(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let DomainEvent::ToolExecuted {
                        tool_name,
                        arguments,
                        output,
                        success,
                        duration_ms,
                        ..
                    } = event.as_ref()
                    {
                        let mark = if *success { "ok" } else { "failed" };
                        eprintln!("  [tool] {tool_name}({arguments}) -> {output} ({mark}, {duration_ms}ms)");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}
