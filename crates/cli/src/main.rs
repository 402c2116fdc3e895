//! agentloop CLI: the main entry point.
//!
//! Commands:
//! - `chat`    : Interactive chat or single-message mode
//! - `history` : Show, clear or locate a saved conversation
//! - `tools`   : List the registered tools
//! - `config`  : Print the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentloop",
    about = "agentloop: a tool-using conversational agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation to load and save (overrides history.session)
        #[arg(short, long)]
        session: Option<String>,

        /// Do not read or write any history file
        #[arg(long)]
        ephemeral: bool,

        /// Print each tool call as it runs
        #[arg(long)]
        show_tools: bool,
    },

    /// Manage saved conversations
    History {
        #[command(subcommand)]
        action: HistoryAction,

        /// Conversation to act on (overrides history.session)
        #[arg(short, long, global = true)]
        session: Option<String>,
    },

    /// List the tools available to the agent
    Tools,

    /// Print the effective configuration
    Config {
        /// Print the built-in defaults as TOML instead
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print the saved transcript
    Show,
    /// Delete the saved transcript
    Clear,
    /// Print the history file location
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            session,
            ephemeral,
            show_tools,
        } => {
            commands::chat::run(commands::chat::ChatOptions {
                message,
                session,
                ephemeral,
                show_tools,
            })
            .await?
        }
        Commands::History { action, session } => match action {
            HistoryAction::Show => commands::history::show(session).await?,
            HistoryAction::Clear => commands::history::clear(session).await?,
            HistoryAction::Path => commands::history::path(session)?,
        },
        Commands::Tools => commands::tools::run()?,
        Commands::Config { default } => commands::config_cmd::show(default)?,
    }

    Ok(())
}
