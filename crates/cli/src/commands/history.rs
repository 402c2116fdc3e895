//! `agentloop history`: inspect and manage saved conversations.

use agentloop_config::AppConfig;
use agentloop_core::history::HistoryStore;
use agentloop_core::message::Role;
use agentloop_history::{InMemoryStore, JsonFileStore};

/// Open the store for `session` (or the configured default session).
///
/// Ephemeral runs and `history.enabled = false` get an in-memory store, so
/// nothing touches the disk.
pub fn open_store(
    config: &AppConfig,
    session: Option<&str>,
    ephemeral: bool,
) -> Result<Box<dyn HistoryStore>, Box<dyn std::error::Error>> {
    if ephemeral || !config.history.enabled {
        return Ok(Box::new(InMemoryStore::new()));
    }
    Ok(Box::new(file_store(config, session)?))
}

fn file_store(
    config: &AppConfig,
    session: Option<&str>,
) -> Result<JsonFileStore, Box<dyn std::error::Error>> {
    let session = session.unwrap_or(&config.history.session);
    Ok(JsonFileStore::for_session(
        config.history.resolved_directory(),
        session,
    )?)
}

fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub async fn show(session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = file_store(&config, session.as_deref())?;
    let conversation = store.load().await?;

    if conversation.is_empty() {
        println!("No saved messages in {}", store.path().display());
        return Ok(());
    }

    println!("{} messages in {}", conversation.len(), store.path().display());
    println!();
    for msg in conversation.messages() {
        match msg.role {
            Role::Human => println!("You: {}", msg.content),
            Role::Assistant if msg.has_tool_calls() => {
                for call in &msg.tool_calls {
                    println!("AI -> {}({})", call.name, call.arguments);
                }
            }
            Role::Assistant => println!("AI: {}", msg.content),
            Role::Tool => println!(
                "   [{}] {}",
                msg.name.as_deref().unwrap_or("tool"),
                msg.content
            ),
            Role::System => println!("System: {}", msg.content),
        }
    }
    Ok(())
}

pub async fn clear(session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = file_store(&config, session.as_deref())?;
    store.clear().await?;
    println!("Cleared {}", store.path().display());
    Ok(())
}

pub fn path(session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = file_store(&config, session.as_deref())?;
    println!("{}", store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::message::{Conversation, Message};

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.history.directory = Some(dir.to_path_buf());
        config
    }

    #[tokio::test]
    async fn exit_save_keeps_unreadable_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = dir.path().join("default.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let store = open_store(&config, None, false).unwrap();
        let conversation = store.load().await.unwrap();
        assert!(conversation.is_empty());
        store.save(&conversation).await.unwrap();

        let kept: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p != &path)
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(std::fs::read_to_string(&kept[0]).unwrap(), "{ truncated");
    }

    #[tokio::test]
    async fn ephemeral_store_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let store = open_store(&config, Some("work"), true).unwrap();
        store
            .save(&Conversation::new().merge([Message::human("hi")]))
            .await
            .unwrap();

        assert_eq!(store.name(), "in_memory");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
