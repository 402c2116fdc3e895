//! In-memory store: useful for testing and ephemeral sessions.

use agentloop_core::error::HistoryError;
use agentloop_core::history::HistoryStore;
use agentloop_core::message::{Conversation, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps the last saved message sequence in memory.
///
/// Cloning shares the underlying record, so a clone handed to the loop and
/// one kept by a test observe the same history.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    messages: Arc<RwLock<Option<Vec<Message>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), HistoryError> {
        *self.messages.write().await = Some(conversation.messages().to_vec());
        Ok(())
    }

    async fn load(&self) -> Result<Conversation, HistoryError> {
        let messages = self.messages.read().await.clone().unwrap_or_default();
        Ok(Conversation::from_messages(messages))
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        *self.messages.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_loads_empty() {
        let store = InMemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemoryStore::new();
        let conv = Conversation::new().merge([Message::human("hi"), Message::assistant("hello")]);
        store.save(&conv).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.messages(), conv.messages());
    }

    #[tokio::test]
    async fn clones_share_the_record() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store
            .save(&Conversation::new().merge([Message::human("x")]))
            .await
            .unwrap();
        assert_eq!(other.load().await.unwrap().len(), 1);

        other.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
