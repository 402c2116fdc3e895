//! History persistence trait.
//!
//! A history store holds one conversation. `load` is fail-soft: a missing
//! record and a corrupt record both come back as an empty conversation.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::message::Conversation;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// A human-readable name for this backend (e.g., "json_file").
    fn name(&self) -> &str;

    /// Persist the full ordered message sequence, replacing any previous
    /// record.
    async fn save(&self, conversation: &Conversation) -> Result<(), HistoryError>;

    /// Load the stored conversation, or an empty one if there is nothing
    /// usable.
    async fn load(&self) -> Result<Conversation, HistoryError>;

    /// Remove the stored record.
    async fn clear(&self) -> Result<(), HistoryError>;
}

/// Session names become file names, so they are restricted to
/// `[A-Za-z0-9_-]`, non-empty, at most 64 characters.
pub fn is_valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
