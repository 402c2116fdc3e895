//! File-based history store: one pretty-printed JSON array per session.
//!
//! Storage location: `~/.agentloop/history/<session>.json`
//!
//! Writes go to a temporary file in the same directory which is synced and
//! then renamed over the target, so a crash mid-write leaves the previous
//! record intact. Loads never fail on bad content: anything that does not
//! decode to a valid message sequence is logged and treated as empty. The
//! bad file is never overwritten: the next save first renames it to
//! `<file>.corrupt-<timestamp>` so it stays around for inspection.

use agentloop_core::error::HistoryError;
use agentloop_core::history::{HistoryStore, is_valid_session_name};
use agentloop_core::message::{Conversation, Message};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// A history store backed by a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,

    /// Set when the last load found an unreadable record at `path`.
    unreadable: AtomicBool,
}

impl JsonFileStore {
    /// Use an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            unreadable: AtomicBool::new(false),
        }
    }

    /// The store for a named session under `dir` (`<dir>/<session>.json`).
    pub fn for_session(dir: impl AsRef<Path>, session: &str) -> Result<Self, HistoryError> {
        if !is_valid_session_name(session) {
            return Err(HistoryError::InvalidSession(session.to_string()));
        }
        Ok(Self::new(dir.as_ref().join(format!("{session}.json"))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn encode(messages: &[Message]) -> Result<Vec<u8>, HistoryError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        messages.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Decode a record, or explain why it is unusable.
    fn decode(bytes: &[u8]) -> Result<Conversation, String> {
        let messages: Vec<Message> = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        let conversation = Conversation::from_messages(messages);
        conversation.validate().map_err(|e| e.to_string())?;
        Ok(conversation)
    }

    /// Rename an unreadable record out of the way before it is replaced.
    fn move_aside(&self) -> Result<(), HistoryError> {
        let mut target = self.path.clone().into_os_string();
        target.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        let target = PathBuf::from(target);

        match std::fs::rename(&self.path, &target) {
            Ok(()) => {
                warn!(
                    path = %self.path.display(),
                    moved_to = %target.display(),
                    "Moved unreadable history file aside"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<(), HistoryError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(bytes).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), HistoryError> {
        let bytes = Self::encode(conversation.messages())?;
        if self.unreadable.load(Ordering::SeqCst) {
            self.move_aside()?;
            self.unreadable.store(false, Ordering::SeqCst);
        }
        self.write_atomic(&bytes)?;
        debug!(path = %self.path.display(), messages = conversation.len(), "History saved");
        Ok(())
    }

    async fn load(&self) -> Result<Conversation, HistoryError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No history file, starting empty");
                return Ok(Conversation::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match Self::decode(&bytes) {
            Ok(conversation) => {
                self.unreadable.store(false, Ordering::SeqCst);
                info!(path = %self.path.display(), messages = conversation.len(), "History loaded");
                Ok(conversation)
            }
            Err(reason) => {
                self.unreadable.store(true, Ordering::SeqCst);
                warn!(path = %self.path.display(), %reason, "Ignoring unreadable history file");
                Ok(Conversation::new())
            }
        }
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                self.unreadable.store(false, Ordering::SeqCst);
                info!(path = %self.path.display(), "History cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.unreadable.store(false, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::message::{Role, ToolCall};
    use serde_json::json;

    fn sample() -> Conversation {
        Conversation::new().merge([
            Message::human("What is 2 + 3?"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "add", json!({"a": 2, "b": 3}))],
            ),
            Message::tool_result("call_1", "add", "5"),
            Message::assistant("2 + 3 = 5"),
        ])
    }

    fn key(m: &Message) -> (Role, String, Vec<ToolCall>, Option<String>) {
        (
            m.role,
            m.content.clone(),
            m.tool_calls.clone(),
            m.tool_call_id.clone(),
        )
    }

    #[tokio::test]
    async fn round_trip_preserves_messages() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        let conv = sample();

        store.save(&conv).await.unwrap();
        let loaded = store.load().await.unwrap();

        let expected: Vec<_> = conv.messages().iter().map(key).collect();
        let actual: Vec<_> = loaded.messages().iter().map(key).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn file_is_a_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        store.save(&sample()).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[\n    {"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr[0]["role"], "human");
        assert_eq!(arr[1]["tool_calls"][0]["name"], "add");
        assert_eq!(arr[2]["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_and_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let garbage = b"[{\"role\": \"human\", \"content\": \"unterminated";
        std::fs::write(&path, garbage).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), garbage);
    }

    fn aside_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("history.json.corrupt-"))
            })
            .collect()
    }

    #[tokio::test]
    async fn save_after_corrupt_load_keeps_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let garbage = b"{ truncated";
        std::fs::write(&path, garbage).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
        store.save(&Conversation::new()).await.unwrap();

        let aside = aside_files(dir.path());
        assert_eq!(aside.len(), 1);
        assert_eq!(std::fs::read(&aside[0]).unwrap(), garbage);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");

        // Later saves replace the now-valid record without moving it.
        store.save(&sample()).await.unwrap();
        assert_eq!(aside_files(dir.path()).len(), 1);
        assert_eq!(store.load().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn clear_forgets_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        store.load().await.unwrap();
        store.clear().await.unwrap();
        store.save(&sample()).await.unwrap();

        assert!(aside_files(dir.path()).is_empty());
        assert_eq!(store.load().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn wrong_shape_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        for bad in [
            r#"{"role": "human"}"#,
            r#"[{"role": "robot", "content": "x"}]"#,
            r#"[{"role": "human", "content": 42}]"#,
        ] {
            std::fs::write(&path, bad).unwrap();
            let store = JsonFileStore::new(&path);
            assert!(store.load().await.unwrap().is_empty(), "accepted {bad}");
            assert_eq!(std::fs::read_to_string(&path).unwrap(), bad);
        }
    }

    #[tokio::test]
    async fn orphan_tool_reply_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"role": "tool", "content": "5", "tool_call_id": "call_x"}]"#,
        )
        .unwrap();

        assert!(JsonFileStore::new(&path).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"role": "human", "content": "hi", "type": "human", "additional_kwargs": {}}]"#,
        )
        .unwrap();

        let loaded = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.messages()[0].content, "hi");
    }

    #[tokio::test]
    async fn save_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        store.save(&sample()).await.unwrap();
        store
            .save(&Conversation::new().merge([Message::human("fresh")]))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        // No temp files left behind next to the record.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("a").join("b").join("h.json"));
        store.save(&sample()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn clear_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        store.save(&sample()).await.unwrap();

        store.clear().await.unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[test]
    fn session_paths() {
        let store = JsonFileStore::for_session("/tmp/h", "work").unwrap();
        assert_eq!(store.path(), Path::new("/tmp/h/work.json"));

        assert!(matches!(
            JsonFileStore::for_session("/tmp/h", "../escape"),
            Err(HistoryError::InvalidSession(_))
        ));
    }
}
