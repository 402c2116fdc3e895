//! Conversation history stores for agentloop.
//!
//! All stores implement the `agentloop_core::HistoryStore` trait.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::JsonFileStore;
pub use in_memory::InMemoryStore;
