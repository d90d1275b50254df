//! Conversation storage adapters.

mod memory;

pub use memory::{InMemoryConversationStore, NewConversation};
