//! Durable conversation transcripts.
//!
//! [`JsonlConversationLogger`] implements the
//! [`ConversationLogger`](polybot_application::ConversationLogger) port by
//! appending one JSON object per event.

mod jsonl_logger;

pub use jsonl_logger::JsonlConversationLogger;
