//! Infrastructure layer for polybot
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod completion;
pub mod config;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use completion::{ChatProvider, HttpCompletionService};
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::JsonlConversationLogger;
pub use store::{InMemoryConversationStore, NewConversation};
