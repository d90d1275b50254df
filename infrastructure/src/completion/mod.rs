//! Completion service adapters.

mod http;

pub use http::{ChatProvider, HttpCompletionService};
