//! Prompt domain
//!
//! Transcript rendering and the instruction templates used by every
//! generation and analysis step.

pub mod intent;
mod template;
pub mod utterance;

pub use intent::Intent;
pub use template::PromptTemplate;
pub use utterance::{Role, Utterance};
