//! Role-tagged utterances sent to the completion service.

use crate::conversation::entities::Conversation;
use crate::conversation::entities::Message;
use serde::{Deserialize, Serialize};

/// Speaker role as understood by chat-completion services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Name used for instructions injected by the orchestrator.
pub const SYSTEM_SPEAKER: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub speaker: String,
    pub content: String,
}

impl Utterance {
    pub fn new(role: Role, speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            speaker: speaker.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, "system", content)
    }

    /// An instruction from the orchestrator, appended after the transcript.
    pub fn instruction(content: impl Into<String>) -> Self {
        Self::new(Role::User, SYSTEM_SPEAKER, content)
    }

    /// Render a stored message: humans speak as `user`, bots as `assistant`.
    pub fn from_message(conversation: &Conversation, message: &Message) -> Self {
        let (role, speaker) = match conversation.author(message) {
            Some(p) if p.is_bot() => (Role::Assistant, p.name().to_string()),
            Some(p) => (Role::User, p.name().to_string()),
            None => (Role::User, message.author.to_string()),
        };
        Self::new(role, speaker, message.text.clone())
    }
}

/// Render `messages` in order.
pub fn transcript(conversation: &Conversation, messages: &[Message]) -> Vec<Utterance> {
    messages
        .iter()
        .map(|m| Utterance::from_message(conversation, m))
        .collect()
}
