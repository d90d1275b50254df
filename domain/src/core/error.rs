//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Conversation has no messages")]
    EmptyConversation,

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid sub-topic status: {0}")]
    InvalidSubTopicStatus(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

impl DomainError {
    /// Check if this error means there was nothing to evaluate yet
    pub fn is_empty_conversation(&self) -> bool {
        matches!(self, DomainError::EmptyConversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_conversation_display() {
        let error = DomainError::EmptyConversation;
        assert_eq!(error.to_string(), "Conversation has no messages");
    }

    #[test]
    fn test_is_empty_conversation_check() {
        assert!(DomainError::EmptyConversation.is_empty_conversation());
        assert!(!DomainError::UnknownStrategy("Chat".to_string()).is_empty_conversation());
    }
}
