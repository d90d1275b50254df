//! Conversation Store port
//!
//! Defines how the orchestrator reads and writes conversation records.
//! Implementations own persistence; the application only sees snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use polybot_domain::{
    Conversation, ConversationId, DiscourseUpdate, Message, MessageId, Participant, ParticipantId,
    StrategyKind, StrategyState, SubTopic, SubTopicStatus, Summary,
};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    #[error("Participant {participant} is not part of {conversation}")]
    UnknownParticipant {
        conversation: ConversationId,
        participant: ParticipantId,
    },

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// Which messages a [`MessageQuery`] selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRange {
    All,
    /// Messages strictly after the given time.
    Since(DateTime<Utc>),
    LastN(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub range: MessageRange,
    pub order: MessageOrder,
}

impl MessageQuery {
    pub fn all() -> Self {
        Self {
            range: MessageRange::All,
            order: MessageOrder::Ascending,
        }
    }

    pub fn since(at: DateTime<Utc>) -> Self {
        Self {
            range: MessageRange::Since(at),
            order: MessageOrder::Ascending,
        }
    }

    pub fn last(n: usize) -> Self {
        Self {
            range: MessageRange::LastN(n),
            order: MessageOrder::Ascending,
        }
    }

    pub fn descending(mut self) -> Self {
        self.order = MessageOrder::Descending;
        self
    }

    /// Apply the query to messages already sorted by timestamp.
    pub fn select(&self, messages: &[Message]) -> Vec<Message> {
        let slice = match self.range {
            MessageRange::All => messages,
            MessageRange::Since(at) => {
                let start = messages.partition_point(|m| m.timestamp <= at);
                &messages[start..]
            }
            MessageRange::LastN(n) => &messages[messages.len().saturating_sub(n)..],
        };
        let mut selected = slice.to_vec();
        if self.order == MessageOrder::Descending {
            selected.reverse();
        }
        selected
    }
}

/// Store for conversations, messages and strategy bookkeeping
///
/// Timestamps of appended messages are strictly increasing per
/// conversation; colliding timestamps are bumped forward by the store.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Full snapshot of a conversation.
    async fn conversation(&self, id: ConversationId) -> Result<Conversation, StoreError>;

    /// Append a message authored by `author` and return it as stored.
    async fn append_message(
        &self,
        id: ConversationId,
        author: ParticipantId,
        text: &str,
    ) -> Result<Message, StoreError>;

    async fn messages(
        &self,
        id: ConversationId,
        query: MessageQuery,
    ) -> Result<Vec<Message>, StoreError>;

    async fn participants(&self, id: ConversationId) -> Result<Vec<Participant>, StoreError>;

    async fn enabled_strategies(
        &self,
        id: ConversationId,
    ) -> Result<BTreeSet<StrategyKind>, StoreError>;

    async fn strategy_state(
        &self,
        id: ConversationId,
        kind: StrategyKind,
    ) -> Result<StrategyState, StoreError>;

    async fn set_strategy_state(
        &self,
        id: ConversationId,
        state: StrategyState,
    ) -> Result<(), StoreError>;

    /// Record that `bot` reacted to `message`. Returns `false` when it was
    /// already recorded.
    async fn mark_triggered(
        &self,
        id: ConversationId,
        message: MessageId,
        bot: ParticipantId,
    ) -> Result<bool, StoreError>;

    async fn sub_topics(&self, id: ConversationId) -> Result<Vec<SubTopic>, StoreError>;

    /// Insert or update a sub-topic. Returns `true` when the status changed.
    async fn set_sub_topic_status(
        &self,
        id: ConversationId,
        name: &str,
        status: SubTopicStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn summary(&self, id: ConversationId) -> Result<Summary, StoreError>;

    /// Replace the running summary text.
    async fn set_summary(&self, id: ConversationId, text: &str) -> Result<(), StoreError>;

    /// Write every sub-topic status and the running summary as one unit:
    /// on error nothing is applied. Returns the sub-topics whose status
    /// changed.
    async fn apply_discourse_update(
        &self,
        id: ConversationId,
        update: &DiscourseUpdate,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError>;

    /// Record that a summary was posted to `participants` contributors at `at`.
    async fn record_summarization(
        &self,
        id: ConversationId,
        participants: usize,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Append core memories to `bot`.
    async fn add_bot_memories(
        &self,
        id: ConversationId,
        bot: ParticipantId,
        memories: &[String],
    ) -> Result<(), StoreError>;
}
