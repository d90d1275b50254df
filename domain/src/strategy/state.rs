//! Per-strategy cooldown state.

use crate::conversation::entities::Conversation;
use crate::strategy::kind::StrategyKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cooldown bookkeeping for one (conversation, strategy) pair.
///
/// `last_fired_at` only advances when a firing was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyState {
    pub kind: StrategyKind,
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl StrategyState {
    pub fn never_fired(kind: StrategyKind) -> Self {
        Self {
            kind,
            last_fired_at: None,
        }
    }

    pub fn fired_at(kind: StrategyKind, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            last_fired_at: Some(at),
        }
    }
}

/// Waiting window measured in messages, not wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    pub messages: usize,
}

impl Cooldown {
    pub const NONE: Cooldown = Cooldown { messages: 0 };

    pub const fn messages(messages: usize) -> Self {
        Self { messages }
    }

    /// At least `messages` messages arrived after the last firing. A strategy
    /// that never fired counts from the start of the conversation.
    pub fn has_elapsed(&self, state: &StrategyState, conversation: &Conversation) -> bool {
        conversation.messages_since(state.last_fired_at) >= self.messages
    }
}
