//! Fallback delay estimation.

use crate::conversation::entities::Conversation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a silence must last before the fallback chime-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackDelays {
    /// After a bot message: give humans time to answer.
    pub after_bot: Duration,
    /// After a human message: let them finish their thought.
    pub after_human: Duration,
}

impl Default for FallbackDelays {
    fn default() -> Self {
        Self {
            after_bot: Duration::from_secs(5 * 60),
            after_human: Duration::from_secs(30),
        }
    }
}

impl FallbackDelays {
    pub fn estimate(&self, conversation: &Conversation) -> Duration {
        match conversation.latest() {
            None => Duration::ZERO,
            Some(latest) if conversation.is_bot_message(latest) => self.after_bot,
            Some(_) => self.after_human,
        }
    }
}
