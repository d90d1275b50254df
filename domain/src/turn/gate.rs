//! Turn Gate
//!
//! Decides whether a bot is currently allowed to post. Every reactive path
//! and the non-overriding proactive paths consult it before generating.

use crate::conversation::entities::Conversation;
use crate::conversation::participant::Participant;
use serde::{Deserialize, Serialize};

/// Turn-taking thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnPolicy {
    /// Number of recent messages inspected.
    pub window: usize,
    /// Minimum share of human-authored messages inside the window.
    pub min_human_fraction: f64,
    /// Conversations up to this length are exempt from the human share check.
    pub new_chat_grace: usize,
    /// Allow any bot to post twice in a row.
    pub double_texting: bool,
    /// Maximum messages one bot may own inside the window.
    pub max_bot_replies_in_window: Option<usize>,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            window: 10,
            min_human_fraction: 0.2,
            new_chat_grace: 5,
            double_texting: false,
            max_bot_replies_in_window: Some(5),
        }
    }
}

/// Why the gate refused a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDenial {
    /// Bots never speak first.
    EmptyConversation,
    /// The bot authored the latest message.
    AlreadyReplied,
    /// Humans are too quiet for bots to keep talking.
    TooFewHumans { human_fraction: f64 },
    /// The bot already owns too much of the window.
    TooManyReplies { replies: usize },
    /// The participant is not a bot.
    NotABot,
}

/// Outcome of a turn check.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDecision {
    Allowed,
    Denied(TurnDenial),
}

impl TurnDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TurnDecision::Allowed)
    }
}

/// Stateless gate over a [`TurnPolicy`].
#[derive(Debug, Clone, Default)]
pub struct TurnGate {
    policy: TurnPolicy,
}

impl TurnGate {
    pub fn new(policy: TurnPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.policy
    }

    pub fn may_respond(&self, conversation: &Conversation, bot: &Participant) -> bool {
        self.check(conversation, bot).is_allowed()
    }

    pub fn check(&self, conversation: &Conversation, bot: &Participant) -> TurnDecision {
        let Some(profile) = bot.as_bot() else {
            return TurnDecision::Denied(TurnDenial::NotABot);
        };
        let Some(latest) = conversation.latest() else {
            return TurnDecision::Denied(TurnDenial::EmptyConversation);
        };

        let double_texting = self.policy.double_texting || profile.behavior.double_texting;
        if latest.author == bot.id && !double_texting {
            return TurnDecision::Denied(TurnDenial::AlreadyReplied);
        }

        let window = conversation.last_n(self.policy.window);
        let humans = window
            .iter()
            .filter(|m| conversation.is_human_message(m))
            .count();
        let human_fraction = humans as f64 / window.len() as f64;
        if human_fraction < self.policy.min_human_fraction
            && conversation.messages.len() > self.policy.new_chat_grace
            && !conversation.is_human_message(latest)
        {
            return TurnDecision::Denied(TurnDenial::TooFewHumans { human_fraction });
        }

        if let Some(max) = self.policy.max_bot_replies_in_window {
            let replies = window.iter().filter(|m| m.author == bot.id).count();
            if replies >= max {
                return TurnDecision::Denied(TurnDenial::TooManyReplies { replies });
            }
        }

        TurnDecision::Allowed
    }
}
