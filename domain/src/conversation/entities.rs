//! Conversation domain entities
//!
//! [`Conversation`] is the aggregate an orchestration cycle evaluates. The
//! store hands out a fresh copy per cycle; within a cycle it is read-only
//! except for the discourse refresh performed after Summarize.

use crate::conversation::participant::Participant;
use crate::conversation::sub_topic::{SubTopic, SubTopicStatus};
use crate::core::ids::{ConversationId, MessageId, ParticipantId};
use crate::strategy::discourse::DiscourseUpdate;
use crate::strategy::kind::StrategyKind;
use crate::strategy::state::StrategyState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A posted message (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author: ParticipantId,
    /// Strictly increasing within a conversation.
    pub timestamp: DateTime<Utc>,
    pub text: String,
    /// Bots that already reacted to a mention in this message.
    #[serde(default)]
    pub triggered_bots: BTreeSet<ParticipantId>,
}

impl Message {
    pub fn is_triggered_for(&self, bot: ParticipantId) -> bool {
        self.triggered_bots.contains(&bot)
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Running summary maintained by the Summarize strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Distinct contributors counted when the last summary was posted.
    pub participants_at_last_summary: usize,
}

/// A group conversation (Aggregate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: Option<String>,
    pub participants: Vec<Participant>,
    /// Ordered by timestamp ascending.
    pub messages: Vec<Message>,
    pub enabled_strategies: BTreeSet<StrategyKind>,
    pub summary: Summary,
    pub sub_topics: Vec<SubTopic>,
    pub strategy_states: BTreeMap<StrategyKind, StrategyState>,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            title: None,
            participants: Vec::new(),
            messages: Vec::new(),
            enabled_strategies: BTreeSet::new(),
            summary: Summary::default(),
            sub_topics: Vec::new(),
            strategy_states: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn bots(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_bot())
    }

    pub fn humans(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_human())
    }

    pub fn author(&self, message: &Message) -> Option<&Participant> {
        self.participant(message.author)
    }

    pub fn is_human_message(&self, message: &Message) -> bool {
        self.author(message).is_some_and(Participant::is_human)
    }

    pub fn is_bot_message(&self, message: &Message) -> bool {
        self.author(message).is_some_and(Participant::is_bot)
    }

    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The last `n` messages, oldest first.
    pub fn last_n(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Messages strictly after `since`; all messages when `since` is `None`.
    pub fn messages_after(&self, since: Option<DateTime<Utc>>) -> &[Message] {
        match since {
            None => &self.messages,
            Some(ts) => {
                let start = self.messages.partition_point(|m| m.timestamp <= ts);
                &self.messages[start..]
            }
        }
    }

    pub fn messages_since(&self, since: Option<DateTime<Utc>>) -> usize {
        self.messages_after(since).len()
    }

    /// The bot that posted most recently.
    pub fn last_active_bot(&self) -> Option<&Participant> {
        self.messages
            .iter()
            .rev()
            .filter_map(|m| self.author(m))
            .find(|p| p.is_bot())
    }

    pub fn bot_names(&self) -> Vec<&str> {
        self.bots().map(Participant::name).collect()
    }

    pub fn human_names(&self) -> Vec<&str> {
        self.humans().map(Participant::name).collect()
    }

    pub fn is_enabled(&self, kind: StrategyKind) -> bool {
        self.enabled_strategies.contains(&kind)
    }

    pub fn strategy_state(&self, kind: StrategyKind) -> StrategyState {
        self.strategy_states
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| StrategyState::never_fired(kind))
    }

    pub fn sub_topics_with(&self, status: SubTopicStatus) -> impl Iterator<Item = &SubTopic> {
        self.sub_topics.iter().filter(move |t| t.status == status)
    }

    /// Insert or update a sub-topic. Returns `true` when its status changed.
    pub fn upsert_sub_topic(
        &mut self,
        name: &str,
        status: SubTopicStatus,
        at: DateTime<Utc>,
    ) -> bool {
        match self.sub_topics.iter_mut().find(|t| t.matches(name)) {
            Some(topic) => topic.apply_status(status, at),
            None => {
                self.sub_topics.push(SubTopic::new(name.trim(), status, at));
                true
            }
        }
    }

    /// Apply every sub-topic status and the running summary. Returns the
    /// names of the sub-topics whose status changed.
    pub fn apply_discourse_update(
        &mut self,
        update: &DiscourseUpdate,
        at: DateTime<Utc>,
    ) -> Vec<String> {
        let changed = update
            .statuses
            .iter()
            .filter(|(name, status)| self.upsert_sub_topic(name, *status, at))
            .map(|(name, _)| name.clone())
            .collect();
        self.summary.text = Some(update.summary.clone());
        changed
    }

    /// Append `memories` to a bot's core memories. `false` when `bot` is not
    /// a bot of this conversation.
    pub fn add_bot_memories(&mut self, bot: ParticipantId, memories: &[String]) -> bool {
        let profile = self
            .participants
            .iter_mut()
            .find(|p| p.id == bot)
            .and_then(Participant::as_bot_mut);
        match profile {
            Some(profile) => {
                profile.memories.extend_from_slice(memories);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Conversation builders shared by domain tests.

    use super::*;
    use crate::conversation::participant::BotProfile;
    use crate::core::model::Model;
    use chrono::{Duration, TimeZone};

    pub(crate) const HUMAN: ParticipantId = ParticipantId::new(1);
    pub(crate) const BOT: ParticipantId = ParticipantId::new(2);

    pub(crate) fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    /// One human ("alice") and one bot ("Bot").
    pub(crate) fn conversation() -> Conversation {
        let mut conversation = Conversation::new(ConversationId::new(1));
        conversation.participants.push(Participant::human(HUMAN, "alice"));
        conversation.participants.push(Participant::bot(
            BOT,
            BotProfile::new("Bot", Model::default(), "You are helpful."),
        ));
        conversation
    }

    pub(crate) fn push(conversation: &mut Conversation, author: ParticipantId, text: &str) {
        let index = conversation.messages.len();
        conversation.messages.push(Message {
            id: MessageId::new(index as u64 + 1),
            conversation_id: conversation.id,
            author,
            timestamp: base_time() + Duration::seconds(index as i64 * 10),
            text: text.to_string(),
            triggered_bots: BTreeSet::new(),
        });
    }
}
