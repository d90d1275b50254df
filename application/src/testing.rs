//! In-process fakes of the ports, shared by the use case tests.

use crate::ports::completion::{CompletionError, CompletionRequest, CompletionService};
use crate::ports::conversation_store::{ConversationStore, MessageQuery, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use polybot_domain::{
    BotProfile, Conversation, ConversationId, DiscourseUpdate, Message, MessageId, Model,
    Participant, ParticipantId, StrategyKind, StrategyState, SubTopic, SubTopicStatus, Summary,
};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) const ALICE: ParticipantId = ParticipantId::new(1);
pub(crate) const BOT: ParticipantId = ParticipantId::new(2);
pub(crate) const BOB: ParticipantId = ParticipantId::new(3);
pub(crate) const HELPER: ParticipantId = ParticipantId::new(4);
pub(crate) const CONVERSATION: ConversationId = ConversationId::new(1);

/// alice and bob with the bots "Bot" and "Helper"; every strategy enabled.
pub(crate) fn conversation() -> Conversation {
    let mut conversation = Conversation::new(CONVERSATION);
    conversation.participants = vec![
        Participant::human(ALICE, "alice"),
        Participant::bot(BOT, BotProfile::new("Bot", Model::default(), "You are Bot.")),
        Participant::human(BOB, "bob"),
        Participant::bot(
            HELPER,
            BotProfile::new("Helper", Model::default(), "You are Helper."),
        ),
    ];
    conversation.enabled_strategies = StrategyKind::ALL.into_iter().collect();
    conversation
}

/// Store holding a single conversation in memory.
pub(crate) struct FakeStore {
    conversation: Mutex<Conversation>,
    reject_discourse: AtomicBool,
}

impl FakeStore {
    pub(crate) fn new(conversation: Conversation) -> Self {
        Self {
            conversation: Mutex::new(conversation),
            reject_discourse: AtomicBool::new(false),
        }
    }

    /// Make every discourse update fail with a backend error.
    pub(crate) fn reject_discourse_updates(&self) {
        self.reject_discourse.store(true, Ordering::SeqCst);
    }

    /// Append with an explicit timestamp, bypassing the clock.
    pub(crate) fn seed(&self, author: ParticipantId, text: &str) -> Message {
        let mut conversation = self.conversation.lock().unwrap();
        let timestamp = conversation
            .latest()
            .map(|m| m.timestamp + Duration::seconds(1))
            .unwrap_or_else(|| Utc::now() - Duration::hours(1));
        push(&mut conversation, author, text, timestamp)
    }

    pub(crate) fn snapshot(&self) -> Conversation {
        self.conversation.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.snapshot().messages.into_iter().map(|m| m.text).collect()
    }

    fn check(&self, id: ConversationId) -> Result<std::sync::MutexGuard<'_, Conversation>, StoreError> {
        let conversation = self.conversation.lock().unwrap();
        if conversation.id != id {
            return Err(StoreError::ConversationNotFound(id));
        }
        Ok(conversation)
    }
}

fn push(
    conversation: &mut Conversation,
    author: ParticipantId,
    text: &str,
    timestamp: DateTime<Utc>,
) -> Message {
    let message = Message {
        id: MessageId::new(conversation.messages.len() as u64 + 1),
        conversation_id: conversation.id,
        author,
        timestamp,
        text: text.to_string(),
        triggered_bots: BTreeSet::new(),
    };
    conversation.messages.push(message.clone());
    message
}

#[async_trait]
impl ConversationStore for FakeStore {
    async fn conversation(&self, id: ConversationId) -> Result<Conversation, StoreError> {
        Ok(self.check(id)?.clone())
    }

    async fn append_message(
        &self,
        id: ConversationId,
        author: ParticipantId,
        text: &str,
    ) -> Result<Message, StoreError> {
        let mut conversation = self.check(id)?;
        let now = Utc::now();
        let timestamp = match conversation.latest() {
            Some(latest) if latest.timestamp >= now => latest.timestamp + Duration::microseconds(1),
            _ => now,
        };
        Ok(push(&mut conversation, author, text, timestamp))
    }

    async fn messages(
        &self,
        id: ConversationId,
        query: MessageQuery,
    ) -> Result<Vec<Message>, StoreError> {
        Ok(query.select(&self.check(id)?.messages))
    }

    async fn participants(&self, id: ConversationId) -> Result<Vec<Participant>, StoreError> {
        Ok(self.check(id)?.participants.clone())
    }

    async fn enabled_strategies(
        &self,
        id: ConversationId,
    ) -> Result<BTreeSet<StrategyKind>, StoreError> {
        Ok(self.check(id)?.enabled_strategies.clone())
    }

    async fn strategy_state(
        &self,
        id: ConversationId,
        kind: StrategyKind,
    ) -> Result<StrategyState, StoreError> {
        Ok(self.check(id)?.strategy_state(kind))
    }

    async fn set_strategy_state(
        &self,
        id: ConversationId,
        state: StrategyState,
    ) -> Result<(), StoreError> {
        self.check(id)?.strategy_states.insert(state.kind, state);
        Ok(())
    }

    async fn mark_triggered(
        &self,
        id: ConversationId,
        message: MessageId,
        bot: ParticipantId,
    ) -> Result<bool, StoreError> {
        let mut conversation = self.check(id)?;
        let message = conversation
            .messages
            .iter_mut()
            .find(|m| m.id == message)
            .ok_or(StoreError::MessageNotFound(message))?;
        Ok(message.triggered_bots.insert(bot))
    }

    async fn sub_topics(&self, id: ConversationId) -> Result<Vec<SubTopic>, StoreError> {
        Ok(self.check(id)?.sub_topics.clone())
    }

    async fn set_sub_topic_status(
        &self,
        id: ConversationId,
        name: &str,
        status: SubTopicStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.check(id)?.upsert_sub_topic(name, status, at))
    }

    async fn summary(&self, id: ConversationId) -> Result<Summary, StoreError> {
        Ok(self.check(id)?.summary.clone())
    }

    async fn set_summary(&self, id: ConversationId, text: &str) -> Result<(), StoreError> {
        self.check(id)?.summary.text = Some(text.to_string());
        Ok(())
    }

    async fn apply_discourse_update(
        &self,
        id: ConversationId,
        update: &DiscourseUpdate,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let mut conversation = self.check(id)?;
        if self.reject_discourse.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("discourse table locked".to_string()));
        }
        Ok(conversation.apply_discourse_update(update, at))
    }

    async fn add_bot_memories(
        &self,
        id: ConversationId,
        bot: ParticipantId,
        memories: &[String],
    ) -> Result<(), StoreError> {
        let mut conversation = self.check(id)?;
        if conversation.add_bot_memories(bot, memories) {
            Ok(())
        } else {
            Err(StoreError::UnknownParticipant {
                conversation: id,
                participant: bot,
            })
        }
    }

    async fn record_summarization(
        &self,
        id: ConversationId,
        participants: usize,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conversation = self.check(id)?;
        conversation.summary.updated_at = Some(at);
        conversation.summary.participants_at_last_summary = participants;
        Ok(())
    }
}

type Handler = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;

/// Completion service answering through a routing closure and recording
/// every request it receives.
pub(crate) struct ScriptedCompletion {
    handler: Handler,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub(crate) fn new(
        handler: impl Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `text`.
    pub(crate) fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// Whether the request's final instruction contains `needle`.
pub(crate) fn asks(request: &CompletionRequest, needle: &str) -> bool {
    request.last_prompt().is_some_and(|p| p.contains(needle))
}
