//! In-process conversation store.
//!
//! Keeps every conversation in memory behind a lock and broadcasts each
//! appended message to subscribers, which is how the CLI renders bot posts.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use polybot_application::ports::conversation_store::{
    ConversationStore, MessageQuery, StoreError,
};
use polybot_domain::{
    BotProfile, Conversation, ConversationId, DiscourseUpdate, Message, MessageId, Participant,
    ParticipantId, StrategyKind, StrategyState, SubTopic, SubTopicStatus, Summary,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

const BROADCAST_CAPACITY: usize = 256;

/// Members and settings of a conversation to create.
#[derive(Debug, Clone, Default)]
pub struct NewConversation {
    pub title: Option<String>,
    pub humans: Vec<String>,
    pub bots: Vec<BotProfile>,
    pub strategies: BTreeSet<StrategyKind>,
}

pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    next_conversation: AtomicU64,
    next_message: AtomicU64,
    posted: broadcast::Sender<Message>,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        let (posted, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            conversations: RwLock::new(HashMap::new()),
            next_conversation: AtomicU64::new(1),
            next_message: AtomicU64::new(1),
            posted,
        }
    }

    /// Create a conversation. Participant ids are assigned in order, humans
    /// first.
    pub fn create_conversation(&self, new: NewConversation) -> Result<Conversation, StoreError> {
        let id = ConversationId::new(self.next_conversation.fetch_add(1, Ordering::Relaxed));
        let mut conversation = Conversation::new(id);
        conversation.title = new.title;
        conversation.enabled_strategies = new.strategies;

        let humans = new.humans.into_iter().map(Seat::Human);
        let bots = new.bots.into_iter().map(Seat::Bot);
        for (index, seed) in humans.chain(bots).enumerate() {
            let participant_id = ParticipantId::new(index as u64 + 1);
            conversation.participants.push(match seed {
                Seat::Human(name) => Participant::human(participant_id, name),
                Seat::Bot(profile) => Participant::bot(participant_id, profile),
            });
        }

        self.write()?.insert(id, conversation.clone());
        debug!(
            "Created conversation {} with {} participant(s)",
            id,
            conversation.participants.len()
        );
        Ok(conversation)
    }

    /// Receive every message appended from now on, across conversations.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.posted.subscribe()
    }

    pub fn set_strategy_enabled(
        &self,
        id: ConversationId,
        kind: StrategyKind,
        enabled: bool,
    ) -> Result<(), StoreError> {
        self.update(id, |conversation| {
            if enabled {
                conversation.enabled_strategies.insert(kind);
            } else {
                conversation.enabled_strategies.remove(&kind);
            }
        })
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ConversationId, Conversation>>, StoreError>
    {
        self.conversations
            .read()
            .map_err(|_| StoreError::Backend("conversation table poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ConversationId, Conversation>>, StoreError>
    {
        self.conversations
            .write()
            .map_err(|_| StoreError::Backend("conversation table poisoned".to_string()))
    }

    fn view<T>(
        &self,
        id: ConversationId,
        f: impl FnOnce(&Conversation) -> T,
    ) -> Result<T, StoreError> {
        let conversations = self.read()?;
        conversations
            .get(&id)
            .map(f)
            .ok_or(StoreError::ConversationNotFound(id))
    }

    fn update<T>(
        &self,
        id: ConversationId,
        f: impl FnOnce(&mut Conversation) -> T,
    ) -> Result<T, StoreError> {
        let mut conversations = self.write()?;
        conversations
            .get_mut(&id)
            .map(f)
            .ok_or(StoreError::ConversationNotFound(id))
    }
}

enum Seat {
    Human(String),
    Bot(BotProfile),
}

/// `now`, or just after `latest` when the clock did not move past it.
fn next_timestamp(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match latest {
        Some(latest) if latest >= now => latest + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn conversation(&self, id: ConversationId) -> Result<Conversation, StoreError> {
        self.view(id, Conversation::clone)
    }

    async fn append_message(
        &self,
        id: ConversationId,
        author: ParticipantId,
        text: &str,
    ) -> Result<Message, StoreError> {
        let message = self.update(id, |conversation| {
            if conversation.participant(author).is_none() {
                return Err(StoreError::UnknownParticipant {
                    conversation: id,
                    participant: author,
                });
            }
            let message = Message {
                id: MessageId::new(self.next_message.fetch_add(1, Ordering::Relaxed)),
                conversation_id: id,
                author,
                timestamp: next_timestamp(conversation.latest().map(|m| m.timestamp), Utc::now()),
                text: text.to_string(),
                triggered_bots: BTreeSet::new(),
            };
            conversation.messages.push(message.clone());
            Ok(message)
        })??;

        // nobody listening is fine
        let _ = self.posted.send(message.clone());
        Ok(message)
    }

    async fn messages(
        &self,
        id: ConversationId,
        query: MessageQuery,
    ) -> Result<Vec<Message>, StoreError> {
        self.view(id, |conversation| query.select(&conversation.messages))
    }

    async fn participants(&self, id: ConversationId) -> Result<Vec<Participant>, StoreError> {
        self.view(id, |conversation| conversation.participants.clone())
    }

    async fn enabled_strategies(
        &self,
        id: ConversationId,
    ) -> Result<BTreeSet<StrategyKind>, StoreError> {
        self.view(id, |conversation| conversation.enabled_strategies.clone())
    }

    async fn strategy_state(
        &self,
        id: ConversationId,
        kind: StrategyKind,
    ) -> Result<StrategyState, StoreError> {
        self.view(id, |conversation| conversation.strategy_state(kind))
    }

    async fn set_strategy_state(
        &self,
        id: ConversationId,
        state: StrategyState,
    ) -> Result<(), StoreError> {
        self.update(id, |conversation| {
            conversation.strategy_states.insert(state.kind, state);
        })
    }

    async fn mark_triggered(
        &self,
        id: ConversationId,
        message: MessageId,
        bot: ParticipantId,
    ) -> Result<bool, StoreError> {
        self.update(id, |conversation| {
            conversation
                .messages
                .iter_mut()
                .find(|m| m.id == message)
                .map(|m| m.triggered_bots.insert(bot))
                .ok_or(StoreError::MessageNotFound(message))
        })?
    }

    async fn sub_topics(&self, id: ConversationId) -> Result<Vec<SubTopic>, StoreError> {
        self.view(id, |conversation| conversation.sub_topics.clone())
    }

    async fn set_sub_topic_status(
        &self,
        id: ConversationId,
        name: &str,
        status: SubTopicStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.update(id, |conversation| conversation.upsert_sub_topic(name, status, at))
    }

    async fn summary(&self, id: ConversationId) -> Result<Summary, StoreError> {
        self.view(id, |conversation| conversation.summary.clone())
    }

    async fn set_summary(&self, id: ConversationId, text: &str) -> Result<(), StoreError> {
        self.update(id, |conversation| {
            conversation.summary.text = Some(text.to_string());
        })
    }

    async fn apply_discourse_update(
        &self,
        id: ConversationId,
        update: &DiscourseUpdate,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        // one write lock for the whole update
        self.update(id, |conversation| conversation.apply_discourse_update(update, at))
    }

    async fn add_bot_memories(
        &self,
        id: ConversationId,
        bot: ParticipantId,
        memories: &[String],
    ) -> Result<(), StoreError> {
        let added = self.update(id, |conversation| conversation.add_bot_memories(bot, memories))?;
        if !added {
            return Err(StoreError::UnknownParticipant {
                conversation: id,
                participant: bot,
            });
        }
        debug!("Stored {} core memories for {}", memories.len(), bot);
        Ok(())
    }

    async fn record_summarization(
        &self,
        id: ConversationId,
        participants: usize,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update(id, |conversation| {
            conversation.summary.updated_at = Some(at);
            conversation.summary.participants_at_last_summary = participants;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polybot_domain::Model;

    const ALICE: ParticipantId = ParticipantId::new(1);
    const BOT: ParticipantId = ParticipantId::new(2);

    fn store_with_conversation() -> (InMemoryConversationStore, ConversationId) {
        let store = InMemoryConversationStore::new();
        let conversation = store
            .create_conversation(NewConversation {
                title: Some("tea".to_string()),
                humans: vec!["alice".to_string()],
                bots: vec![BotProfile::new("Bot", Model::default(), "You are Bot.")],
                strategies: StrategyKind::ALL.into_iter().collect(),
            })
            .unwrap();
        (store, conversation.id)
    }

    #[test]
    fn test_participant_ids_follow_creation_order() {
        let (store, id) = store_with_conversation();
        let conversation = store.view(id, Conversation::clone).unwrap();
        assert_eq!(conversation.participant(ALICE).unwrap().name(), "alice");
        assert!(conversation.participant(BOT).unwrap().is_bot());
    }

    #[tokio::test]
    async fn test_append_keeps_timestamps_strictly_increasing() {
        let (store, id) = store_with_conversation();
        let mut previous = None;
        for i in 0..20 {
            let message = store
                .append_message(id, ALICE, &format!("message {i}"))
                .await
                .unwrap();
            if let Some(previous) = previous {
                assert!(message.timestamp > previous);
            }
            previous = Some(message.timestamp);
        }
        assert_eq!(store.messages(id, MessageQuery::all()).await.unwrap().len(), 20);
    }

    #[test]
    fn test_next_timestamp_bumps_collisions() {
        let now = Utc::now();
        assert_eq!(next_timestamp(None, now), now);
        assert_eq!(next_timestamp(Some(now), now), now + Duration::microseconds(1));
        let earlier = now - Duration::seconds(1);
        assert_eq!(next_timestamp(Some(earlier), now), now);
    }

    #[tokio::test]
    async fn test_append_rejects_strangers() {
        let (store, id) = store_with_conversation();
        let stranger = ParticipantId::new(42);
        assert_eq!(
            store.append_message(id, stranger, "hi").await.unwrap_err(),
            StoreError::UnknownParticipant {
                conversation: id,
                participant: stranger,
            }
        );
        assert_eq!(
            store.summary(ConversationId::new(99)).await.unwrap_err(),
            StoreError::ConversationNotFound(ConversationId::new(99))
        );
    }

    #[tokio::test]
    async fn test_mark_triggered_is_idempotent() {
        let (store, id) = store_with_conversation();
        let message = store.append_message(id, ALICE, "@bot hi").await.unwrap();
        assert!(store.mark_triggered(id, message.id, BOT).await.unwrap());
        assert!(!store.mark_triggered(id, message.id, BOT).await.unwrap());
        assert_eq!(
            store
                .mark_triggered(id, MessageId::new(999), BOT)
                .await
                .unwrap_err(),
            StoreError::MessageNotFound(MessageId::new(999))
        );
    }

    #[tokio::test]
    async fn test_message_queries() {
        let (store, id) = store_with_conversation();
        let first = store.append_message(id, ALICE, "one").await.unwrap();
        store.append_message(id, BOT, "two").await.unwrap();
        store.append_message(id, ALICE, "three").await.unwrap();

        let since = store
            .messages(id, MessageQuery::since(first.timestamp))
            .await
            .unwrap();
        assert_eq!(since.len(), 2);

        let latest = store
            .messages(id, MessageQuery::last(2).descending())
            .await
            .unwrap();
        let texts: Vec<_> = latest.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["three", "two"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_appended_messages() {
        let (store, id) = store_with_conversation();
        let mut posted = store.subscribe();
        store.append_message(id, BOT, "hello").await.unwrap();
        assert_eq!(posted.recv().await.unwrap().text, "hello");
    }

    #[tokio::test]
    async fn test_discourse_bookkeeping() {
        let (store, id) = store_with_conversation();
        let at = Utc::now();
        assert!(
            store
                .set_sub_topic_status(id, "tea", SubTopicStatus::BeingDiscussed, at)
                .await
                .unwrap()
        );
        store.set_summary(id, "All about tea.").await.unwrap();
        store.record_summarization(id, 3, at).await.unwrap();

        let summary = store.summary(id).await.unwrap();
        assert_eq!(summary.text.as_deref(), Some("All about tea."));
        assert_eq!(summary.updated_at, Some(at));
        assert_eq!(summary.participants_at_last_summary, 3);
        assert_eq!(store.sub_topics(id).await.unwrap().len(), 1);

        store
            .set_strategy_state(id, StrategyState::fired_at(StrategyKind::Resolve, at))
            .await
            .unwrap();
        assert_eq!(
            store
                .strategy_state(id, StrategyKind::Resolve)
                .await
                .unwrap()
                .last_fired_at,
            Some(at)
        );

        store
            .set_strategy_enabled(id, StrategyKind::Resolve, false)
            .unwrap();
        assert!(
            !store
                .enabled_strategies(id)
                .await
                .unwrap()
                .contains(&StrategyKind::Resolve)
        );
    }

    #[tokio::test]
    async fn test_discourse_update_is_applied_whole() {
        let (store, id) = store_with_conversation();
        let update = DiscourseUpdate {
            statuses: vec![
                ("tea".to_string(), SubTopicStatus::BeingDiscussed),
                ("coffee".to_string(), SubTopicStatus::NotDiscussed),
            ],
            summary: "Tea and coffee.".to_string(),
        };

        let changed = store
            .apply_discourse_update(id, &update, Utc::now())
            .await
            .unwrap();
        assert_eq!(changed.len(), 2);
        assert_eq!(store.sub_topics(id).await.unwrap().len(), 2);
        assert_eq!(
            store.summary(id).await.unwrap().text.as_deref(),
            Some("Tea and coffee.")
        );

        let missing = ConversationId::new(99);
        assert!(
            store
                .apply_discourse_update(missing, &update, Utc::now())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_bot_memories_are_appended() {
        let (store, id) = store_with_conversation();
        store
            .add_bot_memories(id, BOT, &["alice likes tea".to_string()])
            .await
            .unwrap();
        store
            .add_bot_memories(id, BOT, &["alice has a cat".to_string()])
            .await
            .unwrap();

        let participants = store.participants(id).await.unwrap();
        let profile = participants[1].as_bot().unwrap();
        assert_eq!(profile.memories, vec!["alice likes tea", "alice has a cat"]);
        assert!(
            store
                .add_bot_memories(id, ALICE, &["nope".to_string()])
                .await
                .is_err()
        );
    }
}
