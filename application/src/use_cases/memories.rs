//! Core memory formation
//!
//! When a conversation ends, each bot is asked which facts it should keep.
//! The answers are appended to the bot's profile and surface in its system
//! prompt in later conversations.

use crate::ports::completion::CompletionRequest;
use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::use_cases::generation::Generator;
use futures::future::join_all;
use polybot_domain::{
    Conversation, ConversationId, MIN_MESSAGES_FOR_MEMORIES, Participant, ParticipantId,
    PromptTemplate, Utterance, parse_core_memories,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Memories stored per bot by one formation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormedMemories {
    pub per_bot: Vec<(ParticipantId, usize)>,
}

impl FormedMemories {
    pub fn total(&self) -> usize {
        self.per_bot.iter().map(|(_, count)| count).sum()
    }
}

pub struct CoreMemoryFormer {
    store: Arc<dyn ConversationStore>,
    generator: Arc<Generator>,
}

impl CoreMemoryFormer {
    pub fn new(store: Arc<dyn ConversationStore>, generator: Arc<Generator>) -> Self {
        Self { store, generator }
    }

    /// Ask every bot of `id` for its core memories and store them.
    ///
    /// Bots whose answer fails or is unreadable are skipped; store failures
    /// abort the pass.
    pub async fn form(&self, id: ConversationId) -> Result<FormedMemories, StoreError> {
        let conversation = self.store.conversation(id).await?;
        if conversation.messages.len() < MIN_MESSAGES_FOR_MEMORIES {
            info!(
                "Conversation {} has {} message(s), skipping core memories",
                id,
                conversation.messages.len()
            );
            return Ok(FormedMemories::default());
        }

        let answers = join_all(conversation.bots().map(|bot| self.recollect(&conversation, bot))).await;

        let mut formed = FormedMemories::default();
        for (bot, memories) in answers.into_iter().flatten() {
            if memories.is_empty() {
                continue;
            }
            self.store.add_bot_memories(id, bot, &memories).await?;
            formed.per_bot.push((bot, memories.len()));
        }
        info!("Formed {} core memories for {}", formed.total(), id);
        Ok(formed)
    }

    async fn recollect(
        &self,
        conversation: &Conversation,
        bot: &Participant,
    ) -> Option<(ParticipantId, Vec<String>)> {
        let request = CompletionRequest::new(
            vec![Utterance::system(PromptTemplate::core_memories_prompt(
                conversation,
                bot.name(),
            ))],
            self.generator.analysis_params().structured(),
        );
        let answer = match self.generator.complete(request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Core memories for {} failed: {}", bot.name(), e);
                return None;
            }
        };
        match parse_core_memories(&answer) {
            Some(memories) => {
                debug!("{} core memories from {}", memories.len(), bot.name());
                Some((bot.id, memories))
            }
            None => {
                warn!("Unreadable core memories from {}: {}", bot.name(), answer);
                None
            }
        }
    }
}
