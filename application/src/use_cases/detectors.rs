//! Reactive detectors
//!
//! - [`MentionDetector`]: replies from bots addressed with `@name`
//! - [`IndirectDetector`]: replies to open questions asked to the group

use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::use_cases::generation::Generator;
use crate::use_cases::shared::Contribution;
use polybot_domain::{
    ContributorError, Conversation, FireResult, Intent, NoFireReason, ParticipantId,
    PromptTemplate, StrategyKind, Utterance, mentions, parse_question_verdict,
};
use crate::ports::completion::CompletionRequest;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Fan out `intent` to `bots` and collect one contribution per bot.
async fn speak_all(
    generator: &Arc<Generator>,
    conversation: &Arc<Conversation>,
    bots: Vec<ParticipantId>,
    intent: Intent,
) -> Vec<Contribution> {
    let kind = intent.source();
    let mut join_set = JoinSet::new();

    for bot in bots {
        let generator = Arc::clone(generator);
        let conversation = Arc::clone(conversation);
        let intent = intent.clone();

        join_set.spawn(async move {
            let result = match conversation.participant(bot) {
                Some(participant) => generator.speak(&conversation, participant, intent).await,
                None => FireResult::NoFire(NoFireReason::NoEligibleBot),
            };
            (bot, result)
        });
    }

    let mut contributions = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok((bot, result)) => contributions.push(Contribution::new(kind, Some(bot), result)),
            Err(e) => {
                warn!("Task join error: {}", e);
            }
        }
    }
    contributions
}

/// Replies from bots mentioned by `@name`.
pub struct MentionDetector {
    store: Arc<dyn ConversationStore>,
    generator: Arc<Generator>,
}

impl MentionDetector {
    pub fn new(store: Arc<dyn ConversationStore>, generator: Arc<Generator>) -> Self {
        Self { store, generator }
    }

    /// Mark every untriggered mention of each bot and request one reply
    /// per mentioned bot.
    pub async fn detect(
        &self,
        conversation: &Arc<Conversation>,
    ) -> Result<Vec<Contribution>, StoreError> {
        let mut mentioned = Vec::new();

        for bot in conversation.bots() {
            let pending: Vec<_> = conversation
                .messages
                .iter()
                .filter(|m| m.author != bot.id && !m.is_triggered_for(bot.id))
                .filter(|m| mentions(bot.name(), &m.text))
                .collect();
            if pending.is_empty() {
                continue;
            }

            info!("[Mention] Mention detected: {}", bot.name());
            for message in pending {
                self.store
                    .mark_triggered(conversation.id, message.id, bot.id)
                    .await?;
            }
            mentioned.push(bot.id);
        }

        if mentioned.is_empty() {
            return Ok(Vec::new());
        }
        Ok(speak_all(&self.generator, conversation, mentioned, Intent::Mention).await)
    }
}

/// Replies to an open question asked to the whole group.
pub struct IndirectDetector {
    generator: Arc<Generator>,
    max_responders: usize,
}

impl IndirectDetector {
    pub fn new(generator: Arc<Generator>, max_responders: usize) -> Self {
        Self {
            generator,
            max_responders,
        }
    }

    /// Classify the latest message and, if it is a genuine question, ask a
    /// random subset of the bots allowed to speak.
    pub async fn detect(&self, conversation: &Arc<Conversation>) -> Vec<Contribution> {
        let Some(latest) = conversation.latest() else {
            return Vec::new();
        };

        match self.classify(&latest.text).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("[Indirect] Latest message is not a question");
                return vec![Contribution::new(
                    StrategyKind::Indirect,
                    None,
                    FireResult::NoFire(NoFireReason::ConditionNotMet),
                )];
            }
            Err(e) => {
                return vec![Contribution::new(
                    StrategyKind::Indirect,
                    None,
                    FireResult::Failed(e),
                )];
            }
        }

        let mut eligible: Vec<ParticipantId> = conversation
            .bots()
            .filter(|bot| bot.id != latest.author)
            .filter(|bot| self.generator.gate().may_respond(conversation, bot))
            .map(|bot| bot.id)
            .collect();
        if eligible.is_empty() {
            return vec![Contribution::new(
                StrategyKind::Indirect,
                None,
                FireResult::NoFire(NoFireReason::TurnDenied),
            )];
        }

        eligible.shuffle(&mut rand::thread_rng());
        eligible.truncate(self.max_responders);
        info!("[Indirect] Question detected, asking {} bot(s)", eligible.len());

        speak_all(&self.generator, conversation, eligible, Intent::Indirect).await
    }

    async fn classify(&self, text: &str) -> Result<bool, ContributorError> {
        let utterances = vec![
            Utterance::system(PromptTemplate::question_classifier_system()),
            Utterance::instruction(PromptTemplate::question_classifier_prompt(text)),
        ];
        let request = CompletionRequest::new(utterances, self.generator.analysis_params().structured());
        let verdict = self.generator.complete(request).await?;
        parse_question_verdict(&verdict).ok_or_else(|| {
            ContributorError::Fatal(format!("Unreadable question verdict: {}", verdict))
        })
    }
}
