//! Bot generation
//!
//! Every completion the orchestrator makes goes through [`Generator`]: a
//! shared semaphore bounds concurrency, rate limits are retried with a
//! fixed backoff and each call may be bounded by a timeout.

use crate::config::CompletionPolicy;
use crate::ports::completion::{
    CompletionError, CompletionRequest, CompletionService, GenerationParams,
};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use polybot_domain::prompt::utterance::transcript;
use polybot_domain::{
    ContributorError, Conversation, FireResult, Intent, NoFireReason, Participant,
    PromptTemplate, Proposal, TurnGate, Utterance, is_refusal, is_self_referential,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Shared gateway to the completion service.
pub struct Generator {
    completion: Arc<dyn CompletionService>,
    permits: Arc<Semaphore>,
    policy: CompletionPolicy,
    gate: TurnGate,
    memory_limit: usize,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl Generator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        policy: CompletionPolicy,
        gate: TurnGate,
        memory_limit: usize,
    ) -> Self {
        Self {
            completion,
            permits: Arc::new(Semaphore::new(policy.max_concurrency.max(1))),
            policy,
            gate,
            memory_limit,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn gate(&self) -> &TurnGate {
        &self.gate
    }

    /// Parameters for analysis calls (classification, sub-topic tracking).
    pub fn analysis_params(&self) -> GenerationParams {
        GenerationParams::new(
            self.policy.analysis_model.clone(),
            self.policy.analysis_temperature,
        )
    }

    /// Run one completion with the concurrency, timeout and retry policy.
    pub async fn complete(&self, request: CompletionRequest) -> Result<String, ContributorError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = {
                let _permit = self.permits.acquire().await.map_err(|_| {
                    ContributorError::Fatal("Completion semaphore closed".to_string())
                })?;
                self.complete_once(&request).await
            };

            match result {
                Ok(text) if text.trim().is_empty() => {
                    return Err(ContributorError::Fatal("Empty completion".to_string()));
                }
                Ok(text) => return Ok(text.trim().to_string()),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "[{}/{}] {}. Retrying in {:?}...",
                        attempt, max_attempts, e, self.policy.retry_backoff
                    );
                    tokio::time::sleep(self.policy.retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Completion failed after {} attempt(s): {}", attempt, e);
                    return Err(e.into());
                }
            }
        }
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        match self.policy.timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, self.completion.complete(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(CompletionError::Timeout),
                }
            }
            None => self.completion.complete(request).await,
        }
    }

    /// Ask `bot` to speak for `intent` over the whole conversation.
    ///
    /// Non-overriding intents consult the turn gate first. Replies that
    /// mention the bot itself are discarded, as are bare refusals to a
    /// mention.
    pub async fn speak(
        &self,
        conversation: &Conversation,
        bot: &Participant,
        intent: Intent,
    ) -> FireResult<Proposal> {
        let Some(profile) = bot.as_bot() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };
        if conversation.is_empty() {
            return FireResult::Failed(ContributorError::EmptyConversation);
        }
        if !intent.overrides_turn_gate() && !self.gate.may_respond(conversation, bot) {
            debug!("[{}] Turn denied for {}", intent.source(), profile.name);
            return FireResult::NoFire(NoFireReason::TurnDenied);
        }

        let mut utterances = vec![Utterance::system(PromptTemplate::bot_system(
            conversation,
            profile,
            self.memory_limit,
        ))];
        utterances.extend(transcript(conversation, &conversation.messages));
        utterances.push(Utterance::instruction(PromptTemplate::instruction(
            &intent,
            &profile.name,
        )));

        let params = GenerationParams::new(profile.model.clone(), profile.temperature);
        let text = match self.complete(CompletionRequest::new(utterances, params)).await {
            Ok(text) => text,
            Err(e) => return FireResult::Failed(e),
        };

        if is_self_referential(&profile.name, &text) {
            info!("[{}] Self-referential response from {}", intent.source(), profile.name);
            self.conversation_logger.log(ConversationEvent::new(
                "reply_discarded",
                json!({
                    "conversation": conversation.id.get(),
                    "bot": profile.name,
                    "reason": "self_referential",
                    "text": text,
                }),
            ));
            return FireResult::Failed(ContributorError::SelfReferential(profile.name.clone()));
        }
        if intent.discards_refusal() && is_refusal(&text) {
            info!("[{}] {} declined to answer", intent.source(), profile.name);
            return FireResult::NoFire(NoFireReason::Declined);
        }

        FireResult::Fired(Proposal::new(bot.id, intent.source(), text))
    }
}
