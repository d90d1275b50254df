//! Orchestrator use case
//!
//! Runs one generation cycle per new-message event:
//!
//! 1. Mention detector, then the indirect-question detector if no mention
//!    produced a reply
//! 2. Enabled proactive strategies: Summarize ahead of Transition/Resolve,
//!    Encourage and Chime-in alongside that chain
//! 3. Fan-in per bot, synthesis when a bot has several candidates
//! 4. Post, then advance the contributing strategies' state
//! 5. When nothing was posted, arm the fallback timer
//!
//! Contributor failures reduce to "no output"; store failures abort the cycle.

use crate::config::OrchestratorConfig;
use crate::ports::completion::CompletionService;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::use_cases::detectors::{IndirectDetector, MentionDetector};
use crate::use_cases::fallback::FallbackScheduler;
use crate::use_cases::generation::Generator;
use crate::use_cases::memories::{CoreMemoryFormer, FormedMemories};
use crate::use_cases::shared::Contribution;
use crate::use_cases::strategies::{Strategy, StrategyContext, StrategyRegistry};
use crate::use_cases::synthesis::Synthesizer;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use polybot_domain::{
    ContributorError, Conversation, ConversationId, ConversationMetrics, FallbackDelays,
    FireResult, Message, ParticipantId, PostEffect, Proposal, StrategyKind, StrategyState,
    TurnGate, mentioned_humans,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a cycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub conversation: ConversationId,
    pub started_at: DateTime<Utc>,
    pub contributions: Vec<Contribution>,
    pub posted: Vec<Message>,
    /// Delay of the fallback armed because nothing was posted.
    pub fallback: Option<Duration>,
    pub metrics: ConversationMetrics,
}

impl CycleReport {
    pub fn posted_anything(&self) -> bool {
        !self.posted.is_empty()
    }
}

/// What a fallback fire did.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    Posted(Message),
    /// A message arrived after the timer was armed.
    Stale,
    EmptyConversation,
    /// The latest message waits for a human's answer.
    HumanMentioned,
    /// The last two messages come from the same bot.
    AlreadyChimed,
    /// The silence chime-in is not enabled for the conversation.
    Disabled,
    NotPosted(Contribution),
}

/// Orchestrates detectors, strategies, synthesis and the fallback timer.
pub struct Orchestrator {
    store: Arc<dyn ConversationStore>,
    completion: Arc<dyn CompletionService>,
    scheduler: Arc<FallbackScheduler>,
    config: OrchestratorConfig,
    generator: Arc<Generator>,
    mention: MentionDetector,
    indirect: IndirectDetector,
    strategies: StrategyRegistry,
    synthesizer: Synthesizer,
    memories: CoreMemoryFormer,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        completion: Arc<dyn CompletionService>,
        scheduler: Arc<FallbackScheduler>,
        config: OrchestratorConfig,
    ) -> Self {
        Self::assemble(
            store,
            completion,
            scheduler,
            config,
            Arc::new(NoConversationLogger),
        )
    }

    /// Record completions, outcomes and posts to `logger`.
    pub fn with_conversation_logger(self, logger: Arc<dyn ConversationLogger>) -> Self {
        Self::assemble(self.store, self.completion, self.scheduler, self.config, logger)
    }

    fn assemble(
        store: Arc<dyn ConversationStore>,
        completion: Arc<dyn CompletionService>,
        scheduler: Arc<FallbackScheduler>,
        config: OrchestratorConfig,
        conversation_logger: Arc<dyn ConversationLogger>,
    ) -> Self {
        let generator = Arc::new(
            Generator::new(
                Arc::clone(&completion),
                config.completion.clone(),
                TurnGate::new(config.turn.clone()),
                config.memory_limit,
            )
            .with_conversation_logger(Arc::clone(&conversation_logger)),
        );
        Self {
            mention: MentionDetector::new(Arc::clone(&store), Arc::clone(&generator)),
            indirect: IndirectDetector::new(
                Arc::clone(&generator),
                config.strategies.indirect_max_responders,
            ),
            strategies: StrategyRegistry::standard(&config.strategies),
            synthesizer: Synthesizer::new(Arc::clone(&generator), config.memory_limit),
            memories: CoreMemoryFormer::new(Arc::clone(&store), Arc::clone(&generator)),
            generator,
            store,
            completion,
            scheduler,
            config,
            conversation_logger,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<FallbackScheduler> {
        &self.scheduler
    }

    /// Have every bot of `id` remember what mattered in the conversation.
    pub async fn form_core_memories(
        &self,
        id: ConversationId,
    ) -> Result<FormedMemories, OrchestratorError> {
        Ok(self.memories.form(id).await?)
    }

    fn delays(&self) -> &FallbackDelays {
        &self.config.fallback
    }

    /// Run one generation cycle for `id`.
    pub async fn run_cycle(&self, id: ConversationId) -> Result<CycleReport, OrchestratorError> {
        let started_at = Utc::now();
        self.scheduler.cancel(id);

        let conversation = Arc::new(self.store.conversation(id).await?);
        debug!(
            "Cycle started for {} ({} messages)",
            id,
            conversation.messages.len()
        );

        let mut contributions = self.reactive(&conversation).await?;

        let ctx = StrategyContext::new(
            Arc::clone(&conversation),
            Arc::clone(&self.generator),
            Arc::clone(&self.store),
        );
        let (chain, independent) = tokio::join!(self.discourse_chain(&ctx), self.independent(&ctx));
        contributions.extend(chain?);
        contributions.extend(independent);

        for contribution in &contributions {
            self.log_contribution(id, contribution);
        }

        let posted = self.fan_in(&conversation, &contributions).await?;

        let fallback = if posted.is_empty() {
            let delay = self.delays().estimate(&conversation);
            self.scheduler.arm(id, delay, started_at);
            self.conversation_logger.log(ConversationEvent::new(
                "fallback_armed",
                json!({
                    "conversation": id.get(),
                    "delay_secs": delay.as_secs(),
                    "origin": started_at.to_rfc3339(),
                }),
            ));
            Some(delay)
        } else {
            None
        };

        let metrics = if posted.is_empty() {
            ConversationMetrics::compute(&conversation)
        } else {
            ConversationMetrics::compute(&self.store.conversation(id).await?)
        };

        info!(
            "Cycle completed for {}: {} contribution(s), {} posted",
            id,
            contributions.len(),
            posted.len()
        );
        self.conversation_logger.log(ConversationEvent::new(
            "cycle_completed",
            json!({
                "conversation": id.get(),
                "contributions": contributions.len(),
                "posted": posted.len(),
                "fallback_secs": fallback.map(|d| d.as_secs()),
                "bot_words_total": metrics.bot_words_total,
                "bot_words_per_utterance": metrics.bot_words_per_utterance,
                "evenness": metrics.evenness,
            }),
        ));

        Ok(CycleReport {
            conversation: id,
            started_at,
            contributions,
            posted,
            fallback,
            metrics,
        })
    }

    /// Mention detector, then the indirect detector when no mention fired.
    async fn reactive(
        &self,
        conversation: &Arc<Conversation>,
    ) -> Result<Vec<Contribution>, StoreError> {
        let mut contributions = Vec::new();
        if conversation.is_enabled(StrategyKind::Mention) {
            contributions.extend(self.mention.detect(conversation).await?);
        }

        let mention_fired = contributions.iter().any(|c| c.result.is_fired());
        if !mention_fired && conversation.is_enabled(StrategyKind::Indirect) {
            contributions.extend(self.indirect.detect(conversation).await);
        }
        Ok(contributions)
    }

    /// Summarize, then Transition and Resolve over the refreshed sub-topics.
    async fn discourse_chain(
        &self,
        ctx: &StrategyContext,
    ) -> Result<Vec<Contribution>, StoreError> {
        let mut contributions = Vec::new();
        let mut ctx = ctx.clone();

        if let Some(summarize) = self
            .strategies
            .enabled(&ctx.conversation, StrategyKind::Summarize)
        {
            let result = summarize.evaluate(&ctx).await;
            contributions.push(Contribution::from_strategy(StrategyKind::Summarize, result));

            let mut refreshed = Conversation::clone(&ctx.conversation);
            refreshed.sub_topics = self.store.sub_topics(refreshed.id).await?;
            ctx = ctx.with_conversation(Arc::new(refreshed));
        }

        let readers = [StrategyKind::Transition, StrategyKind::Resolve]
            .into_iter()
            .filter_map(|kind| self.strategies.enabled(&ctx.conversation, kind));
        contributions.extend(evaluate_all(readers, &ctx).await);
        Ok(contributions)
    }

    /// Strategies that do not read the discourse state.
    async fn independent(&self, ctx: &StrategyContext) -> Vec<Contribution> {
        let strategies = [StrategyKind::Encourage, StrategyKind::ChimeIn]
            .into_iter()
            .filter_map(|kind| self.strategies.enabled(&ctx.conversation, kind));
        evaluate_all(strategies, ctx).await
    }

    /// Merge fired proposals per bot and post at most one message each.
    async fn fan_in(
        &self,
        conversation: &Conversation,
        contributions: &[Contribution],
    ) -> Result<Vec<Message>, StoreError> {
        let mut by_bot: BTreeMap<ParticipantId, Vec<&Proposal>> = BTreeMap::new();
        for contribution in contributions {
            if let FireResult::Fired(proposal) = &contribution.result {
                by_bot.entry(proposal.bot).or_default().push(proposal);
            }
        }

        let merged = join_all(by_bot.into_iter().map(|(bot, proposals)| async move {
            let candidates: Vec<String> = proposals.iter().map(|p| p.text.clone()).collect();
            let result = match conversation.participant(bot) {
                Some(participant) => {
                    self.synthesizer
                        .synthesize(conversation, participant, &candidates)
                        .await
                }
                None => Err(ContributorError::Fatal(format!("Unknown bot {}", bot))),
            };
            (bot, proposals, result)
        }))
        .await;

        let mut posted = Vec::new();
        for (bot, proposals, result) in merged {
            match result {
                Ok(text) => {
                    let message = self.store.append_message(conversation.id, bot, &text).await?;
                    self.apply_post_effects(&message, &proposals).await?;
                    self.log_post(conversation, &message, &proposals);
                    posted.push(message);
                }
                Err(e) => {
                    warn!(
                        "Synthesis for {} failed, dropping {} candidate(s): {}",
                        bot,
                        proposals.len(),
                        e
                    );
                    self.conversation_logger.log(ConversationEvent::new(
                        "synthesis_failed",
                        json!({
                            "conversation": conversation.id.get(),
                            "bot": bot.get(),
                            "error": e.to_string(),
                        }),
                    ));
                }
            }
        }
        Ok(posted)
    }

    /// Advance the state of every strategy that contributed to `message`.
    async fn apply_post_effects(
        &self,
        message: &Message,
        proposals: &[&Proposal],
    ) -> Result<(), StoreError> {
        let sources: BTreeSet<StrategyKind> = proposals
            .iter()
            .map(|p| p.source)
            .filter(|kind| !kind.is_reactive())
            .collect();
        for kind in sources {
            self.store
                .set_strategy_state(
                    message.conversation_id,
                    StrategyState::fired_at(kind, message.timestamp),
                )
                .await?;
        }

        for proposal in proposals {
            if let Some(PostEffect::Summarized { participants }) = &proposal.effect {
                self.store
                    .record_summarization(message.conversation_id, *participants, message.timestamp)
                    .await?;
            }
        }
        Ok(())
    }

    /// Handle an elapsed fallback timer armed at `origin`.
    pub async fn fire_fallback(
        &self,
        id: ConversationId,
        origin: DateTime<Utc>,
    ) -> Result<FallbackOutcome, OrchestratorError> {
        let conversation = Arc::new(self.store.conversation(id).await?);

        let outcome = match conversation.latest() {
            None => FallbackOutcome::EmptyConversation,
            Some(latest) if latest.timestamp >= origin => FallbackOutcome::Stale,
            Some(latest) if !mentioned_humans(&conversation, &latest.text).is_empty() => {
                FallbackOutcome::HumanMentioned
            }
            Some(_) if already_chimed(&conversation) => FallbackOutcome::AlreadyChimed,
            Some(_) => self.chime_in_silence(&conversation).await?,
        };

        match &outcome {
            FallbackOutcome::Posted(message) => {
                info!("Fallback chime-in posted in {}", id);
                self.conversation_logger.log(ConversationEvent::new(
                    "fallback_fired",
                    json!({
                        "conversation": id.get(),
                        "outcome": "posted",
                        "message": message.id.get(),
                    }),
                ));
            }
            other => {
                info!("Fallback for {} aborted: {:?}", id, other);
                self.conversation_logger.log(ConversationEvent::new(
                    "fallback_fired",
                    json!({
                        "conversation": id.get(),
                        "outcome": fallback_label(other),
                    }),
                ));
            }
        }
        Ok(outcome)
    }

    async fn chime_in_silence(
        &self,
        conversation: &Arc<Conversation>,
    ) -> Result<FallbackOutcome, StoreError> {
        let Some(strategy) = self
            .strategies
            .enabled(conversation, StrategyKind::ChimeInSilence)
        else {
            return Ok(FallbackOutcome::Disabled);
        };

        let ctx = StrategyContext::new(
            Arc::clone(conversation),
            Arc::clone(&self.generator),
            Arc::clone(&self.store),
        );
        let contribution =
            Contribution::from_strategy(strategy.kind(), strategy.evaluate(&ctx).await);
        self.log_contribution(conversation.id, &contribution);

        let FireResult::Fired(proposal) = &contribution.result else {
            return Ok(FallbackOutcome::NotPosted(contribution));
        };
        let message = self
            .store
            .append_message(conversation.id, proposal.bot, &proposal.text)
            .await?;
        self.apply_post_effects(&message, &[proposal]).await?;
        self.log_post(conversation, &message, &[proposal]);
        Ok(FallbackOutcome::Posted(message))
    }

    fn log_contribution(&self, id: ConversationId, contribution: &Contribution) {
        let bot = contribution.bot.map(|b| b.get());
        let detail = match &contribution.result {
            FireResult::Fired(proposal) => {
                info!("[{}] Fired for {}", contribution.kind, proposal.bot);
                json!({ "text": proposal.text })
            }
            FireResult::NoFire(reason) => {
                debug!("[{}] No fire: {}", contribution.kind, reason);
                json!({ "reason": reason })
            }
            FireResult::Failed(error) => {
                warn!("[{}] Failed: {}", contribution.kind, error);
                json!({ "error": error.to_string() })
            }
        };
        self.conversation_logger.log(ConversationEvent::new(
            "contributor_outcome",
            json!({
                "conversation": id.get(),
                "strategy": contribution.kind.name(),
                "bot": bot,
                "outcome": contribution.result.label(),
                "detail": detail,
            }),
        ));
    }

    fn log_post(&self, conversation: &Conversation, message: &Message, proposals: &[&Proposal]) {
        let author = conversation
            .participant(message.author)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| message.author.to_string());
        info!("{} posted in {}", author, conversation.id);
        self.conversation_logger.log(ConversationEvent::new(
            "message_posted",
            json!({
                "conversation": conversation.id.get(),
                "message": message.id.get(),
                "author": author,
                "sources": proposals.iter().map(|p| p.source.name()).collect::<Vec<_>>(),
                "text": message.text,
            }),
        ));
    }
}

/// Evaluate `strategies` concurrently over the same context.
async fn evaluate_all(
    strategies: impl Iterator<Item = Arc<dyn Strategy>>,
    ctx: &StrategyContext,
) -> Vec<Contribution> {
    join_all(strategies.map(|strategy| async move {
        let result = strategy.evaluate(ctx).await;
        Contribution::from_strategy(strategy.kind(), result)
    }))
    .await
}

/// The last two messages come from the same bot.
fn already_chimed(conversation: &Conversation) -> bool {
    match conversation.last_n(2) {
        [previous, latest] => {
            previous.author == latest.author && conversation.is_bot_message(latest)
        }
        _ => false,
    }
}

fn fallback_label(outcome: &FallbackOutcome) -> &'static str {
    match outcome {
        FallbackOutcome::Posted(_) => "posted",
        FallbackOutcome::Stale => "stale",
        FallbackOutcome::EmptyConversation => "empty_conversation",
        FallbackOutcome::HumanMentioned => "human_mentioned",
        FallbackOutcome::AlreadyChimed => "already_chimed",
        FallbackOutcome::Disabled => "disabled",
        FallbackOutcome::NotPosted(_) => "not_posted",
    }
}
