//! Summarize strategy
//!
//! Keeps the sub-topic statuses and the running summary up to date on every
//! cycle, and posts the summary once enough participants joined in since
//! the last one.

use super::{Strategy, StrategyContext};
use crate::config::SummarizeParams;
use crate::ports::completion::{CompletionRequest, GenerationParams};
use async_trait::async_trait;
use polybot_domain::prompt::utterance::transcript;
use polybot_domain::strategy::analysis::active_participants;
use polybot_domain::{
    ActivityWindow, BotProfile, ContributorError, Cooldown, DiscourseUpdate, FireResult,
    NoFireReason, Participant, PostEffect, PromptTemplate, Proposal, StrategyKind, SubTopicStatus,
    Utterance, parse_sub_topic_lines,
};
use tracing::{debug, info, warn};

pub struct Summarize {
    params: SummarizeParams,
}

impl Summarize {
    pub fn new(params: SummarizeParams) -> Self {
        Self { params }
    }

    /// Classify the tracked sub-topics over the short context.
    async fn classify_sub_topics(
        &self,
        ctx: &StrategyContext,
    ) -> Result<Vec<(String, SubTopicStatus)>, ContributorError> {
        let conversation = &ctx.conversation;
        let mut utterances = vec![Utterance::system(PromptTemplate::sub_topic_system())];
        utterances.extend(transcript(
            conversation,
            conversation.last_n(self.params.short_context),
        ));
        utterances.push(Utterance::instruction(PromptTemplate::sub_topic_prompt(
            &conversation.sub_topics,
        )));

        let request = CompletionRequest::new(utterances, ctx.generator.analysis_params());
        let text = ctx.generator.complete(request).await?;
        Ok(parse_sub_topic_lines(&text))
    }

    /// Regenerate the running summary in the voice of `bot`.
    async fn regenerate_summary(
        &self,
        ctx: &StrategyContext,
        bot: &BotProfile,
    ) -> Result<String, ContributorError> {
        let conversation = &ctx.conversation;
        let names: Vec<&str> = conversation.participants.iter().map(Participant::name).collect();
        let mut utterances = transcript(conversation, &conversation.messages);
        utterances.push(Utterance::instruction(PromptTemplate::summarize_prompt(
            &names,
            conversation.summary.text.as_deref(),
        )));

        let params = GenerationParams::new(bot.model.clone(), bot.temperature);
        ctx.generator
            .complete(CompletionRequest::new(utterances, params))
            .await
    }

    /// Run both analyses and commit them together, or not at all.
    async fn refresh_discourse(
        &self,
        ctx: &StrategyContext,
        bot: &BotProfile,
    ) -> Result<DiscourseUpdate, ContributorError> {
        let (statuses, summary) = tokio::join!(
            self.classify_sub_topics(ctx),
            self.regenerate_summary(ctx, bot)
        );
        let update = DiscourseUpdate {
            statuses: statuses?,
            summary: summary?,
        };

        let conversation = &ctx.conversation;
        let Some(latest) = conversation.latest() else {
            return Err(ContributorError::EmptyConversation);
        };
        let changed = ctx
            .store
            .apply_discourse_update(conversation.id, &update, latest.timestamp)
            .await
            .map_err(|e| {
                ContributorError::Fatal(format!("Could not store discourse update: {}", e))
            })?;
        for name in &changed {
            debug!("[Summarize] Sub-topic '{}' changed status", name);
        }

        info!(
            "[Summarize] Updated {} sub-topic(s) and the running summary",
            update.statuses.len()
        );
        Ok(update)
    }
}

#[async_trait]
impl Strategy for Summarize {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Summarize
    }

    fn cooldown(&self) -> Cooldown {
        Cooldown::messages(self.params.cooldown)
    }

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal> {
        let conversation = &ctx.conversation;
        if conversation.is_empty() {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        }
        let Some(target) = ctx.target() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };
        let Some(profile) = target.as_bot() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };

        let update = match self.refresh_discourse(ctx, profile).await {
            Ok(update) => update,
            Err(e) => {
                warn!("[Summarize] Discourse analysis failed: {}", e);
                return FireResult::Failed(e);
            }
        };

        let participants = active_participants(
            conversation,
            ActivityWindow::Since(conversation.summary.updated_at),
        )
        .len();
        if participants < self.params.participant_threshold {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        }
        if !ctx.cooldown_elapsed(self) {
            return FireResult::NoFire(NoFireReason::CooldownActive);
        }

        info!(
            "[Summarize] Summary triggered with {} active participants",
            participants
        );
        FireResult::Fired(
            Proposal::new(target.id, StrategyKind::Summarize, update.summary)
                .with_effect(PostEffect::Summarized { participants }),
        )
    }
}
