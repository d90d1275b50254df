//! Transition strategy: move the group on when interest fades.

use super::{Strategy, StrategyContext};
use crate::config::TransitionParams;
use async_trait::async_trait;
use polybot_domain::strategy::analysis::{interest_ratio, nothing_being_discussed};
use polybot_domain::{Cooldown, FireResult, Intent, NoFireReason, Proposal, StrategyKind};
use tracing::info;

pub struct Transition {
    params: TransitionParams,
}

impl Transition {
    pub fn new(params: TransitionParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Strategy for Transition {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Transition
    }

    fn cooldown(&self) -> Cooldown {
        Cooldown::messages(self.params.cooldown)
    }

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal> {
        let conversation = &ctx.conversation;
        let Some(ratio) = interest_ratio(conversation, self.params.short_context) else {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        };
        let idle = nothing_being_discussed(conversation);
        if !idle && ratio > self.params.interest_threshold {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        }
        if !ctx.cooldown_elapsed(self) {
            return FireResult::NoFire(NoFireReason::CooldownActive);
        }
        let Some(bot) = ctx.target() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };

        info!(
            "[Transition] Transitioning to a new sub-topic (idle: {}, interest: {:.2})",
            idle, ratio
        );
        ctx.generator.speak(conversation, bot, Intent::Transition).await
    }
}
