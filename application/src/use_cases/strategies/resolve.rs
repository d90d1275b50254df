//! Resolve strategy: help a stalled discussion reach a conclusion.

use super::{Strategy, StrategyContext};
use crate::config::ResolveParams;
use async_trait::async_trait;
use polybot_domain::strategy::analysis::is_stagnant;
use polybot_domain::{Cooldown, FireResult, Intent, NoFireReason, Proposal, StrategyKind};
use tracing::info;

pub struct Resolve {
    params: ResolveParams,
}

impl Resolve {
    pub fn new(params: ResolveParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Strategy for Resolve {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Resolve
    }

    fn cooldown(&self) -> Cooldown {
        Cooldown::messages(self.params.cooldown)
    }

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal> {
        let conversation = &ctx.conversation;
        if !is_stagnant(conversation, self.params.stagnation_period) {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        }
        if !ctx.cooldown_elapsed(self) {
            return FireResult::NoFire(NoFireReason::CooldownActive);
        }
        let Some(bot) = ctx.target() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };

        info!("[Resolve] Stagnation detected, suggesting a resolution");
        ctx.generator.speak(conversation, bot, Intent::Resolve).await
    }
}
