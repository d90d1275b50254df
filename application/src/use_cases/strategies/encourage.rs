//! Encourage strategy: invite lurkers back into the discussion.

use super::{Strategy, StrategyContext};
use crate::config::EncourageParams;
use async_trait::async_trait;
use polybot_domain::strategy::analysis::find_lurkers;
use polybot_domain::{Cooldown, FireResult, Intent, NoFireReason, Proposal, StrategyKind};
use tracing::info;

pub struct Encourage {
    params: EncourageParams,
}

impl Encourage {
    pub fn new(params: EncourageParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Strategy for Encourage {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Encourage
    }

    fn cooldown(&self) -> Cooldown {
        Cooldown::messages(self.params.cooldown)
    }

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal> {
        let conversation = &ctx.conversation;
        let lurkers: Vec<String> = find_lurkers(conversation, &self.params.lurkers)
            .into_iter()
            .filter_map(|id| conversation.participant(id))
            .map(|p| p.name().to_string())
            .collect();
        if lurkers.is_empty() {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        }
        if !ctx.cooldown_elapsed(self) {
            return FireResult::NoFire(NoFireReason::CooldownActive);
        }
        let Some(bot) = ctx.target() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };

        info!("[Encourage] Encouraging lurkers: {:?}", lurkers);
        ctx.generator
            .speak(conversation, bot, Intent::Encourage { lurkers })
            .await
    }
}
