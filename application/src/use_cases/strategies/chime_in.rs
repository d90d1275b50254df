//! Chime-in strategies
//!
//! - [`RepetitionChimeIn`]: the conversation repeats itself
//! - [`SilenceChimeIn`]: nobody spoke for a while (fired by the fallback timer)

use super::{Strategy, StrategyContext};
use crate::config::ChimeInParams;
use async_trait::async_trait;
use polybot_domain::strategy::analysis::is_repetitive;
use polybot_domain::{Cooldown, FireResult, Intent, NoFireReason, Proposal, StrategyKind};
use tracing::info;

pub struct RepetitionChimeIn {
    params: ChimeInParams,
}

impl RepetitionChimeIn {
    pub fn new(params: ChimeInParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Strategy for RepetitionChimeIn {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ChimeIn
    }

    fn cooldown(&self) -> Cooldown {
        Cooldown::NONE
    }

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal> {
        let conversation = &ctx.conversation;
        if !is_repetitive(conversation, self.params.repetition_threshold) {
            return FireResult::NoFire(NoFireReason::ConditionNotMet);
        }
        let Some(bot) = ctx.target() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };

        info!("[Chime-in] Repetitive conversation, chiming in as {}", bot.name());
        ctx.generator
            .speak(conversation, bot, Intent::ChimeInRepetition)
            .await
    }
}

/// Payload of the fallback timer.
pub struct SilenceChimeIn;

#[async_trait]
impl Strategy for SilenceChimeIn {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ChimeInSilence
    }

    fn cooldown(&self) -> Cooldown {
        Cooldown::NONE
    }

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal> {
        let conversation = &ctx.conversation;
        let Some(bot) = ctx.target() else {
            return FireResult::NoFire(NoFireReason::NoEligibleBot);
        };

        info!("[Chime-in] Extended silence, chiming in as {}", bot.name());
        ctx.generator
            .speak(conversation, bot, Intent::ChimeInSilence)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::context;
    use super::*;
    use crate::testing::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_repeat_three_times_triggers_chime_in() {
        let store = Arc::new(FakeStore::new(conversation()));
        for _ in 0..3 {
            store.seed(ALICE, "Repeat");
        }
        let completion = Arc::new(ScriptedCompletion::constant("Shall we try something new?"));
        let ctx = context(&store, completion);

        let result = RepetitionChimeIn::new(ChimeInParams::default()).evaluate(&ctx).await;
        assert_eq!(result.fired().unwrap().source, StrategyKind::ChimeIn);
    }

    #[tokio::test]
    async fn test_repetition_chime_in_uses_turn_gate() {
        let store = Arc::new(FakeStore::new(conversation()));
        for _ in 0..3 {
            store.seed(BOT, "Repeat");
        }
        let completion = Arc::new(ScriptedCompletion::constant("x"));
        let ctx = context(&store, completion.clone());

        let result = RepetitionChimeIn::new(ChimeInParams::default()).evaluate(&ctx).await;
        assert_eq!(result, FireResult::NoFire(NoFireReason::TurnDenied));
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_two_repeats_are_not_enough() {
        let store = Arc::new(FakeStore::new(conversation()));
        store.seed(ALICE, "Repeat");
        store.seed(ALICE, "Repeat");
        let ctx = context(&store, Arc::new(ScriptedCompletion::constant("x")));

        let result = RepetitionChimeIn::new(ChimeInParams::default()).evaluate(&ctx).await;
        assert_eq!(result, FireResult::NoFire(NoFireReason::ConditionNotMet));
    }

    #[tokio::test]
    async fn test_silence_chime_in_overrides_gate() {
        let store = Arc::new(FakeStore::new(conversation()));
        store.seed(ALICE, "hi");
        store.seed(BOT, "hello");
        let ctx = context(&store, Arc::new(ScriptedCompletion::constant("Anyone there?")));

        let result = SilenceChimeIn.evaluate(&ctx).await;
        let proposal = result.fired().unwrap();
        assert_eq!(proposal.bot, BOT);
        assert_eq!(proposal.source, StrategyKind::ChimeInSilence);
    }
}
