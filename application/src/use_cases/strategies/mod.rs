//! Proactive strategies
//!
//! Each strategy decides on its own whether to speak and through which bot.
//! The orchestrator owns their [`StrategyState`](polybot_domain::StrategyState)
//! and only advances it after a post made on their behalf.

pub mod chime_in;
pub mod encourage;
pub mod resolve;
pub mod summarize;
pub mod transition;

use crate::config::StrategyParams;
use crate::ports::conversation_store::ConversationStore;
use crate::use_cases::generation::Generator;
use crate::use_cases::shared::proactive_target;
use async_trait::async_trait;
use polybot_domain::{
    Conversation, Cooldown, FireResult, Participant, ParticipantId, Proposal, StrategyKind,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use chime_in::{RepetitionChimeIn, SilenceChimeIn};
pub use encourage::Encourage;
pub use resolve::Resolve;
pub use summarize::Summarize;
pub use transition::Transition;

/// What a strategy sees during one evaluation.
///
/// The proactive target is picked once per context, so every strategy of a
/// cycle speaks through the same bot.
#[derive(Clone)]
pub struct StrategyContext {
    pub conversation: Arc<Conversation>,
    pub generator: Arc<Generator>,
    pub store: Arc<dyn ConversationStore>,
    target: Option<ParticipantId>,
}

impl StrategyContext {
    pub fn new(
        conversation: Arc<Conversation>,
        generator: Arc<Generator>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let target = proactive_target(&conversation).map(|bot| bot.id);
        Self {
            conversation,
            generator,
            store,
            target,
        }
    }

    /// The bot proactive strategies speak through in this cycle.
    pub fn target(&self) -> Option<&Participant> {
        self.target.and_then(|id| self.conversation.participant(id))
    }

    /// Same context over a newer conversation snapshot, keeping the target.
    pub fn with_conversation(&self, conversation: Arc<Conversation>) -> Self {
        Self {
            conversation,
            ..self.clone()
        }
    }

    /// Whether the strategy's waiting window has passed.
    pub fn cooldown_elapsed(&self, strategy: &dyn Strategy) -> bool {
        if !strategy.kind().is_cooldown_gated() {
            return true;
        }
        let state = self.conversation.strategy_state(strategy.kind());
        strategy.cooldown().has_elapsed(&state, &self.conversation)
    }
}

/// A proactive contributor.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Waiting window between two successful firings.
    fn cooldown(&self) -> Cooldown;

    async fn evaluate(&self, ctx: &StrategyContext) -> FireResult<Proposal>;
}

/// Typed registry of the strategies a cycle may run.
pub struct StrategyRegistry {
    strategies: BTreeMap<StrategyKind, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Every built-in strategy configured from `params`.
    pub fn standard(params: &StrategyParams) -> Self {
        Self::empty()
            .with(Arc::new(Summarize::new(params.summarize.clone())))
            .with(Arc::new(Encourage::new(params.encourage.clone())))
            .with(Arc::new(Transition::new(params.transition.clone())))
            .with(Arc::new(Resolve::new(params.resolve.clone())))
            .with(Arc::new(RepetitionChimeIn::new(params.chime_in.clone())))
            .with(Arc::new(SilenceChimeIn))
    }

    /// Register `strategy`, replacing any strategy of the same kind.
    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.insert(strategy.kind(), strategy);
        self
    }

    pub fn get(&self, kind: StrategyKind) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(&kind).cloned()
    }

    /// The registered strategy for `kind` if `conversation` enables it.
    pub fn enabled(&self, conversation: &Conversation, kind: StrategyKind) -> Option<Arc<dyn Strategy>> {
        if conversation.is_enabled(kind) {
            self.get(kind)
        } else {
            None
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.strategies.keys().copied()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::CompletionPolicy;
    use crate::ports::completion::CompletionService;
    use crate::testing::FakeStore;
    use polybot_domain::TurnGate;

    pub(crate) fn context(
        store: &Arc<FakeStore>,
        completion: Arc<dyn CompletionService>,
    ) -> StrategyContext {
        let generator = Generator::new(completion, CompletionPolicy::default(), TurnGate::default(), 50);
        StrategyContext::new(Arc::new(store.snapshot()), Arc::new(generator), store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use super::test_support::context;

    #[test]
    fn test_standard_registry_covers_proactive_kinds() {
        let registry = StrategyRegistry::standard(&StrategyParams::default());
        for kind in StrategyKind::PROACTIVE {
            assert!(registry.get(kind).is_some(), "{} missing", kind);
        }
        assert!(registry.get(StrategyKind::ChimeInSilence).is_some());
        assert!(registry.get(StrategyKind::Mention).is_none());
    }

    #[test]
    fn test_enabled_respects_conversation() {
        let registry = StrategyRegistry::standard(&StrategyParams::default());
        let mut conversation = conversation();
        assert!(registry.enabled(&conversation, StrategyKind::Resolve).is_some());
        conversation.enabled_strategies.remove(&StrategyKind::Resolve);
        assert!(registry.enabled(&conversation, StrategyKind::Resolve).is_none());
    }

    #[test]
    fn test_target_is_shared_by_derived_contexts() {
        let store = Arc::new(FakeStore::new(conversation()));
        store.seed(ALICE, "hi");
        let ctx = context(&store, Arc::new(ScriptedCompletion::constant("x")));
        let chosen = ctx.target().unwrap().id;
        assert!(chosen == BOT || chosen == HELPER);

        store.seed(BOB, "hello");
        let refreshed = ctx.with_conversation(Arc::new(store.snapshot()));
        assert_eq!(refreshed.target().unwrap().id, chosen);
    }

    #[test]
    fn test_target_follows_last_active_bot() {
        let store = Arc::new(FakeStore::new(conversation()));
        store.seed(HELPER, "hello");
        store.seed(ALICE, "hi");
        let ctx = context(&store, Arc::new(ScriptedCompletion::constant("x")));
        assert_eq!(ctx.target().unwrap().id, HELPER);
    }

    #[test]
    fn test_cooldown_applies_only_to_gated_kinds() {
        let store = Arc::new(FakeStore::new(conversation()));
        store.seed(ALICE, "one");
        store.seed(BOB, "two");
        let ctx = context(&store, Arc::new(ScriptedCompletion::constant("x")));
        let registry = StrategyRegistry::standard(&StrategyParams::default());

        let resolve = registry.get(StrategyKind::Resolve).unwrap();
        assert!(!ctx.cooldown_elapsed(resolve.as_ref()));
        let chime_in = registry.get(StrategyKind::ChimeIn).unwrap();
        assert!(ctx.cooldown_elapsed(chime_in.as_ref()));
    }
}
