//! Shared types and helpers for the orchestration use cases.

use polybot_domain::{
    Conversation, FireResult, Participant, ParticipantId, Proposal, StrategyKind,
};
use rand::seq::IteratorRandom;

/// Outcome of one contributor for one bot.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub kind: StrategyKind,
    /// The bot the contributor spoke through, when one was chosen.
    pub bot: Option<ParticipantId>,
    pub result: FireResult<Proposal>,
}

impl Contribution {
    pub fn new(kind: StrategyKind, bot: Option<ParticipantId>, result: FireResult<Proposal>) -> Self {
        Self { kind, bot, result }
    }

    /// Contribution of a strategy that picks its own bot.
    pub fn from_strategy(kind: StrategyKind, result: FireResult<Proposal>) -> Self {
        let bot = match &result {
            FireResult::Fired(proposal) => Some(proposal.bot),
            _ => None,
        };
        Self::new(kind, bot, result)
    }
}

/// The bot proactive strategies speak through: the most recently active
/// one, or a random bot when none has spoken yet.
pub(crate) fn proactive_target(conversation: &Conversation) -> Option<&Participant> {
    conversation
        .last_active_bot()
        .or_else(|| conversation.bots().choose(&mut rand::thread_rng()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn test_proactive_target_prefers_last_active_bot() {
        let store = FakeStore::new(conversation());
        store.seed(ALICE, "hi");
        let snapshot = store.snapshot();
        let target = proactive_target(&snapshot).unwrap();
        assert!(target.is_bot());

        store.seed(HELPER, "hello");
        store.seed(BOB, "hey");
        assert_eq!(proactive_target(&store.snapshot()).unwrap().id, HELPER);
    }

    #[test]
    fn test_proactive_target_without_bots() {
        let mut conversation = conversation();
        conversation.participants.retain(|p| p.is_human());
        assert!(proactive_target(&conversation).is_none());
    }
}
