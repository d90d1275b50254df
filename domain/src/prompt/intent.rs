//! Why a bot is being asked to speak.

use crate::strategy::kind::StrategyKind;

/// The reason behind a generation request. Selects the instruction appended
/// after the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The bot was addressed with `@name`.
    Mention,
    /// The latest message is an open question.
    Indirect,
    /// Nudge quiet participants by name.
    Encourage { lurkers: Vec<String> },
    /// Steer the group to a new sub-topic.
    Transition,
    /// Help the group settle a stalled point.
    Resolve,
    /// Break a loop of identical messages.
    ChimeInRepetition,
    /// Break a long silence.
    ChimeInSilence,
}

impl Intent {
    /// Strategy the resulting proposal is attributed to.
    pub fn source(&self) -> StrategyKind {
        match self {
            Intent::Mention => StrategyKind::Mention,
            Intent::Indirect => StrategyKind::Indirect,
            Intent::Encourage { .. } => StrategyKind::Encourage,
            Intent::Transition => StrategyKind::Transition,
            Intent::Resolve => StrategyKind::Resolve,
            Intent::ChimeInRepetition => StrategyKind::ChimeIn,
            Intent::ChimeInSilence => StrategyKind::ChimeInSilence,
        }
    }

    pub fn overrides_turn_gate(&self) -> bool {
        self.source().overrides_turn_gate()
    }

    /// Bare refusals ("no") are only meaningful as answers to a mention.
    pub fn discards_refusal(&self) -> bool {
        matches!(self, Intent::Mention)
    }
}
