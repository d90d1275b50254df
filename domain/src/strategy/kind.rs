//! The closed set of contributors an orchestration cycle can run.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Reactive detectors and proactive strategies.
///
/// Enabled strategies are stored by [`StrategyKind::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "Mention")]
    Mention,
    #[serde(rename = "Indirect")]
    Indirect,
    #[serde(rename = "Summarize")]
    Summarize,
    #[serde(rename = "Encourage")]
    Encourage,
    #[serde(rename = "Transition")]
    Transition,
    #[serde(rename = "Resolve")]
    Resolve,
    #[serde(rename = "Chime-in")]
    ChimeIn,
    #[serde(rename = "Chime-in-silence")]
    ChimeInSilence,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::Mention,
        StrategyKind::Indirect,
        StrategyKind::Summarize,
        StrategyKind::Encourage,
        StrategyKind::Transition,
        StrategyKind::Resolve,
        StrategyKind::ChimeIn,
        StrategyKind::ChimeInSilence,
    ];

    /// Strategies polled on every cycle, in evaluation order.
    pub const PROACTIVE: [StrategyKind; 5] = [
        StrategyKind::Summarize,
        StrategyKind::Encourage,
        StrategyKind::Transition,
        StrategyKind::Resolve,
        StrategyKind::ChimeIn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Mention => "Mention",
            StrategyKind::Indirect => "Indirect",
            StrategyKind::Summarize => "Summarize",
            StrategyKind::Encourage => "Encourage",
            StrategyKind::Transition => "Transition",
            StrategyKind::Resolve => "Resolve",
            StrategyKind::ChimeIn => "Chime-in",
            StrategyKind::ChimeInSilence => "Chime-in-silence",
        }
    }

    pub fn is_reactive(&self) -> bool {
        matches!(self, StrategyKind::Mention | StrategyKind::Indirect)
    }

    /// Whether a waiting window applies between two firings.
    pub fn is_cooldown_gated(&self) -> bool {
        matches!(
            self,
            StrategyKind::Summarize
                | StrategyKind::Encourage
                | StrategyKind::Transition
                | StrategyKind::Resolve
        )
    }

    /// Whether the strategy speaks regardless of the turn gate.
    pub fn overrides_turn_gate(&self) -> bool {
        matches!(
            self,
            StrategyKind::Summarize
                | StrategyKind::Encourage
                | StrategyKind::Transition
                | StrategyKind::Resolve
                | StrategyKind::ChimeInSilence
        )
    }

    /// Writes sub-topic statuses and the running summary.
    pub fn writes_discourse(&self) -> bool {
        matches!(self, StrategyKind::Summarize)
    }

    /// Reads sub-topic statuses and must run after the writer.
    pub fn reads_discourse(&self) -> bool {
        matches!(self, StrategyKind::Transition | StrategyKind::Resolve)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "mention" => Ok(StrategyKind::Mention),
            "indirect" => Ok(StrategyKind::Indirect),
            "summarize" | "summarise" => Ok(StrategyKind::Summarize),
            "encourage" => Ok(StrategyKind::Encourage),
            "transition" => Ok(StrategyKind::Transition),
            "resolve" => Ok(StrategyKind::Resolve),
            "chimein" => Ok(StrategyKind::ChimeIn),
            "chimeinsilence" => Ok(StrategyKind::ChimeInSilence),
            _ => Err(DomainError::UnknownStrategy(s.to_string())),
        }
    }
}
