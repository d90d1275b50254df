//! Tagged results returned by every detector and strategy.
//!
//! A contributor either legitimately decides not to act ([`FireResult::NoFire`]),
//! produces something ([`FireResult::Fired`]), or fails
//! ([`FireResult::Failed`]). Callers handle all three so that a deliberate
//! no-op is never confused with a silent failure.

use crate::core::ids::ParticipantId;
use crate::strategy::kind::StrategyKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a contributor chose not to act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoFireReason {
    /// The triggering condition does not hold.
    ConditionNotMet,
    /// The waiting window since the last firing has not elapsed.
    CooldownActive,
    /// The turn gate refused the bot.
    TurnDenied,
    /// The bot answered with a refusal.
    Declined,
    /// There is no bot to speak through.
    NoEligibleBot,
}

impl std::fmt::Display for NoFireReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NoFireReason::ConditionNotMet => "condition not met",
            NoFireReason::CooldownActive => "cooldown active",
            NoFireReason::TurnDenied => "turn denied",
            NoFireReason::Declined => "declined",
            NoFireReason::NoEligibleBot => "no eligible bot",
        };
        f.write_str(s)
    }
}

/// Why a contributor failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContributorError {
    /// Retryable service failure (rate limit, timeout) that outlived its retries.
    #[error("Transient service error: {0}")]
    Transient(String),

    /// Non-retryable failure, including malformed responses.
    #[error("Service error: {0}")]
    Fatal(String),

    /// Generated text mentions its own author and was discarded.
    #[error("Self-referential response from {0}")]
    SelfReferential(String),

    /// Turn-taking cannot be evaluated on an empty conversation.
    #[error("Conversation has no messages")]
    EmptyConversation,
}

impl ContributorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ContributorError::Transient(_))
    }
}

/// Side effect applied only after a proposal was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostEffect {
    /// A summary was delivered to this many distinct contributors.
    Summarized { participants: usize },
}

/// Text a contributor wants a specific bot to post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub bot: ParticipantId,
    pub source: StrategyKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<PostEffect>,
}

impl Proposal {
    pub fn new(bot: ParticipantId, source: StrategyKind, text: impl Into<String>) -> Self {
        Self {
            bot,
            source,
            text: text.into(),
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: PostEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// `NoFire | Fired(T) | Failed(kind)`.
#[derive(Debug, Clone, PartialEq)]
pub enum FireResult<T> {
    NoFire(NoFireReason),
    Fired(T),
    Failed(ContributorError),
}

impl<T> FireResult<T> {
    pub fn is_fired(&self) -> bool {
        matches!(self, FireResult::Fired(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FireResult::Failed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FireResult<U> {
        match self {
            FireResult::NoFire(reason) => FireResult::NoFire(reason),
            FireResult::Fired(value) => FireResult::Fired(f(value)),
            FireResult::Failed(error) => FireResult::Failed(error),
        }
    }

    pub fn fired(self) -> Option<T> {
        match self {
            FireResult::Fired(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logs: `no_fire`, `fired` or `failed`.
    pub fn label(&self) -> &'static str {
        match self {
            FireResult::NoFire(_) => "no_fire",
            FireResult::Fired(_) => "fired",
            FireResult::Failed(_) => "failed",
        }
    }
}

impl<T> From<Result<T, ContributorError>> for FireResult<T> {
    fn from(result: Result<T, ContributorError>) -> Self {
        match result {
            Ok(value) => FireResult::Fired(value),
            Err(error) => FireResult::Failed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_variant() {
        let fired: FireResult<&str> = FireResult::Fired("hi");
        assert_eq!(fired.map(str::len), FireResult::Fired(2));

        let none: FireResult<&str> = FireResult::NoFire(NoFireReason::CooldownActive);
        assert_eq!(none.map(str::len), FireResult::NoFire(NoFireReason::CooldownActive));
    }

    #[test]
    fn test_from_result() {
        let failed: FireResult<String> = Err(ContributorError::Fatal("boom".into())).into();
        assert!(failed.is_failed());
        assert_eq!(failed.label(), "failed");
    }
}
