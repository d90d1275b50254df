//! Application-level configuration.
//!
//! Controls how the orchestrator behaves: turn-taking, completion call
//! limits, fallback delays and the thresholds of every strategy.

use polybot_domain::{FallbackDelays, LurkerParams, Model, StrategyKind, TurnPolicy};
use std::time::Duration;

/// Limits applied to every completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPolicy {
    /// Concurrent completion calls across all contributors.
    pub max_concurrency: usize,
    /// Maximum time to wait for one completion before timing out.
    pub timeout: Option<Duration>,
    /// Attempts for a rate-limited call, including the first.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    /// Model used for sub-topic tracking and question classification.
    pub analysis_model: Model,
    pub analysis_temperature: f32,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout: None,
            max_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            analysis_model: Model::default(),
            analysis_temperature: 0.2,
        }
    }
}

impl CompletionPolicy {
    /// Creates a policy with a per-call timeout specified in seconds.
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeParams {
    /// Distinct contributors since the last summary needed to post one.
    pub participant_threshold: usize,
    pub cooldown: usize,
    /// Messages fed to the sub-topic classifier.
    pub short_context: usize,
}

impl Default for SummarizeParams {
    fn default() -> Self {
        Self {
            participant_threshold: 3,
            cooldown: 10,
            short_context: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncourageParams {
    pub lurkers: LurkerParams,
    pub cooldown: usize,
}

impl Default for EncourageParams {
    fn default() -> Self {
        Self {
            lurkers: LurkerParams::default(),
            cooldown: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionParams {
    /// Fire when recent/ever-active participants drops to this ratio.
    pub interest_threshold: f64,
    pub short_context: usize,
    pub cooldown: usize,
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            interest_threshold: 0.5,
            short_context: 10,
            cooldown: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveParams {
    pub stagnation_period: usize,
    pub cooldown: usize,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            stagnation_period: 10,
            cooldown: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChimeInParams {
    /// Identical trailing messages that count as repetition.
    pub repetition_threshold: usize,
}

impl Default for ChimeInParams {
    fn default() -> Self {
        Self {
            repetition_threshold: 3,
        }
    }
}

/// Thresholds for every contributor.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Bots answering one open question.
    pub indirect_max_responders: usize,
    pub summarize: SummarizeParams,
    pub encourage: EncourageParams,
    pub transition: TransitionParams,
    pub resolve: ResolveParams,
    pub chime_in: ChimeInParams,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            indirect_max_responders: 2,
            summarize: SummarizeParams::default(),
            encourage: EncourageParams::default(),
            transition: TransitionParams::default(),
            resolve: ResolveParams::default(),
            chime_in: ChimeInParams::default(),
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub turn: TurnPolicy,
    pub fallback: FallbackDelays,
    pub completion: CompletionPolicy,
    pub strategies: StrategyParams,
    /// Core memories included in a bot's system prompt.
    pub memory_limit: usize,
    /// Follow-up cycles run for bot-posted messages before the engine
    /// stops feeding them back.
    pub max_follow_ups: usize,
    /// Strategies enabled on conversations created by the engine.
    pub default_strategies: Vec<StrategyKind>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            turn: TurnPolicy::default(),
            fallback: FallbackDelays::default(),
            completion: CompletionPolicy::default(),
            strategies: StrategyParams::default(),
            memory_limit: 50,
            max_follow_ups: 8,
            default_strategies: StrategyKind::ALL.to_vec(),
        }
    }
}
