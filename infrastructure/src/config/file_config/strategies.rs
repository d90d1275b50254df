//! Strategy configuration from TOML (`[strategies]` section)

use super::ConfigValidationError;
use polybot_application::{
    ChimeInParams, EncourageParams, ResolveParams, StrategyParams, SummarizeParams,
    TransitionParams,
};
use polybot_domain::{LurkerParams, StrategyKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSummarizeConfig {
    pub participant_threshold: usize,
    pub cooldown: usize,
    pub short_context: usize,
}

impl Default for FileSummarizeConfig {
    fn default() -> Self {
        let params = SummarizeParams::default();
        Self {
            participant_threshold: params.participant_threshold,
            cooldown: params.cooldown,
            short_context: params.short_context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEncourageConfig {
    pub long_context: usize,
    pub short_context: usize,
    pub std_ratio: f64,
    pub recent_max: usize,
    pub cooldown: usize,
}

impl Default for FileEncourageConfig {
    fn default() -> Self {
        let params = EncourageParams::default();
        Self {
            long_context: params.lurkers.long_context,
            short_context: params.lurkers.short_context,
            std_ratio: params.lurkers.std_ratio,
            recent_max: params.lurkers.recent_max,
            cooldown: params.cooldown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTransitionConfig {
    pub interest_threshold: f64,
    pub short_context: usize,
    pub cooldown: usize,
}

impl Default for FileTransitionConfig {
    fn default() -> Self {
        let params = TransitionParams::default();
        Self {
            interest_threshold: params.interest_threshold,
            short_context: params.short_context,
            cooldown: params.cooldown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResolveConfig {
    pub stagnation_period: usize,
    pub cooldown: usize,
}

impl Default for FileResolveConfig {
    fn default() -> Self {
        let params = ResolveParams::default();
        Self {
            stagnation_period: params.stagnation_period,
            cooldown: params.cooldown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChimeInConfig {
    pub repetition_threshold: usize,
}

impl Default for FileChimeInConfig {
    fn default() -> Self {
        Self {
            repetition_threshold: ChimeInParams::default().repetition_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStrategiesConfig {
    /// Strategies enabled on new conversations, by name ("Mention", "Chime-in", ...).
    pub enabled: Vec<String>,
    pub indirect_max_responders: usize,
    pub summarize: FileSummarizeConfig,
    pub encourage: FileEncourageConfig,
    pub transition: FileTransitionConfig,
    pub resolve: FileResolveConfig,
    pub chime_in: FileChimeInConfig,
}

impl Default for FileStrategiesConfig {
    fn default() -> Self {
        Self {
            enabled: StrategyKind::ALL
                .iter()
                .map(|kind| kind.name().to_string())
                .collect(),
            indirect_max_responders: StrategyParams::default().indirect_max_responders,
            summarize: FileSummarizeConfig::default(),
            encourage: FileEncourageConfig::default(),
            transition: FileTransitionConfig::default(),
            resolve: FileResolveConfig::default(),
            chime_in: FileChimeInConfig::default(),
        }
    }
}

impl FileStrategiesConfig {
    /// Parse `enabled`, dropping duplicates and keeping the first occurrence.
    pub fn parse_enabled(&self) -> Result<Vec<StrategyKind>, ConfigValidationError> {
        let mut kinds = Vec::new();
        for name in &self.enabled {
            let kind: StrategyKind = name
                .parse()
                .map_err(|_| ConfigValidationError::UnknownStrategy(name.clone()))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    pub fn to_params(&self) -> StrategyParams {
        StrategyParams {
            indirect_max_responders: self.indirect_max_responders,
            summarize: SummarizeParams {
                participant_threshold: self.summarize.participant_threshold,
                cooldown: self.summarize.cooldown,
                short_context: self.summarize.short_context,
            },
            encourage: EncourageParams {
                lurkers: LurkerParams {
                    long_context: self.encourage.long_context,
                    short_context: self.encourage.short_context,
                    std_ratio: self.encourage.std_ratio,
                    recent_max: self.encourage.recent_max,
                },
                cooldown: self.encourage.cooldown,
            },
            transition: TransitionParams {
                interest_threshold: self.transition.interest_threshold,
                short_context: self.transition.short_context,
                cooldown: self.transition.cooldown,
            },
            resolve: ResolveParams {
                stagnation_period: self.resolve.stagnation_period,
                cooldown: self.resolve.cooldown,
            },
            chime_in: ChimeInParams {
                repetition_threshold: self.chime_in.repetition_threshold,
            },
        }
    }
}
