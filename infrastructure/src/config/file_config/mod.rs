//! Raw TOML configuration data types
//!
//! These structs mirror the config file section by section. Every section
//! defaults field by field, so a partial file only overrides what it names.

mod bots;
mod completion;
mod conversation;
mod logging;
mod strategies;
mod turn;

pub use bots::FileBotConfig;
pub use completion::FileCompletionConfig;
pub use conversation::FileConversationConfig;
pub use logging::FileLoggingConfig;
pub use strategies::{
    FileChimeInConfig, FileEncourageConfig, FileResolveConfig, FileStrategiesConfig,
    FileSummarizeConfig, FileTransitionConfig,
};
pub use turn::{FileFallbackConfig, FileTurnConfig};

use crate::store::NewConversation;
use polybot_application::OrchestratorConfig;
use polybot_domain::BotProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("completion.timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("{0} must be greater than 0")]
    Zero(&'static str),

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0} cannot be empty")]
    EmptyModelName(String),

    #[error("at least one [[bots]] entry is required")]
    NoBots,

    #[error("conversation.humans cannot be empty")]
    NoHumans,

    #[error("participant names cannot be empty")]
    EmptyName,

    #[error("participant name '{0}' is used twice (names are case-insensitive)")]
    DuplicateName(String),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub completion: FileCompletionConfig,
    pub turn: FileTurnConfig,
    pub fallback: FileFallbackConfig,
    pub strategies: FileStrategiesConfig,
    pub conversation: FileConversationConfig,
    pub bots: Vec<FileBotConfig>,
    pub logging: FileLoggingConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            completion: FileCompletionConfig::default(),
            turn: FileTurnConfig::default(),
            fallback: FileFallbackConfig::default(),
            strategies: FileStrategiesConfig::default(),
            conversation: FileConversationConfig::default(),
            bots: vec![FileBotConfig::polly()],
            logging: FileLoggingConfig::default(),
        }
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

impl FileConfig {
    /// Validate the whole configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let completion = &self.completion;
        if completion.timeout_seconds == Some(0) {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if completion.max_concurrency == 0 {
            return Err(ConfigValidationError::Zero("completion.max_concurrency"));
        }
        if completion.max_attempts == 0 {
            return Err(ConfigValidationError::Zero("completion.max_attempts"));
        }
        if completion.analysis_model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName(
                "completion.analysis_model".to_string(),
            ));
        }
        check_range(
            "completion.analysis_temperature",
            completion.analysis_temperature as f64,
            0.0,
            2.0,
        )?;

        if self.turn.window == 0 {
            return Err(ConfigValidationError::Zero("turn.window"));
        }
        check_range(
            "turn.min_human_fraction",
            self.turn.min_human_fraction,
            0.0,
            1.0,
        )?;
        check_range(
            "strategies.transition.interest_threshold",
            self.strategies.transition.interest_threshold,
            0.0,
            1.0,
        )?;
        if self.strategies.chime_in.repetition_threshold == 0 {
            return Err(ConfigValidationError::Zero(
                "strategies.chime_in.repetition_threshold",
            ));
        }
        self.strategies.parse_enabled()?;

        if self.bots.is_empty() {
            return Err(ConfigValidationError::NoBots);
        }
        if self.conversation.humans.is_empty() {
            return Err(ConfigValidationError::NoHumans);
        }

        let mut seen = HashSet::new();
        let names = self
            .conversation
            .humans
            .iter()
            .map(String::as_str)
            .chain(self.bots.iter().map(|bot| bot.name.as_str()));
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigValidationError::EmptyName);
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigValidationError::DuplicateName(name.to_string()));
            }
        }

        for bot in &self.bots {
            if bot.model.trim().is_empty() {
                return Err(ConfigValidationError::EmptyModelName(format!(
                    "bots.{}.model",
                    bot.name
                )));
            }
            check_range(
                &format!("bots.{}.temperature", bot.name),
                bot.temperature as f64,
                0.0,
                2.0,
            )?;
        }
        Ok(())
    }

    /// Validate and convert into the orchestrator's configuration.
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, ConfigValidationError> {
        self.validate()?;
        Ok(OrchestratorConfig {
            turn: self.turn.to_policy(),
            fallback: self.fallback.to_delays(),
            completion: self.completion.to_policy(),
            strategies: self.strategies.to_params(),
            memory_limit: self.conversation.memory_limit,
            max_follow_ups: self.conversation.max_follow_ups,
            default_strategies: self.strategies.parse_enabled()?,
        })
    }

    pub fn bot_profiles(&self) -> Vec<BotProfile> {
        self.bots.iter().map(FileBotConfig::to_profile).collect()
    }

    /// The conversation described by `[conversation]` and `[[bots]]`.
    pub fn new_conversation(&self) -> Result<NewConversation, ConfigValidationError> {
        self.validate()?;
        Ok(NewConversation {
            title: self.conversation.title.clone(),
            humans: self
                .conversation
                .humans
                .iter()
                .map(|name| name.trim().to_string())
                .collect(),
            bots: self.bot_profiles(),
            strategies: self.strategies.parse_enabled()?.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ChatProvider;
    use polybot_domain::{Model, StrategyKind};
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[completion]
provider = "openai"
timeout_seconds = 20
analysis_model = "gpt-4o-mini"

[turn]
min_human_fraction = 0.3
double_texting = true

[fallback]
after_human_seconds = 45

[strategies]
enabled = ["Mention", "chime_in"]

[strategies.summarize]
participant_threshold = 4

[conversation]
humans = ["alice", "bob"]
form_memories = false

[[bots]]
name = "Sage"
model = "mistral-large-latest"
prompt = "You are wise."
temperature = 0.5
memories = ["Likes tea"]

[[bots]]
name = "Jester"
prompt = "You are funny."
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.completion.provider, ChatProvider::OpenAi);
        assert_eq!(config.bots.len(), 2);
        assert_eq!(config.bots[1].model, "mistral-small-latest");
        assert!(!config.conversation.form_memories);

        let orchestrator = config.orchestrator_config().unwrap();
        assert_eq!(orchestrator.completion.timeout, Some(Duration::from_secs(20)));
        assert_eq!(orchestrator.completion.analysis_model, Model::Gpt4oMini);
        assert_eq!(orchestrator.turn.min_human_fraction, 0.3);
        assert!(orchestrator.turn.double_texting);
        assert_eq!(orchestrator.fallback.after_human, Duration::from_secs(45));
        assert_eq!(orchestrator.fallback.after_bot, Duration::from_secs(300));
        assert_eq!(orchestrator.strategies.summarize.participant_threshold, 4);
        assert_eq!(orchestrator.strategies.summarize.cooldown, 10);
        assert_eq!(
            orchestrator.default_strategies,
            vec![StrategyKind::Mention, StrategyKind::ChimeIn]
        );

        let sage = &config.bot_profiles()[0];
        assert_eq!(sage.model, Model::MistralLarge);
        assert_eq!(sage.temperature, 0.5);
        assert_eq!(sage.memories, vec!["Likes tea".to_string()]);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.orchestrator_config().unwrap(), OrchestratorConfig::default());

        let conversation = config.new_conversation().unwrap();
        assert_eq!(conversation.humans, vec!["you".to_string()]);
        assert!(config.conversation.form_memories);
        assert_eq!(conversation.bots[0].name, "Polly");
        assert_eq!(conversation.strategies.len(), StrategyKind::ALL.len());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FileConfig::default();
        config.completion.timeout_seconds = Some(0);
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidTimeout));

        let mut config = FileConfig::default();
        config.turn.min_human_fraction = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::OutOfRange { .. })
        ));

        let mut config = FileConfig::default();
        config.strategies.enabled.push("Gossip".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::UnknownStrategy("Gossip".to_string()))
        );

        let mut config = FileConfig::default();
        config.bots.clear();
        assert_eq!(config.validate(), Err(ConfigValidationError::NoBots));
    }

    #[test]
    fn test_names_must_be_unique_ignoring_case() {
        let mut config = FileConfig::default();
        config.conversation.humans = vec!["polly".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateName("Polly".to_string()))
        );
    }

    #[test]
    fn test_api_key_prefers_explicit_value() {
        let config = FileCompletionConfig {
            api_key: Some("sk-test".to_string()),
            ..FileCompletionConfig::default()
        };
        assert_eq!(config.api_key().as_deref(), Some("sk-test"));
        assert_eq!(config.base_url(), "https://api.mistral.ai/v1");
        assert_eq!(config.api_key_env(), "MISTRAL_API_KEY");
    }
}
