//! Conversation setup from TOML (`[conversation]` section)

use polybot_application::OrchestratorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConversationConfig {
    pub title: Option<String>,
    /// Names of the humans taking part.
    pub humans: Vec<String>,
    /// Core memories included in each bot's system prompt.
    pub memory_limit: usize,
    /// Cycles run for bot messages before waiting for a human again.
    pub max_follow_ups: usize,
    /// Ask the bots for core memories when the session ends.
    pub form_memories: bool,
}

impl Default for FileConversationConfig {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            title: None,
            humans: vec!["you".to_string()],
            memory_limit: defaults.memory_limit,
            max_follow_ups: defaults.max_follow_ups,
            form_memories: true,
        }
    }
}
