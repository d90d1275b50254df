//! Bot definitions from TOML (`[[bots]]` array)

use polybot_domain::{BotProfile, DEFAULT_BOT_TEMPERATURE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBotConfig {
    /// Display name, also the `@name` mention token.
    pub name: String,
    pub description: Option<String>,
    pub model: String,
    /// Persona prompt.
    pub prompt: String,
    pub temperature: f32,
    /// Allow this bot to post twice in a row.
    pub double_texting: bool,
    pub memories: Vec<String>,
}

impl Default for FileBotConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            model: polybot_domain::Model::default().to_string(),
            prompt: String::new(),
            temperature: DEFAULT_BOT_TEMPERATURE,
            double_texting: false,
            memories: Vec::new(),
        }
    }
}

impl FileBotConfig {
    /// The bot used when no `[[bots]]` are configured.
    pub fn polly() -> Self {
        Self {
            name: "Polly".to_string(),
            description: Some("A curious, friendly regular of the group".to_string()),
            prompt: "You are warm and curious. You keep your messages short, ask \
                     follow-up questions and make sure everyone feels heard."
                .to_string(),
            ..Self::default()
        }
    }

    pub fn to_profile(&self) -> BotProfile {
        let mut profile = BotProfile::new(
            self.name.trim(),
            self.model.parse().unwrap_or_default(),
            self.prompt.clone(),
        )
        .with_temperature(self.temperature)
        .with_double_texting(self.double_texting)
        .with_memories(self.memories.clone());
        profile.description = self.description.clone();
        profile
    }
}
