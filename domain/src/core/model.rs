//! Model value object representing a generation model

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Generation models a bot can speak through (Value Object)
///
/// Bots carry their own model; analysis steps (sub-topic tracking, question
/// classification) use the model configured for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    // Mistral models
    MistralSmall,
    MistralMedium,
    MistralLarge,
    OpenMistralNemo,
    // GPT models
    Gpt35Turbo,
    Gpt4oMini,
    Gpt4o,
    // Custom
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::MistralSmall => "mistral-small-latest",
            Model::MistralMedium => "mistral-medium-latest",
            Model::MistralLarge => "mistral-large-latest",
            Model::OpenMistralNemo => "open-mistral-nemo",
            Model::Gpt35Turbo => "gpt-3.5-turbo",
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Gpt4o => "gpt-4o",
            Model::Custom(s) => s,
        }
    }

    /// Check if this is a Mistral model
    pub fn is_mistral(&self) -> bool {
        matches!(
            self,
            Model::MistralSmall | Model::MistralMedium | Model::MistralLarge | Model::OpenMistralNemo
        )
    }

    /// Check if this is a GPT model
    pub fn is_gpt(&self) -> bool {
        matches!(self, Model::Gpt35Turbo | Model::Gpt4oMini | Model::Gpt4o)
    }
}

impl Default for Model {
    /// Returns the default model (mistral-small-latest)
    fn default() -> Self {
        Model::MistralSmall
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "mistral-small-latest" => Model::MistralSmall,
            "mistral-medium-latest" => Model::MistralMedium,
            "mistral-large-latest" => Model::MistralLarge,
            "open-mistral-nemo" => Model::OpenMistralNemo,
            "gpt-3.5-turbo" => Model::Gpt35Turbo,
            "gpt-4o-mini" => Model::Gpt4oMini,
            "gpt-4o" => Model::Gpt4o,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.parse() {
            Ok(model) => Ok(model),
            Err(never) => match never {},
        }
    }
}
