//! Participants of a group conversation.
//!
//! A participant is either a human (identified by display name) or a bot
//! carrying everything needed to generate text on its behalf.

use crate::core::ids::ParticipantId;
use crate::core::model::Model;
use serde::{Deserialize, Serialize};

/// Default sampling temperature for bots.
pub const DEFAULT_BOT_TEMPERATURE: f32 = 0.8;

/// Per-bot turn-taking behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotBehavior {
    /// Allow this bot to post twice in a row even when the global policy
    /// forbids double-texting.
    #[serde(default)]
    pub double_texting: bool,
}

/// Everything needed to speak as a bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model: Model,
    /// Persona prompt embedded into the bot's system prompt.
    pub prompt: String,
    pub temperature: f32,
    #[serde(default)]
    pub behavior: BotBehavior,
    /// Long-lived facts the bot remembers, oldest first.
    #[serde(default)]
    pub memories: Vec<String>,
}

impl BotProfile {
    pub fn new(name: impl Into<String>, model: Model, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model,
            prompt: prompt.into(),
            temperature: DEFAULT_BOT_TEMPERATURE,
            behavior: BotBehavior::default(),
            memories: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_double_texting(mut self, allowed: bool) -> Self {
        self.behavior.double_texting = allowed;
        self
    }

    pub fn with_memories(mut self, memories: Vec<String>) -> Self {
        self.memories = memories;
        self
    }

    /// The most recent `limit` memories, oldest first.
    pub fn recent_memories(&self, limit: usize) -> &[String] {
        let start = self.memories.len().saturating_sub(limit);
        &self.memories[start..]
    }
}

/// Human or bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParticipantKind {
    Human { name: String },
    Bot(BotProfile),
}

/// A member of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub kind: ParticipantKind,
}

impl Participant {
    pub fn human(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: ParticipantKind::Human { name: name.into() },
        }
    }

    pub fn bot(id: ParticipantId, profile: BotProfile) -> Self {
        Self {
            id,
            kind: ParticipantKind::Bot(profile),
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            ParticipantKind::Human { name } => name,
            ParticipantKind::Bot(profile) => &profile.name,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, ParticipantKind::Bot(_))
    }

    pub fn is_human(&self) -> bool {
        !self.is_bot()
    }

    pub fn as_bot(&self) -> Option<&BotProfile> {
        match &self.kind {
            ParticipantKind::Bot(profile) => Some(profile),
            ParticipantKind::Human { .. } => None,
        }
    }

    pub fn as_bot_mut(&mut self) -> Option<&mut BotProfile> {
        match &mut self.kind {
            ParticipantKind::Bot(profile) => Some(profile),
            ParticipantKind::Human { .. } => None,
        }
    }
}
