//! Sub-topic discourse tracking.
//!
//! Sub-topics are only ever rewritten by the Summarize strategy's analysis
//! step; every other component reads them.

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far a sub-topic has been discussed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTopicStatus {
    NotDiscussed,
    BeingDiscussed,
    WellDiscussed,
}

impl SubTopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubTopicStatus::NotDiscussed => "Not Discussed",
            SubTopicStatus::BeingDiscussed => "Being Discussed",
            SubTopicStatus::WellDiscussed => "Well Discussed",
        }
    }
}

impl std::fmt::Display for SubTopicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubTopicStatus {
    type Err = DomainError;

    /// Accepts the labels used in analysis prompts ("Being Discussed") as
    /// well as snake/kebab case variants, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .trim_end_matches('.')
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "notdiscussed" => Ok(SubTopicStatus::NotDiscussed),
            "beingdiscussed" => Ok(SubTopicStatus::BeingDiscussed),
            "welldiscussed" => Ok(SubTopicStatus::WellDiscussed),
            _ => Err(DomainError::InvalidSubTopicStatus(s.trim().to_string())),
        }
    }
}

/// A tracked sub-topic of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTopic {
    pub name: String,
    pub status: SubTopicStatus,
    /// When the status last changed; `None` until the first classification.
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl SubTopic {
    pub fn new(name: impl Into<String>, status: SubTopicStatus, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status,
            status_changed_at: Some(at),
        }
    }

    /// Apply a classified status. Returns `true` when the status changed.
    pub fn apply_status(&mut self, status: SubTopicStatus, at: DateTime<Utc>) -> bool {
        if self.status == status && self.status_changed_at.is_some() {
            return false;
        }
        self.status = status;
        self.status_changed_at = Some(at);
        true
    }

    /// Whether `name` refers to this sub-topic (case-insensitive).
    pub fn matches(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}
