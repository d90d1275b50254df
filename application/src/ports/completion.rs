//! Completion Service port
//!
//! Text generation is opaque to the application: an ordered list of
//! role-tagged utterances plus generation parameters goes in, text or a
//! typed failure comes out.

use async_trait::async_trait;
use polybot_domain::{ContributorError, Model, Utterance};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a completion service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Timeout")]
    Timeout,
}

impl CompletionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompletionError::RateLimited(_))
    }
}

impl From<CompletionError> for ContributorError {
    fn from(error: CompletionError) -> Self {
        match error {
            CompletionError::RateLimited(_) | CompletionError::Timeout => {
                ContributorError::Transient(error.to_string())
            }
            CompletionError::ServiceError(msg) => ContributorError::Fatal(msg),
        }
    }
}

/// Generation parameters for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: Model,
    pub temperature: f32,
    /// Ask the service for a JSON object response.
    #[serde(default)]
    pub structured_output: bool,
}

impl GenerationParams {
    pub fn new(model: Model, temperature: f32) -> Self {
        Self {
            model,
            temperature,
            structured_output: false,
        }
    }

    pub fn structured(mut self) -> Self {
        self.structured_output = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub utterances: Vec<Utterance>,
    pub params: GenerationParams,
}

impl CompletionRequest {
    pub fn new(utterances: Vec<Utterance>, params: GenerationParams) -> Self {
        Self { utterances, params }
    }

    /// Content of the final utterance, usually the instruction.
    pub fn last_prompt(&self) -> Option<&str> {
        self.utterances.last().map(|u| u.content.as_str())
    }
}

/// Service that turns utterances into text
///
/// Adapters are expected to log model, temperature, prompt, response and
/// token usage of every request.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_error_maps_to_contributor_error() {
        assert!(ContributorError::from(CompletionError::Timeout).is_transient());
        assert!(ContributorError::from(CompletionError::RateLimited("429".into())).is_transient());
        assert_eq!(
            ContributorError::from(CompletionError::ServiceError("bad".into())),
            ContributorError::Fatal("bad".into())
        );
    }

    #[test]
    fn test_only_rate_limits_are_retryable() {
        assert!(CompletionError::RateLimited("x".into()).is_retryable());
        assert!(!CompletionError::Timeout.is_retryable());
    }
}
