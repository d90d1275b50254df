//! Completion configuration from TOML (`[completion]` section)

use crate::completion::ChatProvider;
use polybot_application::CompletionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCompletionConfig {
    pub provider: ChatProvider,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    /// Environment variable holding the API key (default depends on the provider).
    pub api_key_env: Option<String>,
    /// Direct API key (not recommended, use the environment variable instead).
    pub api_key: Option<String>,
    pub max_concurrency: usize,
    pub timeout_seconds: Option<u64>,
    pub max_attempts: u32,
    pub retry_backoff_seconds: u64,
    /// Model used for question classification and sub-topic tracking.
    pub analysis_model: String,
    pub analysis_temperature: f32,
}

impl Default for FileCompletionConfig {
    fn default() -> Self {
        let policy = CompletionPolicy::default();
        Self {
            provider: ChatProvider::default(),
            base_url: None,
            api_key_env: None,
            api_key: None,
            max_concurrency: policy.max_concurrency,
            timeout_seconds: None,
            max_attempts: policy.max_attempts,
            retry_backoff_seconds: policy.retry_backoff.as_secs(),
            analysis_model: policy.analysis_model.to_string(),
            analysis_temperature: policy.analysis_temperature,
        }
    }
}

impl FileCompletionConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    /// The configured key, else the value of [`Self::api_key_env`].
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.api_key_env()).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn to_policy(&self) -> CompletionPolicy {
        let policy = CompletionPolicy {
            max_concurrency: self.max_concurrency,
            timeout: None,
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_secs(self.retry_backoff_seconds),
            analysis_model: self.analysis_model.parse().unwrap_or_default(),
            analysis_temperature: self.analysis_temperature,
        };
        match self.timeout_seconds {
            Some(seconds) => policy.with_timeout_seconds(seconds),
            None => policy,
        }
    }
}
