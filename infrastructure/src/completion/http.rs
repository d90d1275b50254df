//! OpenAI-compatible chat completion adapter
//!
//! Works against Mistral's and OpenAI's `/chat/completions` endpoints. Every
//! answered request is recorded as an `llm_request` event carrying the
//! model, temperature, last prompt, response and token usage.

use async_trait::async_trait;
use polybot_application::ports::completion::{
    CompletionError, CompletionRequest, CompletionService,
};
use polybot_application::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use polybot_domain::{Role, Utterance};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Hosted chat completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    #[default]
    Mistral,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ChatProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ChatProvider::Mistral => "https://api.mistral.ai/v1",
            ChatProvider::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Environment variable holding the API key unless configured otherwise.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ChatProvider::Mistral => "MISTRAL_API_KEY",
            ChatProvider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

pub struct HttpCompletionService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Option<Duration>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl HttpCompletionService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout: None,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Adapter for `provider`, reading the key from its default variable.
    pub fn for_provider(provider: ChatProvider) -> Self {
        let api_key = std::env::var(provider.default_api_key_env()).ok();
        Self::new(provider.default_base_url(), api_key)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// `name` accepted by the chat APIs: ASCII letters, digits, `_` and `-`.
fn wire_name(speaker: &str) -> Option<String> {
    let name: String = speaker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect();
    let name = name.trim_matches('_').to_string();
    (!name.is_empty()).then_some(name)
}

fn wire_message(utterance: &Utterance) -> Value {
    let mut message = json!({
        "role": utterance.role.as_str(),
        "content": utterance.content,
    });
    if utterance.role != Role::System
        && let Some(name) = wire_name(&utterance.speaker)
    {
        message["name"] = Value::String(name);
    }
    message
}

fn request_body(request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = request.utterances.iter().map(wire_message).collect();
    let mut body = json!({
        "model": request.params.model.as_str(),
        "temperature": request.params.temperature,
        "messages": messages,
    });
    if request.params.structured_output {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

fn status_error(status: StatusCode, body: String) -> CompletionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CompletionError::Timeout,
        _ => CompletionError::ServiceError(format!("HTTP {}: {}", status, body)),
    }
}

fn parse_response(body: &str) -> Result<(String, Usage), CompletionError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::ServiceError(format!("Malformed response: {}", e)))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::ServiceError("Response has no content".to_string()))?;
    Ok((content, response.usage.unwrap_or_default()))
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = request_body(request);
        debug!(
            "Requesting {} ({} utterances)",
            request.params.model,
            request.utterances.len()
        );

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::ServiceError(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::ServiceError(e.to_string()))?;
        if !status.is_success() {
            warn!("Completion request failed with {}", status);
            return Err(status_error(status, text));
        }

        let (content, usage) = parse_response(&text)?;
        self.conversation_logger.log(ConversationEvent::new(
            "llm_request",
            json!({
                "model": request.params.model.as_str(),
                "temperature": request.params.temperature,
                "structured_output": request.params.structured_output,
                "prompt": request.last_prompt(),
                "response": content,
                "prompt_tokens": usage.prompt_tokens,
                "completion_tokens": usage.completion_tokens,
                "total_tokens": usage.total_tokens,
            }),
        ));
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polybot_application::ports::completion::GenerationParams;
    use polybot_domain::Model;

    fn request(structured: bool) -> CompletionRequest {
        let mut params = GenerationParams::new(Model::MistralSmall, 0.8);
        if structured {
            params = params.structured();
        }
        CompletionRequest::new(
            vec![
                Utterance::system("You are Bot."),
                Utterance::new(Role::User, "Jean Luc", "@Bot hi"),
                Utterance::new(Role::Assistant, "Bot", "hello"),
            ],
            params,
        )
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(&request(false));
        assert_eq!(body["model"], "mistral-small-latest");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0].get("name").is_none());
        assert_eq!(body["messages"][1]["name"], "Jean_Luc");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_structured_requests_ask_for_json() {
        let body = request_body(&request(true));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_wire_name() {
        assert_eq!(wire_name("alice").as_deref(), Some("alice"));
        assert_eq!(wire_name("Zoë").as_deref(), Some("Zo"));
        assert_eq!(wire_name("???"), None);
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }"#;
        let (content, usage) = parse_response(body).unwrap();
        assert_eq!(content, "hello");
        assert_eq!(usage.total_tokens, 13);

        assert!(matches!(
            parse_response(r#"{"choices": []}"#),
            Err(CompletionError::ServiceError(_))
        ));
        assert!(matches!(
            parse_response("not json"),
            Err(CompletionError::ServiceError(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            CompletionError::RateLimited("slow down".into())
        );
        assert_eq!(
            status_error(StatusCode::GATEWAY_TIMEOUT, String::new()),
            CompletionError::Timeout
        );
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "bad key".into()),
            CompletionError::ServiceError(_)
        ));
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(ChatProvider::default(), ChatProvider::Mistral);
        assert_eq!(ChatProvider::Mistral.default_api_key_env(), "MISTRAL_API_KEY");
        let service = HttpCompletionService::new("https://api.openai.com/v1/", None);
        assert_eq!(service.endpoint(), "https://api.openai.com/v1/chat/completions");
    }
}
