//! Chat model client for sqlchat
//!
//! Provides a `ChatBackend` trait and an OpenAI-compatible chat-completions
//! implementation. Every rendered prompt is sent as a single user message and
//! the first choice's text comes back verbatim. One attempt per call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4-0125-preview";

/// Default OpenAI API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// ChatBackend trait
// ============================================================================

/// Abstraction over hosted chat models.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one prompt and return the model's raw text response.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model name for logging.
    fn model(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing completion in response")]
    MissingCompletion,

    #[error("Missing API key (set OPENAI_API_KEY)")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn new(api_key: Option<String>, model: String, temperature: Option<f32>) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            temperature,
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiChatClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

impl OpenAiChatClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Self::with_base_url(config, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against another OpenAI-compatible endpoint (tests, proxies).
    pub fn with_base_url(config: LlmConfig, base_url: String) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        Ok(Self {
            client: Client::builder().build()?,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = CompletionRequest {
            model: &self.config.model,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Chat completion API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::MissingCompletion)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> LlmConfig {
        LlmConfig {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
        })
    }

    #[tokio::test]
    async fn test_complete_sends_single_user_message() {
        let mock_server = MockServer::start().await;
        let client = OpenAiChatClient::with_base_url(test_config("sk-test"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4-0125-preview",
                "messages": [{ "role": "user", "content": "say hi" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.complete("say hi").await;
        assert_eq!(result.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_response_is_returned_verbatim() {
        let mock_server = MockServer::start().await;
        let client =
            OpenAiChatClient::with_base_url(test_config("sk-test"), mock_server.uri()).unwrap();

        let raw = "```sql\nSELECT 1;\n```  ";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(raw)))
            .mount(&mock_server)
            .await;

        assert_eq!(client.complete("q").await.unwrap(), raw);
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        let client =
            OpenAiChatClient::with_base_url(test_config("sk-test"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded", "type": "requests" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete("q").await {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 429);
                assert_eq!(message, "Rate limit exceeded");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_missing_completion() {
        let mock_server = MockServer::start().await;
        let client =
            OpenAiChatClient::with_base_url(test_config("sk-test"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.complete("q").await,
            Err(LlmError::MissingCompletion)
        ));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(matches!(
            OpenAiChatClient::new(test_config("")),
            Err(LlmError::MissingApiKey)
        ));
    }
}
