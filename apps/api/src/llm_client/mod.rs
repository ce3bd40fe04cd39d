//! LLM Client: the single point of entry for all model calls in the service.
//!
//! ARCHITECTURAL RULE: No other module may call a model endpoint directly.
//! Everything goes through a `ModelGateway`, which the orchestrator receives
//! at construction time so tests can substitute a fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod bedrock;
pub mod prompts;

pub use bedrock::BedrockClient;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    #[error("Bedrock error: {0}")]
    Bedrock(String),
}

/// One outbound model call: opaque prompt in, text out.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The model gateway trait. Implement this to swap hosting backends without
/// touching the orchestrator or handlers.
///
/// Carried by `AssessmentOrchestrator` as `Arc<dyn ModelGateway>`.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError>;

    /// Short backend label for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API wire types (shared with the Bedrock body format)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }

    /// Consumes the response, returning the first non-empty text block.
    pub fn into_text(self) -> Result<String, LlmError> {
        match self.text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(LlmError::EmptyContent),
        }
    }

    fn log_usage(&self, backend: &str) {
        if let Some(usage) = &self.usage {
            debug!(
                "{} call succeeded: input_tokens={}, output_tokens={}",
                backend, usage.input_tokens, usage.output_tokens
            );
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// AnthropicClient: direct HTTPS backend
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
        })
    }

    /// Sends one Messages API request, retrying throttled and server-side
    /// failures up to `MAX_RETRIES` attempts with doubling delays.
    pub async fn call(&self, request: &ModelRequest<'_>) -> Result<LlmResponse, LlmError> {
        let body = AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 1..=MAX_RETRIES {
            match self.attempt(&body).await {
                Ok(response) => {
                    response.log_usage(self.backend());
                    return Ok(response);
                }
                Err(e) if is_retryable(&e) && attempt < MAX_RETRIES => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "Anthropic attempt {attempt}/{MAX_RETRIES} failed ({e}); retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn attempt(&self, body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AnthropicError>(&raw)
            .map(|e| e.error.message)
            .unwrap_or(raw);
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Network errors, 429 and 5xx are worth another attempt.
fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Http(_) => true,
        LlmError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// 1s after the first failure, 2s after the second.
fn backoff_delay(failed_attempts: u32) -> Duration {
    Duration::from_millis(1000 << (failed_attempts - 1))
}

#[async_trait]
impl ModelGateway for AnthropicClient {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError> {
        self.call(&request).await?.into_text()
    }

    fn backend(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_picks_first_text_block() {
        let json = r#"{
            "content": [
                {"type": "tool_use", "text": null},
                {"type": "text", "text": "Environmental Score: 70"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("Environmental Score: 70"));
    }

    #[test]
    fn test_response_without_usage_deserializes() {
        let json = r#"{"content": [{"type": "text", "text": "ok"}]}"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(response.usage.is_none());
        assert_eq!(response.into_text().unwrap(), "ok");
    }

    #[test]
    fn test_blank_text_is_empty_content() {
        let json = r#"{"content": [{"type": "text", "text": "   "}]}"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response.into_text(), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_request_body_carries_temperature() {
        let body = AnthropicRequest {
            model: "m",
            max_tokens: 2000,
            temperature: 0.3,
            messages: vec![AnthropicMessage {
                role: "user",
                content: "hi",
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["max_tokens"], 2000);
        assert_eq!(value["messages"][0]["role"], "user");
        assert!((value["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_retry_classification() {
        let throttled = LlmError::Api {
            status: 429,
            message: String::new(),
        };
        let unavailable = LlmError::Api {
            status: 503,
            message: String::new(),
        };
        let unauthorized = LlmError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        };
        assert!(is_retryable(&throttled));
        assert!(is_retryable(&unavailable));
        assert!(!is_retryable(&unauthorized));
        assert!(!is_retryable(&LlmError::EmptyContent));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
    }
}
