//! Bedrock backend: Anthropic models hosted on AWS Bedrock via `invoke_model`.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::Serialize;

use super::{AnthropicMessage, LlmError, LlmResponse, ModelGateway, ModelRequest};

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Bedrock carries the model id out of band, so the body omits `model`.
#[derive(Debug, Serialize)]
struct BedrockBody<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Clone)]
pub struct BedrockClient {
    client: Client,
}

impl BedrockClient {
    /// Loads AWS credentials from the default provider chain for `region`.
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

fn encode_body(request: &ModelRequest<'_>) -> Result<Vec<u8>, LlmError> {
    let body = BedrockBody {
        anthropic_version: BEDROCK_ANTHROPIC_VERSION,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages: vec![AnthropicMessage {
            role: "user",
            content: request.prompt,
        }],
    };
    Ok(serde_json::to_vec(&body)?)
}

#[async_trait]
impl ModelGateway for BedrockClient {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError> {
        let body = encode_body(&request)?;

        let output = self
            .client
            .invoke_model()
            .model_id(request.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| LlmError::Bedrock(DisplayErrorContext(&e).to_string()))?;

        let response: LlmResponse = serde_json::from_slice(output.body().as_ref())?;
        response.log_usage(self.backend());
        response.into_text()
    }

    fn backend(&self) -> &'static str {
        "bedrock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_uses_bedrock_version_and_omits_model() {
        let request = ModelRequest {
            model: "anthropic.claude-3-sonnet-20240229-v1:0",
            prompt: "Score this",
            max_tokens: 3000,
            temperature: 0.5,
        };
        let bytes = encode_body(&request).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["anthropic_version"], BEDROCK_ANTHROPIC_VERSION);
        assert_eq!(value["max_tokens"], 3000);
        assert_eq!(value["messages"][0]["content"], "Score this");
        assert!(value.get("model").is_none());
    }
}
