use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Model id used when talking to Anthropic directly and `LLM_MODEL_ID` is unset.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
/// Model id used on Bedrock when `LLM_MODEL_ID` is unset.
pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// Which hosted endpoint serves the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    Bedrock,
}

impl LlmProvider {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(LlmProvider::Anthropic),
            "bedrock" | "aws" => Ok(LlmProvider::Bedrock),
            other => bail!("LLM_PROVIDER must be 'anthropic' or 'bedrock', got '{other}'"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Bedrock => "bedrock",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            LlmProvider::Bedrock => DEFAULT_BEDROCK_MODEL,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if the selected provider is missing its credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProvider,
    pub anthropic_api_key: Option<String>,
    pub aws_region: String,
    pub model_id: String,
    pub llm_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_provider = match std::env::var("LLM_PROVIDER") {
            Ok(raw) => LlmProvider::parse(&raw)?,
            Err(_) => LlmProvider::Bedrock,
        };

        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        if llm_provider == LlmProvider::Anthropic && anthropic_api_key.is_none() {
            bail!("Required environment variable 'ANTHROPIC_API_KEY' is not set");
        }

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            llm_provider,
            anthropic_api_key,
            aws_region: std::env::var("AWS_REGION")
                .unwrap_or_else(|_| "ap-southeast-1".to_string()),
            model_id: std::env::var("LLM_MODEL_ID")
                .unwrap_or_else(|_| llm_provider.default_model().to_string()),
            llm_timeout: Duration::from_secs(timeout_secs),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_is_case_insensitive() {
        assert_eq!(LlmProvider::parse("Anthropic").unwrap(), LlmProvider::Anthropic);
        assert_eq!(LlmProvider::parse(" BEDROCK ").unwrap(), LlmProvider::Bedrock);
        assert_eq!(LlmProvider::parse("aws").unwrap(), LlmProvider::Bedrock);
    }

    #[test]
    fn test_provider_parse_rejects_unknown() {
        assert!(LlmProvider::parse("openai").is_err());
    }

    #[test]
    fn test_default_model_per_provider() {
        assert_eq!(LlmProvider::Bedrock.default_model(), DEFAULT_BEDROCK_MODEL);
        assert_eq!(LlmProvider::Anthropic.default_model(), DEFAULT_ANTHROPIC_MODEL);
    }
}
