mod assessment;
mod config;
mod errors;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::assessment::orchestrator::AssessmentOrchestrator;
use crate::config::{Config, LlmProvider};
use crate::llm_client::{AnthropicClient, BedrockClient, ModelGateway};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing provider credentials)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ESG API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model gateway
    let gateway = build_gateway(&config).await?;
    info!(
        "Model gateway initialized (backend: {}, model: {}, timeout: {}s)",
        gateway.backend(),
        config.model_id,
        config.llm_timeout.as_secs()
    );

    let orchestrator =
        AssessmentOrchestrator::new(gateway, config.model_id.clone(), config.llm_timeout);

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Selects the model backend named by `LLM_PROVIDER`.
async fn build_gateway(config: &Config) -> Result<Arc<dyn ModelGateway>> {
    match config.llm_provider {
        LlmProvider::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .context("ANTHROPIC_API_KEY is required for the anthropic provider")?;
            Ok(Arc::new(AnthropicClient::new(api_key, config.llm_timeout)?))
        }
        LlmProvider::Bedrock => Ok(Arc::new(
            BedrockClient::from_region(&config.aws_region).await,
        )),
    }
}
