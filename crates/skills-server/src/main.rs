//! skills-agent HTTP Server
//!
//! Loads skill packages from `SKILLS_DIR`, wires them to the configured LLM
//! provider and answers questions over HTTP.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skills_core::{AgentBuilder, LlmProvider, SkillLoader};
use skills_runtime::{AnthropicConfig, AnthropicProvider, OllamaConfig, OllamaProvider};

use crate::config::{ProviderKind, ServerConfig};
use crate::handlers::{ask, health_check, root};
use crate::state::AppState;

/// Routes and middleware over the shared state
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ask", post(ask))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

fn build_provider(config: &ServerConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Anthropic => {
            let settings = AnthropicConfig::from_env().context("Anthropic provider is not configured")?;
            Arc::new(AnthropicProvider::from_config(settings)?)
        }
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_config(OllamaConfig::from_env())?),
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Discover skills
    let loader = skill_pack::bind_all(SkillLoader::new()).allow_executables(config.skill_executables);
    let registry = loader
        .load(&config.skills_dir)
        .with_context(|| format!("loading skills from {}", config.skills_dir.display()))?;

    tracing::info!("Registered {} skills:", registry.len());
    for name in registry.names() {
        tracing::info!("  • {}", name);
    }

    // Initialize LLM provider
    let provider = build_provider(&config)?;
    match provider.health_check().await {
        Ok(true) => tracing::info!(provider = provider.name(), model = %config.model, "✓ Provider reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(provider = provider.name(), "⚠ Provider not reachable - /ask will fail until it is");
        }
    }

    let mut builder = AgentBuilder::new()
        .provider(provider)
        .registry(Arc::new(registry))
        .model(&config.model)
        .max_turns(config.max_turns)
        .model_timeout(config.model_timeout)
        .skill_timeout(config.skill_timeout);
    if let Some(prompt) = &config.system_prompt {
        builder = builder.system_prompt(prompt);
    }
    let agent = builder.build()?;

    let app = router(AppState::new(agent));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    tracing::info!("skills-agent server running on http://{}", config.bind_addr);
    tracing::info!("  GET  /        - Status and loaded skills");
    tracing::info!("  GET  /health  - Provider health");
    tracing::info!("  POST /ask     - Ask a question");

    axum::serve(listener, app).await?;

    Ok(())
}
