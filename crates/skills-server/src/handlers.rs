//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub skills_loaded: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub skills: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness plus the skills the agent can call
pub async fn root(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Agent is online",
        skills_loaded: state.skills_loaded(),
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.agent.provider();
    let provider_connected = provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: provider.name().to_string(),
        provider_connected,
        skills: state.agent.registry().len(),
    })
}

/// Run one conversation and return the final answer
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ErrorResponse>)> {
    let answer = state.agent.chat(&payload.text).await.map_err(|e| {
        tracing::error!(error = %e, retryable = e.is_retryable(), "Agent error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { detail: e.to_string() }),
        )
    })?;

    Ok(Json(AskResponse { answer }))
}
