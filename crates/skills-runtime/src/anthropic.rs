//! Anthropic LLM Provider
//!
//! Implementation of `LlmProvider` over the Anthropic Messages API with
//! native tool use.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use skills_core::{
    error::{AgentError, Result},
    message::{ContentBlock, Message},
    provider::{GenerationOptions, LlmProvider, ModelResponse, StopReason, TokenUsage},
    schema::ToolSchema,
};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic provider configuration
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,

    /// API base URL, without the `/v1/...` path
    pub base_url: String,

    /// Client-side request timeout, none by default
    pub timeout: Option<Duration>,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: None,
        }
    }

    /// Read `ANTHROPIC_API_KEY` and `ANTHROPIC_BASE_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("ANTHROPIC_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup("ANTHROPIC_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    http: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Create from configuration
    pub fn from_config(config: AnthropicConfig) -> Result<Self> {
        Ok(Self {
            http: http::client(config.timeout)?,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(AnthropicConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Build the `/v1/messages` request body
    fn build_request(messages: &[Message], tools: &[ToolSchema], options: &GenerationOptions) -> Value {
        let mut body = json!({
            "model": options.model,
            "max_tokens": options.max_tokens,
            "messages": messages,
        });

        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        if let Some(system) = &options.system_prompt {
            body["system"] = json!(system);
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }

        body
    }

    /// Convert a raw API response, skipping block types the loop does not use
    fn convert_response(response: MessagesResponse) -> ModelResponse {
        let content = response
            .content
            .into_iter()
            .filter_map(|block| match serde_json::from_value::<ContentBlock>(block.clone()) {
                Ok(block) => Some(block),
                Err(_) => {
                    tracing::debug!(block = %block, "Skipping unsupported content block");
                    None
                }
            })
            .collect();

        ModelResponse {
            content,
            stop_reason: response.stop_reason.unwrap_or(StopReason::EndTurn),
            model: response.model,
            usage: response.usage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<StopReason>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .http
            .get(self.url("/v1/models"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::warn!("Anthropic health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<ModelResponse> {
        let body = Self::build_request(messages, tools, options);

        let resp = self
            .http
            .post(self.url("/v1/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::request_error("anthropic", &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(http::status_error("anthropic", status, &body));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Anthropic response parse error: {e}")))?;

        Ok(Self::convert_response(parsed))
    }
}
