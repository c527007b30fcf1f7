//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for tool-calling LLM backends (Anthropic,
//! Ollama, ...) so the orchestrator works with any of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skills_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = AnthropicProvider::from_env()?;
//! let response = provider.complete(messages, &tools, &GenerationOptions::default()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{ContentBlock, Message, Role};
use crate::schema::ToolSchema;

/// Default model identifier
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier
    pub model: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature, provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// System prompt, sent out-of-band from the transcript
    #[serde(default)]
    pub system_prompt: Option<String>,
}

const fn default_max_tokens() -> u32 {
    1024
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            max_tokens: default_max_tokens(),
            temperature: None,
            system_prompt: None,
        }
    }
}

/// Why the model stopped generating
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(other)]
    Other,
}

/// Token usage statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One model response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Text and tool-use blocks, in order
    pub content: Vec<ContentBlock>,

    /// Stop reason reported by the provider
    pub stop_reason: StopReason,

    /// Model that generated this response
    #[serde(default)]
    pub model: String,

    /// Token usage statistics (if available)
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    /// Final text response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: StopReason::EndTurn,
            model: String::new(),
            usage: None,
        }
    }

    /// Tool-use response carrying the given blocks
    pub fn tool_use(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            stop_reason: StopReason::ToolUse,
            model: String::new(),
            usage: None,
        }
    }

    /// Whether the model is asking for tool invocations
    pub fn requests_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
            && self
                .content
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Concatenated text blocks, `None` when there are none
    pub fn text_content(&self) -> Option<String> {
        let texts: Vec<&str> = self.content.iter().filter_map(ContentBlock::as_text).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    /// The response as an assistant transcript entry
    pub fn to_message(&self) -> Message {
        Message::blocks(Role::Assistant, self.content.clone())
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The orchestrator works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "anthropic", "ollama")
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Send the transcript and the callable tools, get one response
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.max_tokens, 1024);
        assert_eq!(opts.model, DEFAULT_MODEL);
        assert!(opts.system_prompt.is_none());
    }

    #[test]
    fn test_stop_reason_wire_names() {
        let reason: StopReason = serde_json::from_value(json!("tool_use")).unwrap();
        assert_eq!(reason, StopReason::ToolUse);
        let reason: StopReason = serde_json::from_value(json!("pause_turn")).unwrap();
        assert_eq!(reason, StopReason::Other);
    }

    #[test]
    fn test_requests_tools_needs_a_tool_block() {
        let empty = ModelResponse::tool_use(vec![ContentBlock::text("thinking")]);
        assert!(!empty.requests_tools());

        let call = ModelResponse::tool_use(vec![ContentBlock::tool_use("1", "datetime", json!({}))]);
        assert!(call.requests_tools());
        assert!(call.text_content().is_none());
    }
}
