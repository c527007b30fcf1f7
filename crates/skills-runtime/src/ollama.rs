//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference through
//! `ollama-rs`. Ollama's function calling has no tool-call ids, so ids are
//! generated here; tool results go back as `tool` messages in call order.

use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use skills_core::{
    error::{AgentError, Result},
    message::{Content, ContentBlock, Message, Role},
    provider::{GenerationOptions, LlmProvider, ModelResponse, StopReason, TokenUsage},
    schema::ToolSchema,
};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `OLLAMA_HOST` and `OLLAMA_PORT` through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let host = lookup("OLLAMA_HOST")
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or(defaults.host);
        let port = lookup("OLLAMA_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        Self { host, port }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
        })
    }

    /// Create from configuration, rejecting a host that is not a URL
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        reqwest::Url::parse(&config.host)
            .map_err(|e| AgentError::Config(format!("OLLAMA_HOST '{}' is not a URL: {e}", config.host)))?;

        Ok(Self {
            client: Ollama::new(&config.host, config.port),
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn build_request(
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<ChatMessageRequest> {
        let mut chat = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &options.system_prompt {
            chat.push(ChatMessage::new(MessageRole::System, system.clone()));
        }
        chat.extend(convert_messages(messages)?);

        let mut model_options = json!({ "num_predict": options.max_tokens });
        if let Some(temperature) = options.temperature {
            model_options["temperature"] = json!(temperature);
        }

        let mut request = ChatMessageRequest::new(options.model.clone(), chat).options(wire(model_options)?);

        if !tools.is_empty() {
            let definitions = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();
            request = request.tools(wire(Value::Array(definitions))?);
        }

        Ok(request)
    }

    fn convert_response(response: ChatMessageResponse) -> ModelResponse {
        let mut content = Vec::new();

        if !response.message.content.is_empty() {
            content.push(ContentBlock::text(response.message.content));
        }

        for call in response.message.tool_calls {
            let id = format!("call_{}", uuid::Uuid::new_v4().simple());
            content.push(ContentBlock::tool_use(
                id,
                call.function.name,
                parse_arguments(call.function.arguments),
            ));
        }

        let stop_reason = if content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. })) {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };

        // Counts are only reported on the final chunk
        let stats = serde_json::to_value(&response.final_data).unwrap_or_default();
        let count = |key: &str| stats.get(key).and_then(Value::as_u64).map(|n| u32::try_from(n).unwrap_or(u32::MAX));
        let usage = match (count("prompt_eval_count"), count("eval_count")) {
            (None, None) => None,
            (input, output) => Some(TokenUsage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };

        ModelResponse {
            content,
            stop_reason,
            model: response.model,
            usage,
        }
    }
}

/// Flatten block transcripts into Ollama chat messages
fn convert_messages(messages: &[Message]) -> Result<Vec<ChatMessage>> {
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        let role = match message.role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        };
        let blocks = match &message.content {
            Content::Text(text) => {
                out.push(ChatMessage::new(role, text.clone()));
                continue;
            }
            Content::Blocks(blocks) => blocks,
        };

        let mut text = String::new();
        let mut calls = Vec::new();
        let mut results = Vec::new();

        for block in blocks {
            match block {
                ContentBlock::Text { text: t } => text.push_str(t),
                ContentBlock::ToolUse { name, input, .. } => {
                    calls.push(json!({ "function": { "name": name, "arguments": input } }));
                }
                ContentBlock::ToolResult { content, .. } => {
                    results.push(ChatMessage::new(MessageRole::Tool, content.clone()));
                }
            }
        }

        if message.role == Role::Assistant || !text.is_empty() || results.is_empty() {
            let mut chat = ChatMessage::new(role, text);
            if !calls.is_empty() {
                chat.tool_calls = wire(Value::Array(calls))?;
            }
            out.push(chat);
        }
        out.extend(results);
    }

    Ok(out)
}

/// Build an `ollama-rs` request type from its wire JSON
fn wire<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| AgentError::Provider(format!("Ollama request encoding: {e}")))
}

/// Arguments arrive as an object or, from some models, a JSON string
fn parse_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Value::Null => json!({}),
        other => other,
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
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
        let request = Self::build_request(messages, tools, options)?;

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(Self::convert_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skills_core::{SkillDescriptor, descriptor::ParameterDescriptor};

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::from_lookup(|_| None);
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = OllamaConfig::from_lookup(|key| match key {
            "OLLAMA_HOST" => Some("http://gpu-box/".into()),
            "OLLAMA_PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert_eq!(config.host, "http://gpu-box");
        assert_eq!(config.port, 11434);
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        assert!(OllamaProvider::new("gpu box", 11434).is_err());
        assert!(OllamaProvider::new("http://gpu-box", 11434).is_ok());
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::user("Weather in Oslo?"),
            Message::blocks(
                Role::Assistant,
                vec![ContentBlock::tool_use("call_1", "weather_checker", json!({"location": "Oslo"}))],
            ),
            Message::blocks(Role::User, vec![ContentBlock::tool_result("call_1", "{\"city\":\"Oslo\"}")]),
        ];

        let chat = serde_json::to_value(convert_messages(&messages).unwrap()).unwrap();
        let chat = chat.as_array().unwrap();

        assert_eq!(chat.len(), 3);
        assert_eq!(chat[0]["role"], "user");
        assert_eq!(chat[0]["content"], "Weather in Oslo?");
        assert_eq!(chat[1]["role"], "assistant");
        assert_eq!(chat[1]["tool_calls"][0]["function"]["name"], "weather_checker");
        assert_eq!(chat[1]["tool_calls"][0]["function"]["arguments"]["location"], "Oslo");
        assert_eq!(chat[2]["role"], "tool");
        assert_eq!(chat[2]["content"], "{\"city\":\"Oslo\"}");
    }

    #[test]
    fn test_request_shape() {
        let tools = vec![ToolSchema::from(
            &SkillDescriptor::new("Weather Checker", "Weather")
                .with_parameter(ParameterDescriptor::new("location").with_type("string")),
        )];
        let options = GenerationOptions {
            model: "llama3.1".into(),
            system_prompt: Some("Be brief.".into()),
            ..Default::default()
        };

        let request = OllamaProvider::build_request(&[Message::user("hi")], &tools, &options).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["options"]["num_predict"], 1024);
        assert_eq!(body["tools"][0]["function"]["name"], "weather_checker");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    fn response(message: Value, counts: bool) -> ChatMessageResponse {
        let mut raw = json!({
            "model": "llama3.1",
            "created_at": "2024-12-01T10:00:00.000000Z",
            "message": message,
            "done": true,
        });
        if counts {
            for (key, value) in [
                ("total_duration", 5_000_000),
                ("load_duration", 1_000_000),
                ("prompt_eval_count", 50),
                ("prompt_eval_duration", 2_000_000),
                ("eval_count", 12),
                ("eval_duration", 2_000_000),
            ] {
                raw[key] = json!(value);
            }
        }
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_tool_call_response() {
        let raw = response(
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "calculator", "arguments": {"expression": "2+2"}}},
                    {"function": {"name": "datetime", "arguments": "{\"format\": \"iso\"}"}}
                ]
            }),
            true,
        );

        let response = OllamaProvider::convert_response(raw);

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.content.len(), 2);
        match &response.content[1] {
            ContentBlock::ToolUse { id, name, input } => {
                assert!(id.starts_with("call_"));
                assert_eq!(name, "datetime");
                assert_eq!(input["format"], "iso");
            }
            other => panic!("unexpected block: {other:?}"),
        }
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, 50);
        assert_eq!(usage.output_tokens, 12);
    }

    #[test]
    fn test_text_response() {
        let raw = response(json!({"role": "assistant", "content": "Hello"}), false);

        let response = OllamaProvider::convert_response(raw);
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.text_content().as_deref(), Some("Hello"));
        assert_eq!(response.model, "llama3.1");
        assert!(response.usage.is_none());
    }
}
