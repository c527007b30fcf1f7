//! Conversation Orchestrator
//!
//! Drives the bounded tool-use loop: the transcript and the tool schemas go
//! to the model; a final answer ends the loop, a tool-use response is
//! executed and its results fed back as the next user turn.
//!
//! ```text
//!            ┌──────────────────┐  text    ┌──────────────────────┐
//!  user ───▶ │  AWAITING_MODEL  │ ───────▶ │ MODEL_RESPONDED_TEXT │
//!            └──────────────────┘          └──────────────────────┘
//!               ▲         │ tool_use
//!   tool_result │         ▼
//!            ┌──────────────────────────┐  max_turns  ┌──────────────────┐
//!            │ MODEL_RESPONDED_TOOLUSE  │ ──────────▶ │ TURNS_EXHAUSTED  │
//!            └──────────────────────────┘             └──────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::invoker::{SkillInvoker, ToolCall, bounded};
use crate::message::{Conversation, Message, Role};
use crate::provider::{GenerationOptions, LlmProvider, ModelResponse};
use crate::registry::SkillRegistry;
use crate::schema::{self, ToolSchema};

/// Default number of model calls per conversation
pub const DEFAULT_MAX_TURNS: usize = 5;

/// Answer returned when the turn budget runs out on a tool-use response
pub const DEFAULT_EXHAUSTED_MESSAGE: &str = "I could not complete this request within the turn limit.";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum model calls before giving up
    pub max_turns: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Deadline for each model call, unbounded when `None`
    pub model_timeout: Option<Duration>,

    /// Deadline for each skill invocation, unbounded when `None`
    pub skill_timeout: Option<Duration>,

    /// Answer used when the budget runs out and the last response has no text
    pub exhausted_message: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            generation: GenerationOptions::default(),
            model_timeout: None,
            skill_timeout: None,
            exhausted_message: DEFAULT_EXHAUSTED_MESSAGE.into(),
        }
    }
}

/// How a conversation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatExit {
    /// The model produced a final answer
    Final,
    /// The turn budget ran out first
    TurnsExhausted,
}

/// Everything one `run` produced
#[derive(Clone, Debug)]
pub struct ChatOutcome {
    /// Answer text for the caller
    pub answer: String,

    /// Transcript sent to the model on the last call; the final response
    /// is returned, not appended
    pub transcript: Conversation,

    /// Model calls made
    pub turns: usize,

    pub exit: ChatExit,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<SkillRegistry>,
    invoker: SkillInvoker,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<SkillRegistry>, config: AgentConfig) -> Self {
        let invoker = SkillInvoker::new(registry.clone()).with_deadline(config.skill_timeout);
        Self {
            provider,
            registry,
            invoker,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, registry: Arc<SkillRegistry>) -> Self {
        Self::new(provider, registry, AgentConfig::default())
    }

    /// Answer a user message
    pub async fn chat(&self, user_message: &str) -> Result<String> {
        let outcome = self.run(user_message, &CancellationToken::new()).await?;
        Ok(outcome.answer)
    }

    /// Answer a user message, stopping early when `cancel` fires
    pub async fn run(&self, user_message: &str, cancel: &CancellationToken) -> Result<ChatOutcome> {
        let mut conversation = Conversation::from_user(user_message);
        let tools = schema::translate(&self.registry);

        tracing::info!(
            skills = tools.len(),
            names = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Starting conversation"
        );

        let mut last: Option<ModelResponse> = None;

        for turn in 0..self.config.max_turns {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let response = self.call_model(&conversation, &tools, cancel).await?;
            tracing::info!(turn = turn + 1, stop_reason = ?response.stop_reason, "Model responded");

            if !response.requests_tools() {
                let answer = response.text_content().unwrap_or_default();
                tracing::debug!(answer = %answer, "Final answer");
                return Ok(ChatOutcome {
                    answer,
                    transcript: conversation,
                    turns: turn + 1,
                    exit: ChatExit::Final,
                });
            }

            conversation.push(response.to_message());

            let calls: Vec<ToolCall> = response.content.iter().filter_map(ToolCall::from_block).collect();
            let results = futures::future::join_all(calls.iter().map(|call| self.invoker.execute(call, cancel))).await;

            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let blocks = results.iter().map(|r| r.to_block()).collect();
            conversation.push(Message::blocks(Role::User, blocks));

            last = Some(response);
        }

        tracing::warn!(max_turns = self.config.max_turns, "Max turns reached");

        let answer = last
            .as_ref()
            .and_then(ModelResponse::text_content)
            .unwrap_or_else(|| self.config.exhausted_message.clone());

        Ok(ChatOutcome {
            answer,
            transcript: conversation,
            turns: self.config.max_turns,
            exit: ChatExit::TurnsExhausted,
        })
    }

    async fn call_model(
        &self,
        conversation: &Conversation,
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> Result<ModelResponse> {
        let request = self
            .provider
            .complete(conversation.messages(), tools, &self.config.generation);
        bounded(request, "Model call", self.config.model_timeout, cancel).await
    }

    /// Get the skill registry
    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Get the provider
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    registry: Option<Arc<SkillRegistry>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            registry: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<SkillRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.generation.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn max_turns(mut self, max: usize) -> Self {
        self.config.max_turns = max;
        self
    }

    #[must_use]
    pub const fn model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.model_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn skill_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.skill_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_turns == 0 {
            return Err(AgentError::Config("max_turns must be at least 1".into()));
        }

        let registry = self.registry.unwrap_or_default();
        Ok(Agent::new(provider, registry, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParameterDescriptor, SkillDescriptor};
    use crate::message::{Content, ContentBlock};
    use crate::skill::{Arguments, SkillEntry, entry_point_fn};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request
    #[derive(Default)]
    struct ScriptedProvider {
        responses: Mutex<VecDeque<ModelResponse>>,
        requests: Mutex<Vec<(Vec<Message>, Vec<ToolSchema>)>>,
        repeat: Option<ModelResponse>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<ModelResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        fn repeating(response: ModelResponse) -> Self {
            Self {
                repeat: Some(response),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> Vec<Message> {
            self.requests.lock().unwrap()[index].0.clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<ModelResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), tools.to_vec()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self.responses.lock().unwrap().pop_front();
            next.or_else(|| self.repeat.clone())
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))
        }
    }

    async fn weather(args: Arguments) -> anyhow::Result<Value> {
        let city = args["location"].as_str().unwrap_or_default();
        if city == "Atlantis" {
            anyhow::bail!("City 'Atlantis' not found.");
        }
        Ok(json!({"city": city, "temperature": "12.5°C", "condition": "Overcast"}))
    }

    fn registry() -> Arc<SkillRegistry> {
        let mut registry = SkillRegistry::new();
        registry.register(SkillEntry::new(
            SkillDescriptor::new("Weather Checker", "Current weather for a city")
                .with_parameter(ParameterDescriptor::new("location").with_type("string")),
            Arc::new(entry_point_fn(weather)),
        ));
        Arc::new(registry)
    }

    fn weather_call(id: &str, city: &str) -> ContentBlock {
        ContentBlock::tool_use(id, "weather_checker", json!({"location": city}))
    }

    fn agent(provider: Arc<ScriptedProvider>, max_turns: usize) -> Agent {
        AgentBuilder::new()
            .provider(provider)
            .registry(registry())
            .max_turns(max_turns)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_uses_one_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelResponse::text("Paris is in France.")]));
        let agent = agent(provider.clone(), 5);

        let outcome = agent.run("Where is Paris?", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "Paris is in France.");
        assert_eq!(outcome.exit, ChatExit::Final);
        assert_eq!(outcome.turns, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(outcome.transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_then_final_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelResponse::tool_use(vec![
                ContentBlock::text("Checking the weather."),
                weather_call("toolu_1", "Oslo"),
            ]),
            ModelResponse::text("It is 12.5°C and overcast in Oslo."),
        ]));
        let agent = agent(provider.clone(), 5);

        let outcome = agent.run("Weather in Oslo?", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "It is 12.5°C and overcast in Oslo.");
        assert_eq!(provider.calls(), 2);

        let messages = outcome.transcript.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::user("Weather in Oslo?"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].tool_uses().count(), 1);
        assert_eq!(messages[2].role, Role::User);

        let Content::Blocks(blocks) = &messages[2].content else {
            panic!("tool results must be blocks");
        };
        let ContentBlock::ToolResult { tool_use_id, content } = &blocks[0] else {
            panic!("expected a tool_result block");
        };
        assert_eq!(tool_use_id, "toolu_1");
        let result: Value = serde_json::from_str(content).unwrap();
        assert_eq!(result["city"], "Oslo");

        // second call saw the whole transcript
        assert_eq!(provider.request(1), messages);
    }

    #[tokio::test]
    async fn test_turns_exhausted_without_text() {
        let provider = Arc::new(ScriptedProvider::repeating(ModelResponse::tool_use(vec![weather_call(
            "toolu_x", "Oslo",
        )])));
        let agent = agent(provider.clone(), 3);

        let outcome = agent.run("Loop forever", &CancellationToken::new()).await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(outcome.exit, ChatExit::TurnsExhausted);
        assert_eq!(outcome.turns, 3);
        assert_eq!(outcome.answer, DEFAULT_EXHAUSTED_MESSAGE);
        assert_eq!(outcome.transcript.len(), 7);
    }

    #[tokio::test]
    async fn test_turns_exhausted_returns_last_text() {
        let provider = Arc::new(ScriptedProvider::repeating(ModelResponse::tool_use(vec![
            ContentBlock::text("Still looking..."),
            weather_call("toolu_x", "Oslo"),
        ])));
        let agent = agent(provider, 2);

        let answer = agent.chat("Loop").await.unwrap();
        assert_eq!(answer, "Still looking...");
    }

    #[tokio::test]
    async fn test_parallel_tool_calls_share_one_user_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelResponse::tool_use(vec![
                weather_call("toolu_a", "Oslo"),
                weather_call("toolu_b", "Atlantis"),
                ContentBlock::tool_use("toolu_c", "stock_price", json!({"ticker": "ACME"})),
            ]),
            ModelResponse::text("Done."),
        ]));
        let agent = agent(provider.clone(), 5);

        let outcome = agent.run("Compare", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.answer, "Done.");

        let second = provider.request(1);
        assert_eq!(second.len(), 3);
        let Content::Blocks(blocks) = &second[2].content else {
            panic!("tool results must be blocks");
        };

        let results: Vec<(String, Value)> = blocks
            .iter()
            .map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, content } => {
                    (tool_use_id.clone(), serde_json::from_str(content).unwrap())
                }
                other => panic!("unexpected block {other:?}"),
            })
            .collect();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "toolu_a");
        assert_eq!(results[0].1["condition"], "Overcast");
        assert_eq!(results[1].0, "toolu_b");
        assert_eq!(results[1].1, json!({"error": "City 'Atlantis' not found."}));
        assert_eq!(results[2].0, "toolu_c");
        assert_eq!(results[2].1, json!({"error": "Skill stock_price not found"}));
    }

    #[tokio::test]
    async fn test_tools_are_declared_on_every_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelResponse::text("ok")]));
        let agent = agent(provider.clone(), 5);
        agent.chat("hi").await.unwrap();

        let tools = provider.requests.lock().unwrap()[0].1.clone();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "weather_checker");
        assert_eq!(tools[0].input_schema.required, ["location"]);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let agent = agent(provider, 5);

        let err = agent.chat("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_model_deadline() {
        let provider = Arc::new(ScriptedProvider {
            repeat: Some(ModelResponse::text("late")),
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let agent = AgentBuilder::new()
            .provider(provider)
            .model_timeout(Some(Duration::from_millis(20)))
            .build()
            .unwrap();

        let err = agent.chat("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelResponse::text("never")]));
        let agent = agent(provider.clone(), 5);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = agent.run("hi", &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_builder_requires_provider_and_turns() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));

        let provider = Arc::new(ScriptedProvider::default());
        let err = AgentBuilder::new().provider(provider).max_turns(0).build();
        assert!(matches!(err, Err(AgentError::Config(_))));
    }
}
