//! Skill Invoker
//!
//! Resolves a tool identifier to a registered skill and runs it. Every
//! failure (unknown tool, bad arguments, skill error, panic, deadline)
//! comes back as an `{"error": ...}` value the model can react to.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::message::ContentBlock;
use crate::registry::SkillRegistry;
use crate::skill::Arguments;

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Request identifier, echoed in the result
    pub id: String,

    /// Canonical tool identifier
    pub name: String,

    /// Raw input object
    #[serde(default)]
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Extract a call from a `tool_use` block
    pub fn from_block(block: &ContentBlock) -> Option<Self> {
        match block {
            ContentBlock::ToolUse { id, name, input } => Some(Self::new(id.clone(), name.clone(), input.clone())),
            _ => None,
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call ID from the request
    pub id: String,

    /// Tool that was called
    pub name: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Raw skill result, or `{"error": ...}`
    pub output: Value,
}

impl ToolResult {
    pub fn success(id: impl Into<String>, name: impl Into<String>, output: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            success: true,
            output,
        }
    }

    pub fn failure(id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            success: false,
            output: json!({ "error": error.into() }),
        }
    }

    /// `tool_result` block correlated to the request
    pub fn to_block(&self) -> ContentBlock {
        ContentBlock::tool_result(self.id.clone(), self.output.to_string())
    }
}

/// Calls skills from a shared registry
#[derive(Clone, Debug)]
pub struct SkillInvoker {
    registry: Arc<SkillRegistry>,
    deadline: Option<Duration>,
}

impl SkillInvoker {
    pub const fn new(registry: Arc<SkillRegistry>) -> Self {
        Self {
            registry,
            deadline: None,
        }
    }

    /// Bound every invocation; `None` leaves calls unbounded
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Invoke a skill by canonical name, unbounded and uncancellable
    pub async fn invoke(&self, name: &str, args: Arguments) -> Value {
        self.invoke_with(name, args, &CancellationToken::new()).await
    }

    /// Invoke a skill by canonical name, honoring the deadline and `cancel`
    pub async fn invoke_with(&self, name: &str, args: Arguments, cancel: &CancellationToken) -> Value {
        match self.run(name, args, cancel).await {
            Ok(value) => value,
            Err(e) => json!({ "error": error_message(name, &e) }),
        }
    }

    /// Execute a model tool call
    pub async fn execute(&self, call: &ToolCall, cancel: &CancellationToken) -> ToolResult {
        tracing::info!(tool = %call.name, id = %call.id, input = %call.input, "Using tool");

        let args = match &call.input {
            Value::Object(map) => map.clone(),
            Value::Null => Arguments::new(),
            other => {
                let message = format!("tool input must be an object, got {other}");
                return ToolResult::failure(&call.id, &call.name, message);
            }
        };

        let result = match self.run(&call.name, args, cancel).await {
            Ok(value) => ToolResult::success(&call.id, &call.name, value),
            Err(e) => ToolResult::failure(&call.id, &call.name, error_message(&call.name, &e)),
        };

        if result.success {
            tracing::info!(tool = %call.name, output = %result.output, "Tool result");
        } else {
            tracing::warn!(tool = %call.name, output = %result.output, "Tool failed");
        }

        result
    }

    async fn run(&self, name: &str, args: Arguments, cancel: &CancellationToken) -> Result<Value> {
        let skill = self
            .registry
            .find_tool(name)
            .ok_or_else(|| AgentError::SkillNotFound(name.to_string()))?;

        skill.validate(&args)?;

        let invocation = AssertUnwindSafe(skill.invoke(args))
            .catch_unwind()
            .map(|outcome| match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(AgentError::SkillExecution(format!("{e:#}"))),
                Err(panic) => Err(AgentError::SkillExecution(panic_message(panic.as_ref()))),
            });

        bounded(invocation, &format!("Skill {name}"), self.deadline, cancel).await
    }
}

/// Run `fut` under an optional deadline, aborting early if `cancel` fires
pub(crate) async fn bounded<F, T>(
    fut: F,
    what: &str,
    deadline: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timed = async {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| AgentError::Timeout {
                what: what.to_string(),
                elapsed: limit,
            })?,
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AgentError::Cancelled),
        result = timed => result,
    }
}

/// Message placed in the `error` field of a failed tool result
fn error_message(name: &str, err: &AgentError) -> String {
    let message = match err {
        AgentError::SkillExecution(msg) | AgentError::InvalidArguments(msg) => msg.trim().to_string(),
        AgentError::Cancelled => format!("Skill {name} was cancelled"),
        other => other.to_string(),
    };
    if message.is_empty() {
        format!("Skill {name} failed")
    } else {
        message
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .map_or_else(|| "skill panicked".into(), |msg| format!("skill panicked: {msg}"))
}
