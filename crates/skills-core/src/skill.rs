//! Skill Capability Contract
//!
//! A skill is anything that can describe itself and be invoked with named
//! arguments. Skills discovered on disk are a [`SkillEntry`]: a parsed
//! descriptor bound to an [`EntryPoint`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::descriptor::SkillDescriptor;
use crate::error::{AgentError, Result};

/// Named arguments passed to a skill
pub type Arguments = serde_json::Map<String, Value>;

/// Capability contract every registered skill fulfils
#[async_trait]
pub trait Skill: Send + Sync {
    /// Declared name, description and parameters
    fn descriptor(&self) -> &SkillDescriptor;

    /// Run the skill. Errors are reported back to the model, never raised
    /// past the invoker.
    async fn invoke(&self, args: Arguments) -> anyhow::Result<Value>;

    /// Check arguments against the declared parameters before invoking
    fn validate(&self, args: &Arguments) -> Result<()> {
        validate_arguments(self.descriptor(), args)
    }
}

/// The callable half of a skill, bound to a descriptor by the loader
#[async_trait]
pub trait EntryPoint: Send + Sync {
    async fn call(&self, args: Arguments) -> anyhow::Result<Value>;
}

/// Descriptor bound to its entry point
#[derive(Clone)]
pub struct SkillEntry {
    descriptor: SkillDescriptor,
    entry_point: Arc<dyn EntryPoint>,
}

impl SkillEntry {
    pub fn new(descriptor: SkillDescriptor, entry_point: Arc<dyn EntryPoint>) -> Self {
        Self {
            descriptor,
            entry_point,
        }
    }
}

impl std::fmt::Debug for SkillEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Skill for SkillEntry {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: Arguments) -> anyhow::Result<Value> {
        self.entry_point.call(args).await
    }
}

/// Entry point backed by an async closure
pub struct FnEntryPoint<F> {
    f: F,
}

/// Wrap an async closure as an [`EntryPoint`]
///
/// ```rust,ignore
/// let echo = entry_point_fn(|args| async move { Ok(Value::Object(args)) });
/// ```
pub fn entry_point_fn<F, Fut>(f: F) -> FnEntryPoint<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    FnEntryPoint { f }
}

#[async_trait]
impl<F, Fut> EntryPoint for FnEntryPoint<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        (self.f)(args).await
    }
}

/// Reject missing, unexpected and mistyped arguments
pub fn validate_arguments(descriptor: &SkillDescriptor, args: &Arguments) -> Result<()> {
    for param in descriptor.effective_parameters() {
        let Some(value) = args.get(&param.name) else {
            return Err(AgentError::InvalidArguments(format!(
                "{}() missing required argument: '{}'",
                descriptor.name, param.name
            )));
        };

        if let Some(expected) = param.param_type.as_deref() {
            if !matches_type(expected, value) {
                return Err(AgentError::InvalidArguments(format!(
                    "argument '{}' expected type {expected}, got {}",
                    param.name,
                    json_type_name(value)
                )));
            }
        }
    }

    if let Some(extra) = args
        .keys()
        .find(|key| !descriptor.parameters.iter().any(|p| &p.name == *key))
    {
        return Err(AgentError::InvalidArguments(format!(
            "{}() got an unexpected argument '{extra}'",
            descriptor.name
        )));
    }

    Ok(())
}

/// Unknown type tags are not checked
fn matches_type(expected: &str, value: &Value) -> bool {
    match expected.to_ascii_lowercase().as_str() {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
