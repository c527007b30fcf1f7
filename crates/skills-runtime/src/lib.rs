//! # skills-runtime
//!
//! Runtime providers for the skills agent.
//!
//! ## Providers
//!
//! - **Anthropic** (default): Messages API with native tool use
//! - **Ollama**: Local inference via `ollama-rs` with function calling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skills_runtime::AnthropicProvider;
//!
//! let provider = AnthropicProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .registry(registry)
//!     .build()?;
//! ```

#[cfg(feature = "anthropic")]
mod http;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use skills_core::{
    Agent, AgentBuilder, AgentError, LlmProvider, Message, Result, Role, SkillLoader, SkillRegistry,
};
