//! # skills-core
//!
//! Skill discovery, tool schema translation and the bounded tool-use loop
//! that lets an LLM call host-side skills.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Agent                                │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │ Conversation │  │    Skill     │  │     LlmProvider       │  │
//! │  │     Loop     │──│   Invoker    │  │     (Strategy)        │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘  │
//! │         │                 │                                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │ Tool Schema  │──│    Skill     │──│  SkillLoader          │  │
//! │  │  Translator  │  │   Registry   │  │  (SKILL.md + entry)   │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the loop independent of the model backend;
//! the `Skill` trait keeps it independent of what a skill actually does.

pub mod descriptor;
pub mod error;
pub mod invoker;
pub mod message;
pub mod orchestrator;
pub mod process;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod skill;

pub use descriptor::{ParameterDescriptor, SkillDescriptor};
pub use error::{AgentError, Result};
pub use invoker::{SkillInvoker, ToolCall, ToolResult};
pub use message::{Content, ContentBlock, Conversation, Message, Role};
pub use orchestrator::{Agent, AgentBuilder, AgentConfig, ChatExit, ChatOutcome};
pub use provider::{GenerationOptions, LlmProvider, ModelResponse, StopReason};
pub use registry::{SkillLoader, SkillRegistry};
pub use schema::{ToolSchema, canonical_name};
pub use skill::{Arguments, EntryPoint, Skill, SkillEntry, entry_point_fn};
pub use tokio_util::sync::CancellationToken;
