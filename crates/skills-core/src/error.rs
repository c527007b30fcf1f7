//! Error Types

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Skill metadata document is missing a required field
    #[error("Malformed skill descriptor: {0}")]
    MalformedDescriptor(String),

    /// Reading an existing, expected skill file failed
    #[error("Failed to load skill registry from {}: {source}", path.display())]
    RegistryLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No registered skill matches the requested tool identifier
    #[error("Skill {0} not found")]
    SkillNotFound(String),

    /// Skill raised an error while running
    #[error("Skill execution error: {0}")]
    SkillExecution(String),

    /// Arguments do not match the skill's declared parameters
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A bounded call ran past its deadline
    #[error("{what} timed out after {}ms", elapsed.as_millis())]
    Timeout { what: String, elapsed: Duration },

    /// The caller cancelled the conversation
    #[error("Conversation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_)
                | Self::RateLimited(_)
                | Self::Timeout { .. }
                | Self::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            Self::SkillNotFound(name) => format!("The skill '{name}' is not available."),
            Self::InvalidArguments(msg) => format!("Invalid skill input: {msg}"),
            Self::SkillExecution(msg) => format!("Skill error: {msg}"),
            Self::Timeout { .. } => "The request took too long to process. Please try again.".into(),
            Self::Cancelled => "The request was cancelled.".into(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_not_found_message() {
        let err = AgentError::SkillNotFound("weather_checker".into());
        assert_eq!(err.to_string(), "Skill weather_checker not found");
    }

    #[test]
    fn test_retryable() {
        assert!(AgentError::RateLimited("slow down".into()).is_retryable());
        assert!(!AgentError::Auth("bad key".into()).is_retryable());
        assert!(!AgentError::Cancelled.is_retryable());
    }

    #[test]
    fn test_timeout_display() {
        let err = AgentError::Timeout {
            what: "Model call".into(),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Model call timed out after 1500ms");
    }
}
