//! Error Types for the built-in skills
//!
//! Display strings are what the model sees in `{"error": ...}` results.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkillPackError>;

#[derive(Error, Debug)]
pub enum SkillPackError {
    #[error("City '{0}' not found.")]
    CityNotFound(String),

    #[error("Weather data unavailable.")]
    WeatherUnavailable,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid expression: {0}")]
    Expression(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
}

impl SkillPackError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for SkillPackError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
