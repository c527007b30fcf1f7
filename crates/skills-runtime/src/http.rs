//! HTTP helpers shared by the providers

use std::time::Duration;

use reqwest::StatusCode;
use skills_core::{AgentError, Result};

/// Build a client; `None` leaves requests without a client-side timeout
pub fn client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AgentError::Config(format!("http client error: {e}")))
}

/// Map a non-success HTTP status to an agent error
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> AgentError {
    match status.as_u16() {
        401 | 403 => AgentError::Auth(format!("{provider} rejected credentials: {body}")),
        429 => AgentError::RateLimited(format!("{provider} rate limit exceeded: {body}")),
        500..=599 => AgentError::ProviderUnavailable(format!("{provider} returned {status}: {body}")),
        _ => AgentError::Provider(format!("{provider} request failed with {status}: {body}")),
    }
}

/// Map a transport failure to an agent error
pub fn request_error(provider: &str, err: &reqwest::Error) -> AgentError {
    if err.is_connect() || err.is_timeout() {
        AgentError::ProviderUnavailable(format!("{provider} unreachable: {err}"))
    } else {
        AgentError::Provider(format!("{provider} request error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("anthropic", StatusCode::UNAUTHORIZED, ""),
            AgentError::Auth(_)
        ));
        assert!(matches!(
            status_error("anthropic", StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            status_error("anthropic", StatusCode::from_u16(529).unwrap(), "overloaded"),
            AgentError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            status_error("ollama", StatusCode::BAD_REQUEST, "bad"),
            AgentError::Provider(msg) if msg.contains("bad")
        ));
    }
}
