//! Server Configuration
//!
//! Read from the environment (after `.env` is loaded). Parsing goes through
//! a lookup function so tests never touch the process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use skills_core::orchestrator::DEFAULT_MAX_TURNS;
use skills_core::provider::DEFAULT_MODEL;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_SKILLS_DIR: &str = "skills";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Which LLM backend answers `/ask`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => bail!("unknown LLM_PROVIDER '{other}', expected anthropic or ollama"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub skills_dir: PathBuf,
    pub provider: ProviderKind,
    pub model: String,
    pub max_turns: usize,
    pub model_timeout: Option<Duration>,
    pub skill_timeout: Option<Duration>,
    pub skill_executables: bool,
    pub system_prompt: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = get("LLM_PROVIDER")
            .map(|p| p.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or(ProviderKind::Anthropic);

        let model = match provider {
            ProviderKind::Anthropic => get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            ProviderKind::Ollama => get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into()),
        };

        let max_turns = match get("MAX_TURNS") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_TURNS must be a positive integer, got '{raw}'"))?,
            None => DEFAULT_MAX_TURNS,
        };
        if max_turns == 0 {
            bail!("MAX_TURNS must be at least 1");
        }

        let skill_executables = match get("SKILL_EXECUTABLES") {
            Some(raw) => parse_bool(&raw).with_context(|| format!("SKILL_EXECUTABLES must be a boolean, got '{raw}'"))?,
            None => true,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            skills_dir: get("SKILLS_DIR").map_or_else(|| PathBuf::from(DEFAULT_SKILLS_DIR), PathBuf::from),
            provider,
            model,
            max_turns,
            model_timeout: seconds(get("MODEL_TIMEOUT_SECS"), "MODEL_TIMEOUT_SECS")?,
            skill_timeout: seconds(get("SKILL_TIMEOUT_SECS"), "SKILL_TIMEOUT_SECS")?,
            skill_executables,
            system_prompt: get("SYSTEM_PROMPT"),
        })
    }
}

/// Whole seconds; `0` means no deadline
fn seconds(raw: Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{key} must be a number of seconds, got '{raw}'"))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("not a boolean"),
    }
}
