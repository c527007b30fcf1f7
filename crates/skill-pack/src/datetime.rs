//! Date/Time Skill

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{Value, json};

use skills_core::{Arguments, EntryPoint};

use crate::error::{Result, SkillPackError};

/// Parse `UTC`, `Z` or a `+HH:MM` / `-HH:MM` offset
pub fn parse_offset(timezone: &str) -> Result<FixedOffset> {
    let tz = timezone.trim();
    if tz.is_empty() || tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| SkillPackError::invalid("timezone", "invalid offset"));
    }

    let invalid = || SkillPackError::invalid("timezone", format!("expected UTC or +HH:MM, got '{timezone}'"));

    let (sign, rest) = match tz.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Render `now` in the requested format
pub fn render(now: DateTime<Utc>, format: &str, timezone: &str) -> Result<String> {
    let local = now.with_timezone(&parse_offset(timezone)?);

    match format {
        "iso" => Ok(local.to_rfc3339()),
        "unix" => Ok(now.timestamp().to_string()),
        "human" | "" => Ok(local.format("%A, %B %d, %Y at %H:%M:%S %:z").to_string()),
        other => Err(SkillPackError::invalid(
            "format",
            format!("unknown format '{other}', expected iso, human or unix"),
        )),
    }
}

/// Entry point for the `datetime` skill package
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentTime;

#[async_trait]
impl EntryPoint for CurrentTime {
    async fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        let format = args.get("format").and_then(Value::as_str).unwrap_or("human");
        let timezone = args.get("timezone").and_then(Value::as_str).unwrap_or("UTC");

        let now = render(Utc::now(), format, timezone)?;
        Ok(json!({ "now": now, "format": format, "timezone": timezone }))
    }
}
