//! # skill-pack
//!
//! Built-in entry points for the skill packages shipped under `skills/`.
//! Each one is bound to its package folder name, so a folder with a
//! `SKILL.md` and a matching name picks it up at load time.
//!
//! | Folder            | Entry point       |
//! |-------------------|-------------------|
//! | `weather_checker` | [`WeatherChecker`] |
//! | `calculator`      | [`Calculator`]     |
//! | `datetime`        | [`CurrentTime`]    |

pub mod calculator;
pub mod datetime;
pub mod error;
pub mod weather;

pub use calculator::Calculator;
pub use datetime::CurrentTime;
pub use error::{Result, SkillPackError};
pub use weather::{OpenMeteoClient, WeatherChecker, WeatherSource};

use serde_json::Value;
use skills_core::{Arguments, SkillLoader};

/// Bind every built-in entry point to its package folder name
pub fn bind_all(loader: SkillLoader) -> SkillLoader {
    loader
        .bind("weather_checker", WeatherChecker::new())
        .bind("calculator", Calculator)
        .bind("datetime", CurrentTime)
}

/// Required string argument
pub(crate) fn str_arg<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(SkillPackError::invalid(name, "expected a string")),
        None => Err(SkillPackError::invalid(name, "missing")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_bind_all() {
        let loader = bind_all(SkillLoader::new());
        let mut modules = loader.bound_modules();
        modules.sort_unstable();
        assert_eq!(modules, vec!["calculator", "datetime", "weather_checker"]);
    }

    #[tokio::test]
    async fn test_bound_package_loads() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("calculator");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("SKILL.md"),
            "name: Calculator\ndescription: Evaluate arithmetic\nparameters:\n  - name: expression\n    type: string\n",
        )
        .unwrap();

        let registry = bind_all(SkillLoader::new().allow_executables(false)).load(dir.path()).unwrap();
        let skill = registry.find_tool("calculator").unwrap();

        let mut args = Arguments::new();
        args.insert("expression".into(), serde_json::json!("1 + 1"));
        let value = skill.invoke(args).await.unwrap();
        assert_eq!(value["result"], 2.0);
    }
}
