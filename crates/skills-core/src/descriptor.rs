//! Skill Descriptors
//!
//! Parses the `SKILL.md` metadata document that accompanies every skill
//! package into a [`SkillDescriptor`].
//!
//! ```text
//! name: Weather Checker
//! description: Get the current weather for a city
//! parameters:
//!   - name: location
//!     type: string
//!     description: City name, e.g. Paris
//! ```
//!
//! The scan is line-oriented and permissive: unknown lines are ignored and
//! parameters missing a `type` or `description` are kept with the field
//! absent.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// File name of the metadata document inside a skill package
pub const METADATA_FILE: &str = "SKILL.md";

/// One declared parameter of a skill
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name (keyword the entry point receives)
    pub name: String,

    /// Type tag, passed to the model verbatim
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = Some(param_type.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Structured capability descriptor of one skill
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    /// Registry key
    pub name: String,

    /// Shown to the model as the tool description
    pub description: String,

    /// Parameters in document order
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
}

impl SkillDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// One parameter per name, at the position of its first declaration,
    /// carrying the last declaration's type and description
    pub fn effective_parameters(&self) -> Vec<&ParameterDescriptor> {
        let mut effective: Vec<&ParameterDescriptor> = Vec::with_capacity(self.parameters.len());
        for param in &self.parameters {
            match effective.iter_mut().find(|p| p.name == param.name) {
                Some(slot) => *slot = param,
                None => effective.push(param),
            }
        }
        effective
    }

    /// Parse the raw text of a metadata document
    pub fn parse(content: &str) -> Result<Self> {
        let mut name = None;
        let mut description = None;
        let mut parameters = Vec::new();
        let mut current: Option<ParameterDescriptor> = None;

        for raw in content.lines() {
            let indented = raw.starts_with(char::is_whitespace);
            let line = raw.trim();

            if let Some(rest) = line.strip_prefix("- name:") {
                if let Some(param) = current.take() {
                    parameters.push(param);
                }
                current = Some(ParameterDescriptor::new(clean_value(rest)));
                continue;
            }

            if let Some(param) = current.as_mut().filter(|_| indented) {
                if let Some(rest) = line.strip_prefix("type:") {
                    param.param_type = Some(clean_value(rest));
                    continue;
                }
                if let Some(rest) = line.strip_prefix("description:") {
                    param.description = Some(clean_value(rest));
                    continue;
                }
            }

            if let Some(rest) = line.strip_prefix("name:") {
                name = Some(clean_value(rest));
            } else if let Some(rest) = line.strip_prefix("description:") {
                description = Some(clean_value(rest));
            }
        }

        if let Some(param) = current {
            parameters.push(param);
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AgentError::MalformedDescriptor("missing required field 'name'".into()))?;
        let description = description.filter(|d| !d.is_empty()).ok_or_else(|| {
            AgentError::MalformedDescriptor(format!("skill '{name}' is missing required field 'description'"))
        })?;

        Ok(Self {
            name,
            description,
            parameters,
        })
    }
}

impl std::str::FromStr for SkillDescriptor {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Trim a value and drop one pair of matching surrounding quotes
fn clean_value(raw: &str) -> String {
    let value = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    value.to_string()
}
