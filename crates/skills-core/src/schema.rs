//! Tool Schema Translation
//!
//! Converts skill descriptors into the tool declarations sent to the model.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::descriptor::SkillDescriptor;
use crate::registry::SkillRegistry;

/// Type declared for parameters without a type tag
const DEFAULT_PARAM_TYPE: &str = "string";

/// Tool declaration in the shape the LLM protocol expects
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Canonical tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// JSON Schema of the tool input
    pub input_schema: InputSchema,
}

/// Object schema describing tool arguments
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,

    pub properties: Map<String, serde_json::Value>,

    pub required: Vec<String>,
}

/// Lower-case the name and replace each space with `_`
pub fn canonical_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

impl From<&SkillDescriptor> for ToolSchema {
    fn from(descriptor: &SkillDescriptor) -> Self {
        let mut properties = Map::new();
        let mut required: Vec<String> = Vec::new();

        for param in descriptor.effective_parameters() {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.param_type.as_deref().unwrap_or(DEFAULT_PARAM_TYPE),
                    "description": param.description.as_deref().unwrap_or_default(),
                }),
            );
            required.push(param.name.clone());
        }

        Self {
            name: canonical_name(&descriptor.name),
            description: descriptor.description.clone(),
            input_schema: InputSchema {
                schema_type: "object".into(),
                properties,
                required,
            },
        }
    }
}

/// Translate every registered skill, in registry order
pub fn translate(registry: &SkillRegistry) -> Vec<ToolSchema> {
    registry
        .skills()
        .map(|skill| ToolSchema::from(skill.descriptor()))
        .collect()
}
