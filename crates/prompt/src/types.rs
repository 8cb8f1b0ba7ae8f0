//! Prompt types.
//!
//! A prompt is a named Handlebars template. Built-in definitions ship with
//! the binary; a workspace may override any of them with a YAML file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition, either built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier (e.g. "qa.answer")
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Where a resolved prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOrigin {
    Builtin,
    Workspace,
}

/// A fully rendered prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether the template was built in or a workspace override
    pub origin: PromptOrigin,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        text: String,
        source_prompt_id: String,
        origin: PromptOrigin,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            text,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                origin,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: qa.rewrite
title: Rewrite for retrieval
apiVersion: "1.0"
createdBy: legal-team
template: "Rephrase: {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "qa.rewrite");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.created_by, "legal-team");
        assert_eq!(def.template, "Rephrase: {{question}}");
    }

    #[test]
    fn test_created_by_is_optional() {
        let yaml = "id: a.b\ntitle: T\napiVersion: \"1.0\"\ntemplate: x\n";
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.created_by.is_empty());
    }

    #[test]
    fn test_built_prompt_metadata_serialization() {
        let built = BuiltPrompt::new(
            "text".to_string(),
            "qa.answer".to_string(),
            PromptOrigin::Workspace,
            HashMap::new(),
        );

        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(json["metadata"]["sourcePromptId"], "qa.answer");
        assert_eq!(json["metadata"]["origin"], "workspace");
    }
}
