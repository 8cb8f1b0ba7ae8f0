//! Prompt rendering.
//!
//! `PromptSet` resolves the three question-answering prompts once, compiles
//! them into a Handlebars registry and renders them per request.

use crate::builtin::{builtin, ANSWER_PROMPT_ID, BUILTIN_IDS, REWRITE_PROMPT_ID, SYSTEM_PROMPT_ID};
use crate::loader::{load_prompt, prompt_path};
use crate::types::{BuiltPrompt, PromptDefinition, PromptOrigin};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;
use std::path::Path;

/// Compiled question-answering prompts.
pub struct PromptSet {
    registry: Handlebars<'static>,
    origins: HashMap<String, PromptOrigin>,
}

impl std::fmt::Debug for PromptSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSet")
            .field("origins", &self.origins)
            .finish()
    }
}

impl PromptSet {
    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let definitions = BUILTIN_IDS
            .iter()
            .filter_map(|id| builtin(id))
            .map(|def| (def, PromptOrigin::Builtin))
            .collect();
        Self::compile(definitions)
    }

    /// Built-in prompts with any workspace overrides applied.
    ///
    /// A present but invalid override is an error rather than a silent
    /// fallback, so a broken template is noticed at startup.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut definitions = Vec::with_capacity(BUILTIN_IDS.len());

        for id in BUILTIN_IDS {
            if prompt_path(workspace_path, id).exists() {
                definitions.push((load_prompt(workspace_path, id)?, PromptOrigin::Workspace));
            } else if let Some(def) = builtin(id) {
                definitions.push((def, PromptOrigin::Builtin));
            }
        }

        Self::compile(definitions)
    }

    fn compile(definitions: Vec<(PromptDefinition, PromptOrigin)>) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Prompts are plain text
        registry.register_escape_fn(handlebars::no_escape);

        let mut origins = HashMap::new();
        for (def, origin) in definitions {
            registry
                .register_template_string(&def.id, &def.template)
                .map_err(|e| {
                    AppError::Prompt(format!("Failed to register template '{}': {}", def.id, e))
                })?;
            tracing::debug!(prompt = %def.id, ?origin, "Registered prompt");
            origins.insert(def.id, origin);
        }

        Ok(Self { registry, origins })
    }

    /// Where a prompt ID was resolved from.
    pub fn origin(&self, prompt_id: &str) -> Option<PromptOrigin> {
        self.origins.get(prompt_id).copied()
    }

    /// Render the retrieval rewrite prompt for a question.
    pub fn render_rewrite(&self, question: &str) -> AppResult<BuiltPrompt> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        self.render(REWRITE_PROMPT_ID, vars)
    }

    /// Render the generation prompt from assembled context and the
    /// original question.
    pub fn render_answer(&self, context: &str, question: &str) -> AppResult<BuiltPrompt> {
        let system = self.render(SYSTEM_PROMPT_ID, HashMap::new())?;

        let mut vars = HashMap::new();
        vars.insert("system".to_string(), system.text);
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());
        self.render(ANSWER_PROMPT_ID, vars)
    }

    fn render(&self, prompt_id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        let origin = self
            .origin(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not registered: {}", prompt_id)))?;

        let text = self
            .registry
            .render(prompt_id, &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render '{}': {}", prompt_id, e)))?;

        Ok(BuiltPrompt::new(text, prompt_id.to_string(), origin, variables))
    }
}
