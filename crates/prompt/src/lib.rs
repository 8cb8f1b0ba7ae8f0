//! Prompt system for docqa.
//!
//! This crate provides the question-answering prompts with:
//! - Built-in templates for the system rules, query rewrite and answer
//! - YAML overrides per workspace
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::PromptSet;
pub use builtin::{ANSWER_PROMPT_ID, REWRITE_PROMPT_ID, SYSTEM_PROMPT_ID};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOrigin};
