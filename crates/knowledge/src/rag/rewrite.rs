//! Retrieval-oriented query rewriting.

use super::types::QaOptions;
use super::{generation_request, within};
use docqa_core::AppResult;
use docqa_llm::LlmClient;
use docqa_prompt::PromptSet;
use std::sync::Arc;

/// Rewrites questions into search queries, falling back to the question.
pub struct QueryRewriter {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    options: QaOptions,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, options: QaOptions) -> Self {
        Self {
            llm,
            prompts,
            options,
        }
    }

    /// Rewrite a question for retrieval.
    ///
    /// Never fails: an empty or overlong rewrite, a generation error, or a
    /// timeout all yield the original question.
    pub async fn rewrite(&self, question: &str) -> String {
        if !self.options.rewrite {
            return question.to_string();
        }

        match self.generate(question).await {
            Ok(candidate) => match accept_rewrite(&candidate, self.options.max_rewrite_chars) {
                Some(query) => {
                    tracing::debug!(rewritten = %query, "Rewrote query");
                    query
                }
                None => {
                    tracing::debug!(
                        chars = candidate.trim().chars().count(),
                        "Discarded rewrite; using original question"
                    );
                    question.to_string()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Query rewrite failed; using original question");
                question.to_string()
            }
        }
    }

    async fn generate(&self, question: &str) -> AppResult<String> {
        let prompt = self.prompts.render_rewrite(question)?;
        let request = generation_request(&self.options, prompt.text);
        let response = within(self.options.generation_timeout, self.llm.complete(&request)).await?;
        Ok(response.content)
    }
}

/// Trimmed rewrite if it is non-empty and at most `max_chars` characters.
pub fn accept_rewrite(candidate: &str, max_chars: usize) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_chars {
        None
    } else {
        Some(trimmed.to_string())
    }
}
