//! Answer synthesis over the document index.
//!
//! The pipeline rewrites the question for retrieval, keeps passages above
//! the similarity floor, assembles citation-tagged context, asks the model
//! for a cited answer, and gates that answer on citation presence and
//! evidence confidence. Answers come back whole or as a frame stream.

pub mod confidence;
pub mod context;
pub mod guardrail;
pub mod rewrite;
pub mod stream;
pub mod synthesizer;
pub mod types;

pub use guardrail::GuardrailGate;
pub use rewrite::QueryRewriter;
pub use stream::{AnswerStream, StreamFrame};
pub use synthesizer::AnswerSynthesizer;
pub use types::{AnswerOutcome, QaAnswer, QaOptions, NOT_INITIALIZED, NO_ANSWER};

use docqa_core::{AppError, AppResult};
use docqa_llm::LlmRequest;
use std::future::Future;
use std::time::Duration;

/// Generation request carrying the pipeline's model settings.
pub(crate) fn generation_request(options: &QaOptions, prompt: String) -> LlmRequest {
    LlmRequest::new(prompt, options.model.clone())
        .with_temperature(options.temperature)
        .with_max_tokens(options.max_tokens)
}

/// Run a generation call under an optional deadline.
pub(crate) async fn within<T, F>(timeout: Option<Duration>, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| AppError::GenerationTimeout(limit.as_secs()))?,
        None => call.await,
    }
}
