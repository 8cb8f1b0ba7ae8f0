//! Document question answering over a persisted passage index.
//!
//! Provides the retrieval collaborator (query embeddings plus a read-only
//! SQLite passage index), the hot-reloadable `RetrieverHandle`, and the
//! citation-enforcing answer pipeline in [`rag`].

pub mod embeddings;
pub mod handle;
pub mod index;
pub mod rag;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use handle::RetrieverHandle;
pub use rag::{AnswerOutcome, AnswerStream, AnswerSynthesizer, QaAnswer, QaOptions, StreamFrame};
pub use retriever::{IndexLoader, Retriever, RetrieverLoader};
pub use types::{IndexStats, RetrievedPassage};

use docqa_core::{AppConfig, AppResult};
use docqa_llm::create_client;
use docqa_prompt::PromptSet;
use std::sync::Arc;

/// Build the retriever handle for the configured index.
///
/// Nothing is read until the first question or an explicit warmup.
pub fn build_retriever_handle(config: &AppConfig) -> AppResult<Arc<RetrieverHandle>> {
    let embedder = embeddings::create_provider(&config.embedding)?;
    let index_path = config.index_path();

    tracing::debug!(
        index = ?index_path,
        embedding_provider = embedder.provider_name(),
        embedding_model = embedder.model_name(),
        "Configured retriever"
    );

    let loader = IndexLoader::new(index_path, embedder);
    Ok(Arc::new(RetrieverHandle::new(Arc::new(loader))))
}

/// Wire the full pipeline from configuration.
pub fn build_synthesizer(config: &AppConfig) -> AppResult<AnswerSynthesizer> {
    config.validate()?;

    let provider = config.provider.as_str();
    let endpoint = config.resolve_endpoint(provider);
    let api_key = config.resolve_api_key(provider);
    let llm = create_client(provider, endpoint.as_deref(), api_key.as_deref())?;

    let prompts = Arc::new(PromptSet::load(&config.workspace)?);
    let retriever = build_retriever_handle(config)?;

    tracing::info!(
        provider,
        model = %config.model,
        "Answer pipeline ready"
    );

    Ok(AnswerSynthesizer::new(
        llm,
        retriever,
        prompts,
        QaOptions::from_config(config),
    ))
}

/// Statistics for the configured index.
pub fn stats(config: &AppConfig) -> AppResult<IndexStats> {
    index::index_stats(&config.index_path())
}
