//! Error types for docqa.
//!
//! A single error enum covers configuration, I/O, generation, retrieval,
//! knowledge index, and prompt failures. "No evidence" outcomes are not
//! errors: the answer pipeline reports them as sentinel answers.

use thiserror::Error;

/// Unified error type for docqa.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation provider errors (network, HTTP status, malformed payload)
    #[error("LLM error: {0}")]
    Llm(String),

    /// A generation call did not finish within its deadline
    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),

    /// The retrieval collaborator failed against a loaded index
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Knowledge index errors (unreadable or malformed index)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the caller may reasonably retry the same request.
    ///
    /// Upstream collaborator failures are transient from the caller's point
    /// of view; configuration and data errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_) | AppError::GenerationTimeout(_) | AppError::Retrieval(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
