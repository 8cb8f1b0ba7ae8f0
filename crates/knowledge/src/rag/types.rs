//! Question-answering result types and settings.

use super::confidence::format_confidence;
use docqa_core::AppConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Answer returned whenever evidence or grounding is insufficient.
pub const NO_ANSWER: &str = "I don't know based on the provided documents.";

/// Answer returned while no retriever is available.
pub const NOT_INITIALIZED: &str = "Knowledge base not initialized yet.";

/// Why a question ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The generated answer passed every check
    Answered,
    /// No retriever was available
    NotInitialized,
    /// No passage reached the similarity floor
    NoEvidence,
    /// The generated answer carried no citation
    Uncited,
    /// Evidence strength fell below the confidence floor
    LowConfidence,
}

/// Final result of a synchronous question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    /// Accepted answer text or a sentinel
    pub answer: String,

    /// Evidence confidence in [0, 1], rounded to 3 decimals
    pub confidence: f64,

    pub outcome: AnswerOutcome,
}

impl QaAnswer {
    /// An answer that passed citation and confidence checks.
    pub fn answered(answer: impl Into<String>, confidence: f64) -> Self {
        Self {
            answer: answer.into(),
            confidence,
            outcome: AnswerOutcome::Answered,
        }
    }

    /// The knowledge base is not available.
    pub fn not_initialized() -> Self {
        Self {
            answer: NOT_INITIALIZED.to_string(),
            confidence: 0.0,
            outcome: AnswerOutcome::NotInitialized,
        }
    }

    /// The "I don't know" sentinel, for one of the rejecting outcomes.
    pub fn no_information(outcome: AnswerOutcome) -> Self {
        Self {
            answer: NO_ANSWER.to_string(),
            confidence: 0.0,
            outcome,
        }
    }

    /// User-facing text: the answer, a blank line, and the confidence.
    pub fn render(&self) -> String {
        format!(
            "{}\n\nConfidence: {}",
            self.answer,
            format_confidence(self.confidence)
        )
    }
}

/// Settings for the answer pipeline.
#[derive(Debug, Clone)]
pub struct QaOptions {
    /// Generation model identifier
    pub model: String,

    pub top_k: usize,

    pub similarity_floor: f32,

    pub confidence_floor: f64,

    pub max_rewrite_chars: usize,

    /// Rewrite questions before retrieval
    pub rewrite: bool,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Deadline for each generation call
    pub generation_timeout: Option<Duration>,
}

impl QaOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let qa = &config.qa;
        Self {
            model: config.model.clone(),
            top_k: qa.top_k,
            similarity_floor: qa.similarity_floor,
            confidence_floor: qa.confidence_floor,
            max_rewrite_chars: qa.max_rewrite_chars,
            rewrite: qa.rewrite,
            temperature: qa.temperature,
            max_tokens: qa.max_tokens,
            generation_timeout: match qa.generation_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl Default for QaOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
