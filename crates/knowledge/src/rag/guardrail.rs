//! Pass/fail checks on retrieved evidence and generated answers.

use crate::retriever::Retriever;
use crate::types::RetrievedPassage;
use docqa_core::{AppError, AppResult};

/// Substring that marks a grounded claim.
pub const CITATION_MARKER: &str = "[source:";

pub const DEFAULT_SIMILARITY_FLOOR: f32 = 0.35;

pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.30;

/// Similarity floor, citation presence, and confidence floor.
#[derive(Debug, Clone, Copy)]
pub struct GuardrailGate {
    similarity_floor: f32,
    confidence_floor: f64,
}

impl Default for GuardrailGate {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_FLOOR, DEFAULT_CONFIDENCE_FLOOR)
    }
}

impl GuardrailGate {
    pub fn new(similarity_floor: f32, confidence_floor: f64) -> Self {
        Self {
            similarity_floor,
            confidence_floor,
        }
    }

    /// Whether a passage counts as evidence: it has a score at or above
    /// the similarity floor.
    pub fn is_accepted(&self, passage: &RetrievedPassage) -> bool {
        passage.score.is_some_and(|s| s >= self.similarity_floor)
    }

    /// Keep accepted passages, preserving ranked order.
    pub fn accept_passages(&self, passages: Vec<RetrievedPassage>) -> Vec<RetrievedPassage> {
        passages.into_iter().filter(|p| self.is_accepted(p)).collect()
    }

    /// Retrieve `top_k` passages for the query and keep only accepted ones.
    ///
    /// Any failure of the retriever is reported as `AppError::Retrieval`.
    pub async fn retrieve(
        &self,
        retriever: &dyn Retriever,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<RetrievedPassage>> {
        let passages = retriever.retrieve(query, top_k).await.map_err(|e| match e {
            AppError::Retrieval(_) => e,
            other => AppError::Retrieval(other.to_string()),
        })?;

        let retrieved = passages.len();
        let scores: Vec<Option<f32>> = passages.iter().map(|p| p.score).collect();
        let accepted = self.accept_passages(passages);

        tracing::info!(
            retrieved,
            accepted = accepted.len(),
            ?scores,
            floor = self.similarity_floor,
            "Filtered retrieved passages"
        );

        Ok(accepted)
    }

    /// Whether the answer cites at least one source.
    pub fn has_citation(answer: &str) -> bool {
        answer.contains(CITATION_MARKER)
    }

    /// Whether the evidence confidence reaches the floor.
    pub fn meets_confidence(&self, confidence: f64) -> bool {
        confidence >= self.confidence_floor
    }
}
