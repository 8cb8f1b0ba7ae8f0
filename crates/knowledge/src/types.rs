//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One ranked hit from the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text
    pub text: String,

    /// Similarity to the query; absent when the ranker reports none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Document the passage was extracted from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Page within the source document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl RetrievedPassage {
    /// A passage with text only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
            source_file: None,
            page_number: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_source(mut self, source_file: impl Into<String>, page_number: Option<u32>) -> Self {
        self.source_file = Some(source_file.into());
        self.page_number = page_number;
        self
    }
}

/// A passage row as persisted in the index.
#[derive(Debug, Clone)]
pub struct StoredPassage {
    /// Unique passage identifier
    pub id: String,

    pub text: String,

    pub source_file: Option<String>,

    pub page_number: Option<u32>,

    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl StoredPassage {
    /// Scored, user-facing form of this passage.
    pub fn to_retrieved(&self, score: f32) -> RetrievedPassage {
        RetrievedPassage {
            text: self.text.clone(),
            score: Some(score),
            source_file: self.source_file.clone(),
            page_number: self.page_number,
        }
    }
}

/// Statistics for a persisted passage index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index file location
    pub path: PathBuf,

    /// Number of passages
    pub passages_count: u32,

    /// Number of distinct source documents
    pub sources_count: u32,

    /// Embedding dimension of the stored vectors (None when empty)
    pub dimensions: Option<usize>,

    /// Database size in bytes
    pub db_size_bytes: u64,

    /// Last modification of the index file
    pub modified_at: Option<DateTime<Utc>>,
}
