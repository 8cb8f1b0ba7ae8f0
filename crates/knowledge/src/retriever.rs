//! Retrieval collaborator.
//!
//! A `Retriever` ranks passages for a query. A `RetrieverLoader` builds
//! one from persisted state, or reports that no index exists yet.

use crate::embeddings::EmbeddingProvider;
use crate::index::PassageIndex;
use crate::types::RetrievedPassage;
use docqa_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ranks indexed passages by similarity to a query.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages, most similar first.
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedPassage>>;
}

/// Builds retriever instances for a `RetrieverHandle`.
#[async_trait::async_trait]
pub trait RetrieverLoader: Send + Sync {
    /// Build a fresh retriever.
    ///
    /// `Ok(None)` means the backing index does not exist yet, which is an
    /// expected state rather than a failure.
    async fn load(&self) -> AppResult<Option<Arc<dyn Retriever>>>;
}

/// Retriever over an in-memory index snapshot.
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: PassageIndex,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: PassageIndex) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &PassageIndex {
        &self.index
    }
}

#[async_trait::async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedPassage>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.search(&query_embedding, top_k)?;

        tracing::debug!(
            requested = top_k,
            returned = results.len(),
            top_score = ?results.first().and_then(|p| p.score),
            "Retrieved passages"
        );

        Ok(results)
    }
}

/// Loads a `VectorRetriever` from the SQLite index at a fixed path.
pub struct IndexLoader {
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexLoader {
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            path: path.into(),
            embedder,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl RetrieverLoader for IndexLoader {
    async fn load(&self) -> AppResult<Option<Arc<dyn Retriever>>> {
        if !self.path.exists() {
            tracing::info!("No passage index at {:?}", self.path);
            return Ok(None);
        }

        let path = self.path.clone();
        let index = tokio::task::spawn_blocking(move || PassageIndex::open(&path))
            .await
            .map_err(|e| AppError::Knowledge(format!("Index loading task failed: {}", e)))??;

        if let Some(dim) = index.dimensions() {
            if dim != self.embedder.dimensions() {
                return Err(AppError::Knowledge(format!(
                    "Index stores {}-dimensional vectors but embedding provider '{}' produces {}",
                    dim,
                    self.embedder.provider_name(),
                    self.embedder.dimensions()
                )));
            }
        }

        tracing::info!(
            passages = index.len(),
            loaded_at = %index.loaded_at(),
            "Passage index loaded from {:?}",
            self.path
        );

        let retriever: Arc<dyn Retriever> =
            Arc::new(VectorRetriever::new(Arc::clone(&self.embedder), index));
        Ok(Some(retriever))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::tests::support::{write_index, FixtureRow};
    use tempfile::TempDir;

    fn trigram(dimensions: usize) -> Arc<dyn EmbeddingProvider> {
        Arc::new(TrigramProvider::new(dimensions))
    }

    #[tokio::test]
    async fn test_missing_index_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let loader = IndexLoader::new(dir.path().join("missing.sqlite"), trigram(8));

        assert!(loader.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_index_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        std::fs::write(&path, b"definitely not a sqlite database file").unwrap();

        let loader = IndexLoader::new(&path, trigram(8));
        assert!(loader.load().await.is_err());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_with_provider_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        write_index(&path, &[FixtureRow::new("p1", "text", &[1.0, 0.0, 0.0])]);

        let loader = IndexLoader::new(&path, trigram(384));
        let err = loader.load().await.err().unwrap();
        assert!(err.to_string().contains("384"));
    }

    #[tokio::test]
    async fn test_retrieves_matching_passage_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        let embedder = TrigramProvider::new(384);

        let texts = [
            "termination requires ninety days written notice",
            "quarterly payment schedule for invoices",
        ];
        let vectors = embedder
            .embed_batch(&texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .await
            .unwrap();

        write_index(
            &path,
            &[
                FixtureRow::new("p1", texts[1], &vectors[1]).source("billing.pdf", Some(2)),
                FixtureRow::new("p2", texts[0], &vectors[0]).source("contract.pdf", Some(7)),
            ],
        );

        let retriever = IndexLoader::new(&path, trigram(384))
            .load()
            .await
            .unwrap()
            .unwrap();

        let results = retriever
            .retrieve("termination ninety days notice", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_file.as_deref(), Some("contract.pdf"));
        assert!(results[0].score.unwrap() > results[1].score.unwrap());
    }
}
