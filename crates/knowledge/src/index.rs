//! Read-only access to the persisted SQLite passage index.
//!
//! The index is written by the ingestion pipeline; this module only reads
//! it. Opening an index copies every row into memory, so a loaded
//! `PassageIndex` is an immutable snapshot that never touches the database
//! again.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE passages (
//!     id TEXT PRIMARY KEY,
//!     text TEXT NOT NULL,
//!     source_file TEXT,
//!     page_number INTEGER,
//!     embedding BLOB          -- little-endian f32 values
//! );
//! ```

use crate::types::{IndexStats, RetrievedPassage, StoredPassage};
use chrono::{DateTime, Utc};
use docqa_core::{AppError, AppResult};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// In-memory snapshot of a passage index.
#[derive(Debug)]
pub struct PassageIndex {
    path: PathBuf,
    passages: Vec<StoredPassage>,
    dimensions: Option<usize>,
    loaded_at: DateTime<Utc>,
}

impl PassageIndex {
    /// Load every passage from the index file.
    ///
    /// Fails if the file is not a SQLite database, lacks the `passages`
    /// table, or stores vectors of inconsistent dimension. Rows without an
    /// embedding are skipped.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = open_read_only(path)?;

        let mut stmt = conn
            .prepare("SELECT id, text, source_file, page_number, embedding FROM passages ORDER BY rowid")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<Vec<u8>>>(4)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query passages: {}", e)))?;

        let mut passages = Vec::new();
        let mut dimensions: Option<usize> = None;
        let mut skipped = 0usize;

        for row in rows {
            let (id, text, source_file, page_number, embedding) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read passage: {}", e)))?;

            let Some(bytes) = embedding else {
                skipped += 1;
                continue;
            };

            let embedding = bytes_to_embedding(&bytes)
                .map_err(|e| AppError::Knowledge(format!("Passage '{}': {}", id, e)))?;

            match dimensions {
                None => dimensions = Some(embedding.len()),
                Some(dim) if dim != embedding.len() => {
                    return Err(AppError::Knowledge(format!(
                        "Passage '{}' has {} dimensions, expected {}",
                        id,
                        embedding.len(),
                        dim
                    )));
                }
                Some(_) => {}
            }

            passages.push(StoredPassage {
                id,
                text,
                source_file,
                page_number: page_number.and_then(|p| u32::try_from(p).ok()),
                embedding,
            });
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Skipped passages without embeddings");
        }

        tracing::debug!(
            passages = passages.len(),
            dimensions = ?dimensions,
            "Loaded passage index from {:?}",
            path
        );

        Ok(Self {
            path: path.to_path_buf(),
            passages,
            dimensions,
            loaded_at: Utc::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Embedding dimension of the stored vectors.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// When this snapshot was read.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Rank passages by cosine similarity to the query vector.
    ///
    /// Returns at most `top_k` passages, highest score first. Equal scores
    /// keep index order.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<RetrievedPassage>> {
        if let Some(dim) = self.dimensions {
            if query_embedding.len() != dim {
                return Err(AppError::Retrieval(format!(
                    "Query embedding has {} dimensions but the index stores {}",
                    query_embedding.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .passages
            .iter()
            .enumerate()
            .map(|(i, p)| (i, cosine_similarity(query_embedding, &p.embedding)))
            // A vector holding NaN has no meaningful similarity
            .filter(|(_, score)| !score.is_nan())
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| self.passages[i].to_retrieved(score))
            .collect())
    }
}

/// Collect statistics for an index file without loading vectors.
pub fn index_stats(path: &Path) -> AppResult<IndexStats> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::Knowledge(format!("Index not found at {:?}: {}", path, e)))?;

    let conn = open_read_only(path)?;

    let count = |sql: &str| -> AppResult<u32> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map_err(|e| AppError::Knowledge(format!("Failed to read index stats: {}", e)))
            .and_then(|v| {
                u32::try_from(v).map_err(|_| {
                    AppError::Knowledge(format!("Index count out of range: {}", v))
                })
            })
    };

    let passages_count = count("SELECT COUNT(*) FROM passages")?;
    let sources_count = count("SELECT COUNT(DISTINCT source_file) FROM passages")?;

    let dimensions = conn
        .query_row(
            "SELECT LENGTH(embedding) FROM passages WHERE embedding IS NOT NULL LIMIT 1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .ok()
        .map(|bytes| bytes as usize / 4);

    Ok(IndexStats {
        path: path.to_path_buf(),
        passages_count,
        sources_count,
        dimensions,
        db_size_bytes: metadata.len(),
        modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
    })
}

fn open_read_only(path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to open index {:?}: {}", path, e)))
}

/// Encode an embedding in the index's storage format.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(format!(
            "Invalid embedding length: {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; zero for mismatched or zero-length vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
