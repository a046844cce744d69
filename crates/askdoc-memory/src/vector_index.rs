//! In-memory vector index with exhaustive cosine search.

use std::cmp::Ordering;

use crate::document::Chunk;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding must not be empty")]
    EmptyEmbedding,
}

/// A chunk paired with its similarity to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ordered collection of (chunk, embedding) pairs.
///
/// The first insert fixes the dimension. Entries are never reordered or
/// de-duplicated, so insertion order breaks score ties.
#[derive(Debug, Default, Clone)]
pub struct VectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimension: Option<usize>,
}

impl VectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            dimension: None,
        }
    }

    /// Append a chunk with its embedding.
    ///
    /// # Errors
    ///
    /// Returns `EmptyEmbedding` for a zero-length vector and `DimensionMismatch`
    /// when the length differs from the first inserted embedding.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.is_empty() {
            return Err(IndexError::EmptyEmbedding);
        }
        match self.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(embedding.len()),
        }
        self.entries.push((chunk, embedding));
        Ok(())
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the index is non-empty and `query` has a
    /// different length than the stored embeddings.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        let Some(expected) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (_, embedding))| (i, cosine_similarity(query, embedding)))
            .collect();

        // stable: equal scores keep insertion order
        scored.sort_by(|a, b| rank_descending(a.1, b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].0.clone(),
                score,
            })
            .collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding length fixed by the first insert, if any.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn rank_descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
