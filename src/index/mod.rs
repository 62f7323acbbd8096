//! Exact cosine-similarity index over embedded documents.
//!
//! Vectors are normalized once at build time so a query costs one dot product
//! per entry. The index is immutable after `build`.

use tracing::debug;

use crate::embedding::{Embedder, EmbeddingError};
use crate::retrieval::Document;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("cannot build an index from zero documents")]
    Empty,

    #[error("embedder returned {got} vectors for {expected} documents")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedder returned zero-dimension vectors")]
    ZeroDimension,

    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

#[derive(Debug)]
struct Entry {
    document: Document,
    vector: Vec<f32>,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<Entry>,
    dimension: usize,
}

/// A search hit borrowed from the index.
#[derive(Debug, Clone, Copy)]
pub struct ScoredDocument<'a> {
    pub document: &'a Document,
    pub score: f32,
}

impl VectorIndex {
    /// Embeds every document and builds the index.
    pub async fn build(
        documents: Vec<Document>,
        embedder: &impl Embedder,
    ) -> Result<Self, IndexError> {
        if documents.is_empty() {
            return Err(IndexError::Empty);
        }
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;
        Self::from_vectors(documents, vectors)
    }

    pub fn from_vectors(
        documents: Vec<Document>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, IndexError> {
        if documents.is_empty() {
            return Err(IndexError::Empty);
        }
        if documents.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                expected: documents.len(),
                got: vectors.len(),
            });
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        let mut entries = Vec::with_capacity(documents.len());
        for (document, mut vector) in documents.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    got: vector.len(),
                });
            }
            normalize(&mut vector);
            entries.push(Entry { document, vector });
        }

        debug!(entries = entries.len(), dimension, "vector index built");
        Ok(Self { entries, dimension })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Top `k` documents by cosine similarity, best first. Equal scores keep
    /// insertion order.
    pub fn search_by_vector(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument<'_>>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<ScoredDocument<'_>> = self
            .entries
            .iter()
            .map(|e| ScoredDocument {
                document: &e.document,
                score: dot(&e.vector, &query),
            })
            .collect();
        // Stable sort keeps insertion order among ties.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    /// Embeds `query` and searches.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        embedder: &impl Embedder,
    ) -> Result<Vec<ScoredDocument<'_>>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = embedder.embed_query(query).await?;
        self.search_by_vector(&vector, k)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Zero vectors stay zero and score 0 against everything.
fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
