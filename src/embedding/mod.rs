//! Text embedding: the `Embedder` seam and its OpenAI implementation.

mod openai;

pub use openai::{DEFAULT_BATCH_SIZE, DEFAULT_MODEL, OpenAiEmbedder};

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("OPENAI_API_KEY not set")]
    ApiKeyNotSet,

    #[error("embedding API rate limit exceeded")]
    RateLimited,

    #[error("embedding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Maps text to vectors. Document and query embeddings must share a space.
pub trait Embedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Malformed("no vector for query".to_string()))
    }
}
