//! The `EmbeddingProvider` trait and the always-present null implementation.

use async_trait::async_trait;

/// Failure modes for an embedding gateway: unreachable model, or a vector
/// of the wrong length for the caller's declared dimension.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),
    #[error("embedding service returned {got} dimensions, expected {expected}")]
    WrongDimension { got: usize, expected: usize },
}

/// A `text -> vector` capability of fixed dimension.
///
/// Implementations MUST be safe to call concurrently from multiple content
/// operations (the engine never holds this behind its own lock), and MUST
/// return `EmbeddingError` rather than panicking when the underlying model
/// is unreachable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// The fixed dimension this provider always returns on success.
    fn dimension(&self) -> usize;
}

/// A provider that is always unavailable.
///
/// This is the default when the `local-embeddings` feature is compiled out
/// or the host supplies no provider. It is what lets every content
/// operation (`create_block`, `update_block`, `insert_archival`, ...)
/// succeed on the SQL write alone, per the graceful-degradation invariant
/// in spec section 4.5.
pub struct NullEmbeddingProvider {
    dimension: usize,
}

impl NullEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable(
            "no embedding provider configured".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
