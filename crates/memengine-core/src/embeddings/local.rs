//! Cosine similarity and the optional local (fastembed) embedding provider.

use crate::error::{EngineError, Result};

/// Cosine similarity between two vectors of equal length.
///
/// `cos(a, b) = sum(a_i * b_i) / (||a|| * ||b||)`. When either norm is zero
/// the result is `0.0` rather than dividing by zero. Vectors of unequal
/// length are a programmer error: this raises `DimensionMismatch` instead
/// of silently returning a meaningless score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            a: a.len(),
            b: b.len(),
        });
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        Ok(dot / denom)
    } else {
        Ok(0.0)
    }
}

#[cfg(feature = "local-embeddings")]
mod fastembed_provider {
    use super::*;
    use crate::embeddings::provider::{EmbeddingError, EmbeddingProvider};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::{Mutex, OnceLock};

    /// Dimension of `nomic-embed-text-v1.5`, the default local model.
    pub const LOCAL_EMBEDDING_DIMENSIONS: usize = 768;

    static MODEL: OnceLock<std::result::Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

    fn cache_dir() -> std::path::PathBuf {
        if let Ok(path) = std::env::var("MEMENGINE_EMBEDDING_CACHE") {
            return std::path::PathBuf::from(path);
        }
        if let Some(dirs) = directories::ProjectDirs::from("com", "memengine", "core") {
            return dirs.cache_dir().join("fastembed");
        }
        std::path::PathBuf::from(".memengine_cache")
    }

    fn model() -> std::result::Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError>
    {
        let result = MODEL.get_or_init(|| {
            let dir = cache_dir();
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!("failed to create embedding cache dir {:?}: {}", dir, e);
            }
            let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
                .with_show_download_progress(false)
                .with_cache_dir(dir);
            TextEmbedding::try_new(options)
                .map(Mutex::new)
                .map_err(|e| format!("failed to initialize nomic-embed-text-v1.5: {e}"))
        });

        match result {
            Ok(model) => model
                .lock()
                .map_err(|e| EmbeddingError::Unavailable(format!("lock poisoned: {e}"))),
            Err(e) => Err(EmbeddingError::Unavailable(e.clone())),
        }
    }

    /// Local ONNX-based embedding provider. No network calls; the model is
    /// downloaded once and cached on disk the first time it's used.
    pub struct LocalEmbeddingProvider;

    impl LocalEmbeddingProvider {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for LocalEmbeddingProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LocalEmbeddingProvider {
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let text = text.to_string();
            tokio::task::spawn_blocking(move || {
                let mut guard = model()?;
                let embeddings = guard
                    .embed(vec![text], None)
                    .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
                embeddings
                    .into_iter()
                    .next()
                    .ok_or_else(|| EmbeddingError::Unavailable("no embedding returned".into()))
            })
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("embedding task panicked: {e}")))?
        }

        fn dimension(&self) -> usize {
            LOCAL_EMBEDDING_DIMENSIONS
        }
    }
}

#[cfg(feature = "local-embeddings")]
pub use fastembed_provider::LocalEmbeddingProvider;
