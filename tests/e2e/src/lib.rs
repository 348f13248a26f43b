//! Shared test harness for memengine integration tests.
//!
//! Provides a `TestDatabaseManager` wrapping a temp-directory-backed
//! `Store`, plus deterministic `EmbeddingProvider`/`LlmProvider` test
//! doubles so scenario tests don't depend on network access or a real
//! model.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use memengine_core::{EmbeddingError, EmbeddingProvider, LlmError, LlmProvider, MemoryEngineConfig, Store};
use tempfile::TempDir;

/// Deterministic embedding: a 4-dimensional vector derived from the byte
/// sum of the input, so identical inputs always score 1.0 against
/// themselves and dissimilar inputs score lower.
pub struct DeterministicEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let sum: u32 = text.bytes().map(|b| b as u32).sum();
        Ok(vec![
            (sum % 7) as f32,
            (sum % 11) as f32,
            (sum % 13) as f32,
            (sum % 17) as f32,
        ])
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// An LLM double that always returns the same fixed summary text,
/// regardless of prompt.
pub struct FixedLlmProvider {
    pub response: String,
}

#[async_trait]
impl LlmProvider for FixedLlmProvider {
    async fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }
}

/// Isolated, temp-directory-backed `Store` for a single test.
pub struct TestDatabaseManager {
    pub store: Store,
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// A store with no embedding or LLM provider wired up — every
    /// semantic/summary operation degrades gracefully.
    pub fn new_bare() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test_memengine.db");
        let store = Store::open(
            Some(db_path.clone()),
            MemoryEngineConfig::default(),
            Arc::new(memengine_core::NullEmbeddingProvider::new(4)),
            None,
        )
        .expect("failed to open test store");

        Self {
            store,
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// A store wired up with the deterministic embedding and LLM doubles.
    pub fn new_with_doubles(llm_response: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test_memengine.db");
        let store = Store::open(
            Some(db_path.clone()),
            MemoryEngineConfig::default(),
            Arc::new(DeterministicEmbeddingProvider),
            Some(Arc::new(FixedLlmProvider {
                response: llm_response.to_string(),
            })),
        )
        .expect("failed to open test store");

        Self {
            store,
            _temp_dir: temp_dir,
            db_path,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }
}
